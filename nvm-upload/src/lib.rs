// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Upload NanoVM programs to a target over a serial line.
//!
//! The loader protocol is chosen at runtime: register strategies in a
//! [`StrategyRegistry`], select one by key, and call [`Uploader::upload`].
//!
//! ```no_run
//! use nvm_upload::{Family, Image, Speed, StrategyRegistry, TransferOptions, Uploader};
//!
//! let mut uploader = Uploader::new(StrategyRegistry::builtin(TransferOptions::default()));
//! uploader.select("nvc1")?;
//! let target = Family::Nvc1.default_target().id;
//! let speed = Speed::new(9600).unwrap();
//! uploader.upload("/dev/ttyS0", target, speed, &Image::new(vec![0x01, 0x02, 0x03]))?;
//! # Ok::<(), nvm_upload::UploadError>(())
//! ```

pub mod channel;
pub mod error;
pub mod image;
pub mod registry;
pub mod strategy;
pub mod transport;
pub mod uploader;

// Re-export commonly used types
pub use error::{ErrorKind, Result, UploadError};
pub use image::Image;
pub use nvm_common::{Family, Speed, TargetEntry, TargetId};
pub use nvm_common::{TARGET_CTBOT, TARGET_NVC1_ASURO, TARGET_NVC1_UART, TARGET_NVC2_UART};
pub use registry::{StrategyRegistry, KEY_CTBOT, KEY_NVC1, KEY_NVC2};
pub use strategy::{TransferOptions, TransferStrategy};
pub use uploader::Uploader;
