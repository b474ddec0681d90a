// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Target catalog and loader wire formats for NanoVM upload tools.
//!
//! This crate supports both `no_std` (device-side loaders) and `std` (host)
//! environments:
//! - Default: `no_std`
//! - `std` feature: host tools, block payloads use `alloc::vec::Vec`

#![cfg_attr(not(feature = "std"), no_std)]

pub mod catalog;
pub mod protocol;

// Re-export commonly used types
pub use catalog::{Family, Speed, TargetEntry, TargetId, UnknownTarget};
pub use catalog::{TARGET_CTBOT, TARGET_NVC1_ASURO, TARGET_NVC1_UART, TARGET_NVC2_UART};
