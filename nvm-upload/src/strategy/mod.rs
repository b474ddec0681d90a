// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Transfer strategies: one per loader protocol.
//!
//! Every strategy implements [`TransferStrategy`] and is otherwise opaque to
//! its callers. Wire formats are mutually incompatible; the [`Family`] a
//! strategy reports tells which target catalog its ids come from.
//!
//! Contract shared by all variants:
//! - `device` names the port; the strategy opens it at the start of
//!   `transfer` and closes it on every exit path.
//! - An id outside the strategy's family fails with `UnknownTarget` before
//!   the device is opened.
//! - Success means the loader acknowledged the whole image. There is no
//!   partial success.
//! - Nothing is kept between calls.

pub mod ctbot;
pub mod nvc1;
pub mod nvc2;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use nvm_common::{Family, Speed, TargetEntry, TargetId};

use crate::error::{Result, UploadError};
use crate::image::Image;

pub use ctbot::CtBotStrategy;
pub use nvc1::Nvc1Strategy;
pub use nvc2::Nvc2Strategy;

/// One loader protocol.
pub trait TransferStrategy {
    /// Catalog family this strategy's target ids belong to.
    fn family(&self) -> Family;

    /// One-line description for listings.
    fn description(&self) -> &'static str;

    /// Transfer `image` to the loader on `device`.
    fn transfer(&self, device: &str, target: TargetId, speed: Speed, image: &Image) -> Result<()>;
}

/// Knobs shared by the built-in strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferOptions {
    /// Per-reply timeout; `None` keeps each protocol's default.
    pub timeout: Option<Duration>,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

/// Resolve `target` in `family` or fail with `UnknownTarget`.
pub(crate) fn target_entry(family: Family, target: TargetId) -> Result<&'static TargetEntry> {
    family.entry(target).map_err(|e| UploadError::UnknownTarget {
        family: e.family,
        target: target.to_string(),
    })
}

pub(crate) fn progress_bar(enabled: bool, total: usize) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

pub(crate) fn finish_progress(pb: &ProgressBar, result: &Result<()>) {
    match result {
        Ok(()) => pb.finish_with_message("Upload complete"),
        Err(_) => pb.abandon(),
    }
}
