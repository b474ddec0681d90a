// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Upload entry point.
//!
//! Callers go through [`Uploader`] and never name a concrete strategy. Adding
//! a protocol means registering it; nothing here changes.

use nvm_common::{Speed, TargetId};

use crate::error::Result;
use crate::image::Image;
use crate::registry::StrategyRegistry;
use crate::strategy::TransferStrategy;

pub struct Uploader {
    registry: StrategyRegistry,
}

impl Uploader {
    pub fn new(registry: StrategyRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// See [`StrategyRegistry::select`].
    pub fn select(&mut self, key: &str) -> Result<()> {
        self.registry.select(key)
    }

    pub fn current(&self) -> Result<&dyn TransferStrategy> {
        self.registry.current()
    }

    /// Hand the image to the active strategy.
    ///
    /// Fails with `NoStrategySelected` before touching any device if nothing
    /// is selected. The strategy's result is returned as is.
    pub fn upload(&self, device: &str, target: TargetId, speed: Speed, image: &Image) -> Result<()> {
        let strategy = self.registry.current()?;
        log::debug!(
            "Uploading {} bytes to {} (target {}, {} baud) via {}",
            image.len(),
            device,
            target,
            speed,
            self.registry.active_key().unwrap_or("?")
        );
        strategy.transfer(device, target, speed, image)
    }
}
