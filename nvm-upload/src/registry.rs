// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Strategy registration and selection.
//!
//! The registry maps short keys (`nvc1`, `nvc2`, `ctbot`) to transfer
//! strategies and remembers which one is active. It is ordinary owned state
//! for a single upload session. It is neither `Send` nor `Sync`, so it can
//! not be shared between concurrent sessions by accident.

use crate::channel::SerialConnector;
use crate::error::{Result, UploadError};
use crate::strategy::{
    CtBotStrategy, Nvc1Strategy, Nvc2Strategy, TransferOptions, TransferStrategy,
};

pub const KEY_NVC1: &str = "nvc1";
pub const KEY_NVC2: &str = "nvc2";
pub const KEY_CTBOT: &str = "ctbot";

struct Entry {
    key: &'static str,
    strategy: Box<dyn TransferStrategy>,
}

/// Known strategies plus the one currently selected.
#[derive(Default)]
pub struct StrategyRegistry {
    entries: Vec<Entry>,
    active: Option<usize>,
}

impl StrategyRegistry {
    /// An empty registry with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in strategies, talking to real serial ports.
    pub fn builtin(options: TransferOptions) -> Self {
        let mut registry = Self::new();
        registry.register(
            KEY_NVC1,
            Box::new(Nvc1Strategy::with_options(SerialConnector, options)),
        );
        registry.register(
            KEY_NVC2,
            Box::new(Nvc2Strategy::with_options(SerialConnector, options)),
        );
        registry.register(
            KEY_CTBOT,
            Box::new(CtBotStrategy::with_options(SerialConnector, options)),
        );
        registry
    }

    /// Add a strategy under `key`. Registering an existing key replaces its
    /// strategy in place; if that key was selected, the replacement is.
    pub fn register(&mut self, key: &'static str, strategy: Box<dyn TransferStrategy>) {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.strategy = strategy,
            None => self.entries.push(Entry { key, strategy }),
        }
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    /// Registered strategies in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &dyn TransferStrategy)> + '_ {
        self.entries.iter().map(|e| (e.key, e.strategy.as_ref()))
    }

    /// Make the strategy under `key` active.
    ///
    /// An unknown key fails and leaves the previous selection untouched.
    pub fn select(&mut self, key: &str) -> Result<()> {
        let index = self
            .entries
            .iter()
            .position(|e| e.key == key)
            .ok_or_else(|| UploadError::UnknownStrategy {
                key: key.to_string(),
                available: self.keys().collect::<Vec<_>>().join(", "),
            })?;

        log::debug!("Selected upload protocol {}", key);
        self.active = Some(index);
        Ok(())
    }

    /// Key of the active strategy, if any.
    pub fn active_key(&self) -> Option<&'static str> {
        self.active.map(|i| self.entries[i].key)
    }

    /// The active strategy.
    pub fn current(&self) -> Result<&dyn TransferStrategy> {
        self.active
            .map(|i| self.entries[i].strategy.as_ref())
            .ok_or(UploadError::NoStrategySelected)
    }
}
