// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Program images.

use std::fs;
use std::path::Path;

use crate::error::{Result, UploadError};

/// An immutable program image, fully loaded before any transfer starts.
///
/// Zero-length images are valid and are handed to the strategy unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    bytes: Vec<u8>,
}

impl Image {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Read a whole file into memory.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|source| UploadError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for Image {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl AsRef<[u8]> for Image {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
