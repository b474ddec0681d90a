// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error types for the upload tool.

use std::io;
use std::path::PathBuf;

use nvm_common::Family;
use thiserror::Error;

use crate::transport::LinkError;

pub const EXIT_USAGE: u8 = 2;
pub const EXIT_IMAGE_LOAD: u8 = 3;
pub const EXIT_SELECTION: u8 = 4;
pub const EXIT_DEVICE_OPEN: u8 = 5;
pub const EXIT_DEVICE_TIMEOUT: u8 = 6;
pub const EXIT_DEVICE_REJECTED: u8 = 7;
pub const EXIT_INTERRUPTED: u8 = 8;

/// Everything that can go wrong between parsing arguments and the device
/// accepting the image.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Bad command line, detected before any I/O.
    #[error("{0}")]
    Usage(String),

    #[error("Failed to load image {}: {source}", .path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unknown upload protocol '{key}' (available: {available})")]
    UnknownStrategy { key: String, available: String },

    #[error("No upload protocol selected")]
    NoStrategySelected,

    #[error("Target '{target}' is not known to the {family} protocol family")]
    UnknownTarget { family: Family, target: String },

    #[error("Failed to open serial port {device}: {source}")]
    DeviceOpen {
        device: String,
        #[source]
        source: io::Error,
    },

    #[error("Timeout waiting for {waiting_for} on {device}")]
    DeviceTimeout {
        device: String,
        waiting_for: &'static str,
    },

    #[error("Device on {device} rejected the image: {reason}")]
    DeviceRejectedImage { device: String, reason: String },

    #[error("Transfer on {device} interrupted at offset {offset}: {reason}")]
    TransferInterrupted {
        device: String,
        offset: usize,
        reason: String,
    },
}

/// Discriminant of [`UploadError`], for callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Usage,
    ImageLoad,
    UnknownStrategy,
    NoStrategySelected,
    UnknownTarget,
    DeviceOpen,
    DeviceTimeout,
    DeviceRejectedImage,
    TransferInterrupted,
}

impl ErrorKind {
    /// Process exit status for this category.
    pub const fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Usage => EXIT_USAGE,
            ErrorKind::ImageLoad => EXIT_IMAGE_LOAD,
            ErrorKind::UnknownStrategy
            | ErrorKind::NoStrategySelected
            | ErrorKind::UnknownTarget => EXIT_SELECTION,
            ErrorKind::DeviceOpen => EXIT_DEVICE_OPEN,
            ErrorKind::DeviceTimeout => EXIT_DEVICE_TIMEOUT,
            ErrorKind::DeviceRejectedImage => EXIT_DEVICE_REJECTED,
            ErrorKind::TransferInterrupted => EXIT_INTERRUPTED,
        }
    }
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Usage(_) => ErrorKind::Usage,
            UploadError::ImageLoad { .. } => ErrorKind::ImageLoad,
            UploadError::UnknownStrategy { .. } => ErrorKind::UnknownStrategy,
            UploadError::NoStrategySelected => ErrorKind::NoStrategySelected,
            UploadError::UnknownTarget { .. } => ErrorKind::UnknownTarget,
            UploadError::DeviceOpen { .. } => ErrorKind::DeviceOpen,
            UploadError::DeviceTimeout { .. } => ErrorKind::DeviceTimeout,
            UploadError::DeviceRejectedImage { .. } => ErrorKind::DeviceRejectedImage,
            UploadError::TransferInterrupted { .. } => ErrorKind::TransferInterrupted,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    /// Classify a failed read/write on an open link.
    ///
    /// A read timeout means the device stopped answering; anything else
    /// (hangup, I/O error, garbage) means the stream broke mid-transfer.
    pub fn link(err: LinkError, device: &str, offset: usize, waiting_for: &'static str) -> Self {
        match err {
            LinkError::Timeout => UploadError::DeviceTimeout {
                device: device.to_string(),
                waiting_for,
            },
            other => UploadError::TransferInterrupted {
                device: device.to_string(),
                offset,
                reason: format!("{} while waiting for {}", other, waiting_for),
            },
        }
    }
}

/// Result type for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;
