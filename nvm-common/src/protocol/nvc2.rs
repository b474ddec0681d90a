// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! NanoVM framed loader ("nvc2").
//!
//! Messages are serialized with postcard and COBS-framed, so `0x00` only
//! ever appears as the frame delimiter. Works in both `no_std` and `std`
//! builds; enable the `std` feature on the host side.

#[cfg(feature = "std")]
extern crate alloc;

use serde::{Deserialize, Serialize};

/// Largest block payload the host ever sends.
pub const MAX_BLOCK_SIZE: usize = 256;

/// Room for an encoded [`Command::Block`] of [`MAX_BLOCK_SIZE`] bytes.
pub const MAX_FRAME_SIZE: usize = MAX_BLOCK_SIZE + 32;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)] // no_std, no allocator for Box
pub enum Command {
    /// Ask the loader to identify itself as `target`.
    Hello { target: u8 },
    /// Announce an image of `size` bytes with CRC-32/ISO-HDLC `crc32`.
    Begin { size: u32, crc32: u32 },
    #[cfg(not(feature = "std"))]
    Block {
        offset: u32,
        data: heapless::Vec<u8, MAX_BLOCK_SIZE>,
    },
    #[cfg(feature = "std")]
    Block {
        offset: u32,
        data: alloc::vec::Vec<u8>,
    },
    /// All blocks sent; verify and store.
    Commit,
}

impl Command {
    /// Build a block command. Returns `None` if `data` exceeds [`MAX_BLOCK_SIZE`].
    pub fn block(offset: u32, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_BLOCK_SIZE {
            return None;
        }

        #[cfg(feature = "std")]
        let data = data.to_vec();
        #[cfg(not(feature = "std"))]
        let data = heapless::Vec::from_slice(data).ok()?;

        Some(Command::Block { offset, data })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ack(AckStatus),
    /// Answer to [`Command::Hello`].
    Ready { target: u8, max_block: u16 },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Ok,
    /// Image CRC did not match what was announced.
    CrcError,
    /// Image does not fit in program memory.
    TooLarge,
    BadCommand,
    BadState,
}
