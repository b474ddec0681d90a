// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! NanoVM byte loader ("nvc1").
//!
//! The host sends [`SYNC`] until the loader answers [`ACK`], then a series of
//! page frames and finally an end frame:
//!
//! ```text
//! page: [addr_hi, addr_lo, len, data[len].., checksum]   1 <= len <= 16
//! end:  [size_hi, size_lo, 0, checksum]
//! ```
//!
//! The checksum is the two's complement of the 8-bit sum of the preceding
//! frame bytes, so a valid frame sums to zero. Every frame is answered with
//! a single [`ACK`] or [`NAK`] byte.

use heapless::Vec;

pub const SYNC: u8 = b'U';
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;

/// Sync bytes sent before giving up on the loader.
pub const SYNC_ATTEMPTS: usize = 10;

/// Largest page the loader buffers (its UART buffer holds 32 bytes).
pub const PAGE_SIZE: usize = 16;

/// Address, length and checksum bytes around the page data.
pub const FRAME_OVERHEAD: usize = 4;
pub const MAX_FRAME_SIZE: usize = PAGE_SIZE + FRAME_OVERHEAD;

/// Addresses are 16 bit.
pub const MAX_IMAGE_SIZE: usize = u16::MAX as usize;

pub type Frame = Vec<u8, MAX_FRAME_SIZE>;

pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
        .wrapping_neg()
}

/// Check that a received frame sums to zero.
pub fn verify(frame: &[u8]) -> bool {
    frame.len() >= FRAME_OVERHEAD && frame.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
}

/// Build a page frame. Returns `None` for an empty or oversized page.
pub fn encode_page(addr: u16, data: &[u8]) -> Option<Frame> {
    if data.is_empty() || data.len() > PAGE_SIZE {
        return None;
    }

    let mut frame = Frame::new();
    let [hi, lo] = addr.to_be_bytes();
    frame.push(hi).ok()?;
    frame.push(lo).ok()?;
    frame.push(data.len() as u8).ok()?;
    frame.extend_from_slice(data).ok()?;
    let sum = checksum(&frame);
    frame.push(sum).ok()?;
    Some(frame)
}

/// Build the end frame announcing the total image size.
pub fn encode_end(size: u16) -> Frame {
    let [hi, lo] = size.to_be_bytes();
    let mut frame = Frame::new();
    // Capacity is MAX_FRAME_SIZE, these four always fit.
    let _ = frame.extend_from_slice(&[hi, lo, 0]);
    let sum = checksum(&frame);
    let _ = frame.push(sum);
    frame
}
