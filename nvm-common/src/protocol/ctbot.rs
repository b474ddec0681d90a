// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! c't-Bot text loader ("ctbot").
//!
//! Every request and reply is one ASCII line ending in `\n`:
//!
//! ```text
//! L0000012A      announce image size (8 hex digits)
//! :0C94..        up to 32 data bytes as hex
//! E1D0F          CRC-16/XMODEM of the whole image (4 hex digits)
//! ```
//!
//! The bot answers each line with `OK` or `ER`.

use core::fmt::Write;

use heapless::{String, Vec};

/// Data bytes carried by one `:` line.
pub const DATA_LINE_BYTES: usize = 32;

/// Longest request line, terminator included.
pub const MAX_LINE_LEN: usize = 1 + 2 * DATA_LINE_BYTES + 1;

/// Longest reply line the host accepts before giving up on it.
pub const MAX_REPLY_LEN: usize = 16;

pub type Line = Vec<u8, MAX_LINE_LEN>;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Reply to a request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Error,
}

impl Reply {
    /// Parse a reply line without its terminator. Trailing `\r` is ignored.
    pub fn parse(line: &[u8]) -> Option<Self> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        match line {
            b"OK" => Some(Reply::Ok),
            b"ER" => Some(Reply::Error),
            _ => None,
        }
    }
}

pub fn encode_length(size: u32) -> Line {
    let mut s: String<MAX_LINE_LEN> = String::new();
    // "L" + 8 digits + "\n" always fits.
    let _ = write!(s, "L{:08X}\n", size);
    Vec::from_slice(s.as_bytes()).unwrap_or_default()
}

/// Build a data line. Returns `None` for an empty or oversized chunk.
pub fn encode_data(data: &[u8]) -> Option<Line> {
    if data.is_empty() || data.len() > DATA_LINE_BYTES {
        return None;
    }

    let mut line = Line::new();
    line.push(b':').ok()?;
    for &b in data {
        line.push(HEX[(b >> 4) as usize]).ok()?;
        line.push(HEX[(b & 0x0F) as usize]).ok()?;
    }
    line.push(b'\n').ok()?;
    Some(line)
}

pub fn encode_end(crc16: u16) -> Line {
    let mut s: String<MAX_LINE_LEN> = String::new();
    let _ = write!(s, "E{:04X}\n", crc16);
    Vec::from_slice(s.as_bytes()).unwrap_or_default()
}
