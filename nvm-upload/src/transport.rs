// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer shared by the transfer strategies.

use std::io::{self, Read, Write};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use nvm_common::Speed;

use crate::channel::{Channel, Connector};
use crate::error::{Result, UploadError};

/// Longest COBS frame accepted before the stream is declared garbage.
pub const MAX_RX_FRAME: usize = 4096;

/// Failure on an already open link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("timed out")]
    Timeout,

    #[error("connection closed")]
    Closed,

    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed reply: {0}")]
    Malformed(String),
}

/// An open link to the target. Dropping it closes the device.
pub struct Transport {
    channel: Box<dyn Channel>,
    rx_buf: Vec<u8>,
}

impl Transport {
    pub fn new(channel: Box<dyn Channel>) -> Self {
        Self {
            channel,
            rx_buf: Vec::with_capacity(256),
        }
    }

    /// Open `device` through `connector`.
    pub fn open(
        connector: &dyn Connector,
        device: &str,
        speed: Speed,
        timeout: Duration,
    ) -> Result<Self> {
        let channel =
            connector
                .open(device, speed, timeout)
                .map_err(|source| UploadError::DeviceOpen {
                    device: device.to_string(),
                    source,
                })?;
        Ok(Self::new(channel))
    }

    /// Write a complete request and flush it onto the line.
    pub fn write_frame(&mut self, bytes: &[u8]) -> std::result::Result<(), LinkError> {
        self.channel.write_all(bytes)?;
        self.channel.flush()?;
        log::trace!("tx {:02x?}", bytes);
        Ok(())
    }

    pub fn read_byte(&mut self) -> std::result::Result<u8, LinkError> {
        let mut byte = [0u8; 1];
        loop {
            match self.channel.read(&mut byte) {
                Ok(1) => return Ok(byte[0]),
                Ok(_) => return Err(LinkError::Closed),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(LinkError::Timeout),
                Err(e) => return Err(LinkError::Io(e)),
            }
        }
    }

    /// Read exactly `buf.len()` bytes.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> std::result::Result<(), LinkError> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }

    /// Read one `\n`-terminated line, terminator stripped.
    pub fn read_line(&mut self, max_len: usize) -> std::result::Result<Vec<u8>, LinkError> {
        let mut line = Vec::new();
        loop {
            match self.read_byte()? {
                b'\n' => break,
                byte if line.len() < max_len => line.push(byte),
                _ => {
                    return Err(LinkError::Malformed(format!(
                        "line longer than {} bytes",
                        max_len
                    )))
                }
            }
        }
        log::trace!("rx line {:?}", String::from_utf8_lossy(&line));
        Ok(line)
    }

    /// Send a postcard message, COBS-framed.
    pub fn send<T: Serialize>(&mut self, msg: &T) -> std::result::Result<(), LinkError> {
        let encoded = postcard::to_stdvec_cobs(msg)
            .map_err(|e| LinkError::Malformed(format!("failed to serialize: {}", e)))?;
        self.write_frame(&encoded)
    }

    /// Receive one COBS-framed postcard message.
    pub fn receive<T: DeserializeOwned>(&mut self) -> std::result::Result<T, LinkError> {
        self.rx_buf.clear();

        // Read until we get delimiter (0x00)
        loop {
            let byte = self.read_byte()?;
            self.rx_buf.push(byte);
            if byte == 0 {
                break;
            }
            if self.rx_buf.len() > MAX_RX_FRAME {
                return Err(LinkError::Malformed(format!(
                    "no frame delimiter within {} bytes",
                    MAX_RX_FRAME
                )));
            }
        }

        let len = self.rx_buf.len();
        postcard::from_bytes_cobs(&mut self.rx_buf).map_err(|e| {
            LinkError::Malformed(format!(
                "failed to deserialize: {} (raw {} bytes: {:02x?})",
                e,
                len,
                &self.rx_buf[..len.min(32)]
            ))
        })
    }

    /// Discard whatever the device sent before we started talking.
    pub fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        let old_timeout = self.channel.timeout();
        let _ = self.channel.set_timeout(Duration::from_millis(10));
        while self.channel.read(&mut buf).unwrap_or(0) > 0 {}
        let _ = self.channel.set_timeout(old_timeout);
    }

    /// Send a message and wait for the reply.
    pub fn send_recv<C: Serialize, R: DeserializeOwned>(
        &mut self,
        cmd: &C,
    ) -> std::result::Result<R, LinkError> {
        self.send(cmd)?;
        self.receive()
    }

    /// Run `f` with a different read timeout, restoring the old one afterwards.
    pub fn with_timeout<T>(
        &mut self,
        timeout: Duration,
        f: impl FnOnce(&mut Self) -> std::result::Result<T, LinkError>,
    ) -> std::result::Result<T, LinkError> {
        let old_timeout = self.channel.timeout();
        self.channel.set_timeout(timeout)?;

        let result = f(self);

        let _ = self.channel.set_timeout(old_timeout);
        result
    }
}
