// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! NanoVM byte loader.
//!
//! Speed: honored for `uart`; `asuro` always runs at 2400 baud and ignores
//! the requested speed.
//!
//! Retries: only the initial sync is retried, up to [`SYNC_ATTEMPTS`] times.
//! A refused page is not resent.
//!
//! Empty images: only the end frame is sent.

use std::time::Duration;

use indicatif::ProgressBar;
use nvm_common::protocol::nvc1::{self, ACK, MAX_IMAGE_SIZE, NAK, PAGE_SIZE, SYNC, SYNC_ATTEMPTS};
use nvm_common::{Family, Speed, TargetId, TARGET_NVC1_ASURO};

use super::{finish_progress, progress_bar, target_entry, TransferOptions, TransferStrategy};
use crate::channel::{Connector, SerialConnector};
use crate::error::{Result, UploadError};
use crate::image::Image;
use crate::transport::{LinkError, Transport};

/// Default wait for a page acknowledgement.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Wait for the answer to one sync byte.
pub const SYNC_TIMEOUT: Duration = Duration::from_millis(100);

pub struct Nvc1Strategy<C = SerialConnector> {
    connector: C,
    options: TransferOptions,
}

impl<C: Connector> Nvc1Strategy<C> {
    pub fn new(connector: C) -> Self {
        Self::with_options(connector, TransferOptions::default())
    }

    pub fn with_options(connector: C, options: TransferOptions) -> Self {
        Self { connector, options }
    }
}

impl<C: Connector> TransferStrategy for Nvc1Strategy<C> {
    fn family(&self) -> Family {
        Family::Nvc1
    }

    fn description(&self) -> &'static str {
        "NanoVM byte loader (16-byte pages, 8-bit checksum)"
    }

    fn transfer(&self, device: &str, target: TargetId, speed: Speed, image: &Image) -> Result<()> {
        let entry = target_entry(Family::Nvc1, target)?;

        if image.len() > MAX_IMAGE_SIZE {
            return Err(UploadError::DeviceRejectedImage {
                device: device.to_string(),
                reason: format!(
                    "image is {} bytes, the loader addresses at most {}",
                    image.len(),
                    MAX_IMAGE_SIZE
                ),
            });
        }

        let line_speed = entry.effective_speed(speed);
        if line_speed != speed {
            log::warn!(
                "Target {} runs at a fixed {} baud, ignoring requested {}",
                entry.name,
                line_speed,
                speed
            );
        }

        let timeout = self.options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mut transport = Transport::open(&self.connector, device, line_speed, timeout)?;

        let pb = progress_bar(self.options.progress, image.len());
        let mut session = Session {
            transport: &mut transport,
            device,
            echo: target == TARGET_NVC1_ASURO,
            offset: 0,
        };
        let result = session.run(image, &pb);
        finish_progress(&pb, &result);
        result
    }
}

struct Session<'a> {
    transport: &'a mut Transport,
    device: &'a str,
    /// The Asuro IR transceiver hears its own transmissions, so every byte
    /// we send comes back before the loader's reply.
    echo: bool,
    offset: usize,
}

impl Session<'_> {
    fn run(&mut self, image: &Image, pb: &ProgressBar) -> Result<()> {
        self.sync()?;

        for chunk in image.as_bytes().chunks(PAGE_SIZE) {
            let addr = self.offset as u16;
            let frame = nvc1::encode_page(addr, chunk)
                .ok_or_else(|| self.interrupted(format!("cannot frame page at 0x{:04x}", addr)))?;

            match self.exchange(&frame, "page acknowledgement")? {
                ACK => {}
                NAK => {
                    return Err(self.rejected(format!("page at 0x{:04x} refused (NAK)", addr)));
                }
                other => {
                    return Err(
                        self.interrupted(format!("unexpected reply 0x{:02x} to page", other))
                    );
                }
            }

            self.offset += chunk.len();
            pb.set_position(self.offset as u64);
            log::trace!("Page 0x{:04x} ({} bytes) acknowledged", addr, chunk.len());
        }

        let end = nvc1::encode_end(image.len() as u16);
        match self.exchange(&end, "end acknowledgement")? {
            ACK => {
                log::debug!("Loader accepted {} bytes", image.len());
                Ok(())
            }
            NAK => Err(self.rejected("loader refused the image (NAK on end frame)".to_string())),
            other => Err(self.interrupted(format!("unexpected reply 0x{:02x} to end frame", other))),
        }
    }

    fn sync(&mut self) -> Result<()> {
        self.transport.drain_rx();

        for attempt in 1..=SYNC_ATTEMPTS {
            let echo = self.echo;
            let reply = self.transport.with_timeout(SYNC_TIMEOUT, |t| {
                t.write_frame(&[SYNC])?;
                let mut byte = t.read_byte()?;
                if echo && byte == SYNC {
                    byte = t.read_byte()?;
                }
                Ok(byte)
            });

            match reply {
                Ok(ACK) => {
                    log::debug!("Loader on {} in sync after {} attempt(s)", self.device, attempt);
                    return Ok(());
                }
                Ok(other) => log::debug!("Sync attempt {}: got 0x{:02x}", attempt, other),
                Err(LinkError::Timeout) => log::debug!("Sync attempt {}: no answer", attempt),
                Err(e) => return Err(self.link(e, "loader sync")),
            }
        }

        Err(UploadError::DeviceTimeout {
            device: self.device.to_string(),
            waiting_for: "loader sync",
        })
    }

    /// Send a frame, swallow its echo if the link has one, and return the reply byte.
    fn exchange(&mut self, frame: &[u8], waiting_for: &'static str) -> Result<u8> {
        self.transport
            .write_frame(frame)
            .map_err(|e| self.link(e, waiting_for))?;

        if self.echo {
            let mut echoed = vec![0u8; frame.len()];
            self.transport
                .read_exact(&mut echoed)
                .map_err(|e| self.link(e, "IR echo"))?;
            if echoed != frame {
                return Err(self.interrupted("IR echo does not match what was sent".to_string()));
            }
        }

        self.transport
            .read_byte()
            .map_err(|e| self.link(e, waiting_for))
    }

    fn link(&self, err: LinkError, waiting_for: &'static str) -> UploadError {
        UploadError::link(err, self.device, self.offset, waiting_for)
    }

    fn rejected(&self, reason: String) -> UploadError {
        UploadError::DeviceRejectedImage {
            device: self.device.to_string(),
            reason,
        }
    }

    fn interrupted(&self, reason: String) -> UploadError {
        UploadError::TransferInterrupted {
            device: self.device.to_string(),
            offset: self.offset,
            reason,
        }
    }
}
