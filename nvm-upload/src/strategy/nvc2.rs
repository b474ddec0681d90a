// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! NanoVM framed loader (postcard over COBS).
//!
//! Speed: always honored.
//!
//! Retries: none. Any refused command aborts the transfer.
//!
//! Empty images: `Begin { size: 0 }` followed directly by `Commit`.

use std::time::Duration;

use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::ProgressBar;
use nvm_common::protocol::nvc2::{AckStatus, Command, Response, MAX_BLOCK_SIZE};
use nvm_common::{Family, Speed, TargetId};

use super::{finish_progress, progress_bar, target_entry, TransferOptions, TransferStrategy};
use crate::channel::{Connector, SerialConnector};
use crate::error::{Result, UploadError};
use crate::image::Image;
use crate::transport::{LinkError, Transport};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Default wait for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// The loader verifies and writes program memory before answering `Commit`.
pub const COMMIT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Nvc2Strategy<C = SerialConnector> {
    connector: C,
    options: TransferOptions,
}

impl<C: Connector> Nvc2Strategy<C> {
    pub fn new(connector: C) -> Self {
        Self::with_options(connector, TransferOptions::default())
    }

    pub fn with_options(connector: C, options: TransferOptions) -> Self {
        Self { connector, options }
    }
}

impl<C: Connector> TransferStrategy for Nvc2Strategy<C> {
    fn family(&self) -> Family {
        Family::Nvc2
    }

    fn description(&self) -> &'static str {
        "NanoVM framed loader (postcard/COBS, CRC-32)"
    }

    fn transfer(&self, device: &str, target: TargetId, speed: Speed, image: &Image) -> Result<()> {
        target_entry(Family::Nvc2, target)?;

        let size = u32::try_from(image.len()).map_err(|_| UploadError::DeviceRejectedImage {
            device: device.to_string(),
            reason: format!("image of {} bytes exceeds the 32-bit size field", image.len()),
        })?;

        let timeout = self.options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mut transport = Transport::open(&self.connector, device, speed, timeout)?;

        let pb = progress_bar(self.options.progress, image.len());
        let mut session = Session {
            transport: &mut transport,
            device,
            offset: 0,
        };
        let result = session.run(target, size, image, &pb);
        finish_progress(&pb, &result);
        result
    }
}

struct Session<'a> {
    transport: &'a mut Transport,
    device: &'a str,
    offset: usize,
}

impl Session<'_> {
    fn run(&mut self, target: TargetId, size: u32, image: &Image, pb: &ProgressBar) -> Result<()> {
        self.transport.drain_rx();

        let block_size = self.hello(target)?;

        let crc32 = CRC32.checksum(image.as_bytes());
        log::debug!("Image: {} bytes, CRC32 0x{:08x}", size, crc32);
        let response = self.request(&Command::Begin { size, crc32 }, "begin acknowledgement")?;
        self.expect_ok(response, "Begin")?;

        for chunk in image.as_bytes().chunks(block_size) {
            let cmd = Command::block(self.offset as u32, chunk)
                .ok_or_else(|| self.interrupted(format!("block of {} bytes", chunk.len())))?;
            let response = self.request(&cmd, "block acknowledgement")?;
            self.expect_ok(response, "Block")?;

            self.offset += chunk.len();
            pb.set_position(self.offset as u64);
        }

        let response: Response = self
            .transport
            .with_timeout(COMMIT_TIMEOUT, |t| t.send_recv(&Command::Commit))
            .map_err(|e| self.link(e, "commit acknowledgement"))?;
        self.expect_ok(response, "Commit")?;

        log::debug!("Loader committed {} bytes", size);
        Ok(())
    }

    /// Check the loader speaks for `target` and return the block size to use.
    fn hello(&mut self, target: TargetId) -> Result<usize> {
        let response = self.request(
            &Command::Hello {
                target: target.raw(),
            },
            "loader hello",
        )?;

        match response {
            Response::Ready {
                target: answered,
                max_block,
            } => {
                if answered != target.raw() {
                    return Err(UploadError::UnknownTarget {
                        family: Family::Nvc2,
                        target: target.to_string(),
                    });
                }
                if max_block == 0 {
                    return Err(self.interrupted("loader reported a zero block size".to_string()));
                }
                let block_size = usize::from(max_block).min(MAX_BLOCK_SIZE);
                log::debug!("Loader ready, {} byte blocks", block_size);
                Ok(block_size)
            }
            Response::Ack(status) => {
                Err(self.interrupted(format!("Hello answered with {:?}", status)))
            }
        }
    }

    fn request(&mut self, cmd: &Command, waiting_for: &'static str) -> Result<Response> {
        self.transport
            .send_recv(cmd)
            .map_err(|e| self.link(e, waiting_for))
    }

    fn expect_ok(&self, response: Response, stage: &str) -> Result<()> {
        match response {
            Response::Ack(AckStatus::Ok) => Ok(()),
            Response::Ack(AckStatus::CrcError) => Err(UploadError::DeviceRejectedImage {
                device: self.device.to_string(),
                reason: "CRC verification failed".to_string(),
            }),
            Response::Ack(AckStatus::TooLarge) => Err(UploadError::DeviceRejectedImage {
                device: self.device.to_string(),
                reason: "image does not fit in program memory".to_string(),
            }),
            Response::Ack(status @ (AckStatus::BadCommand | AckStatus::BadState)) => {
                Err(self.interrupted(format!("{} failed: {:?}", stage, status)))
            }
            Response::Ready { .. } => {
                Err(self.interrupted(format!("unexpected response to {}: {:?}", stage, response)))
            }
        }
    }

    fn link(&self, err: LinkError, waiting_for: &'static str) -> UploadError {
        UploadError::link(err, self.device, self.offset, waiting_for)
    }

    fn interrupted(&self, reason: String) -> UploadError {
        UploadError::TransferInterrupted {
            device: self.device.to_string(),
            offset: self.offset,
            reason,
        }
    }
}
