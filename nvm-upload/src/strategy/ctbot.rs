// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! c't-Bot text loader.
//!
//! Speed: always honored.
//!
//! Retries: none.
//!
//! Empty images: `L00000000` followed directly by the end line.

use std::time::Duration;

use crc::{Crc, CRC_16_XMODEM};
use indicatif::ProgressBar;
use nvm_common::protocol::ctbot::{self, Reply, DATA_LINE_BYTES, MAX_REPLY_LEN};
use nvm_common::{Family, Speed, TargetId};

use super::{finish_progress, progress_bar, target_entry, TransferOptions, TransferStrategy};
use crate::channel::{Connector, SerialConnector};
use crate::error::{Result, UploadError};
use crate::image::Image;
use crate::transport::{LinkError, Transport};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// The bot writes the image to EEPROM before answering the end line.
pub const END_TIMEOUT: Duration = Duration::from_secs(5);

pub struct CtBotStrategy<C = SerialConnector> {
    connector: C,
    options: TransferOptions,
}

impl<C: Connector> CtBotStrategy<C> {
    pub fn new(connector: C) -> Self {
        Self::with_options(connector, TransferOptions::default())
    }

    pub fn with_options(connector: C, options: TransferOptions) -> Self {
        Self { connector, options }
    }
}

impl<C: Connector> TransferStrategy for CtBotStrategy<C> {
    fn family(&self) -> Family {
        Family::CtBot
    }

    fn description(&self) -> &'static str {
        "c't-Bot text loader (hex lines, CRC-16)"
    }

    fn transfer(&self, device: &str, target: TargetId, speed: Speed, image: &Image) -> Result<()> {
        target_entry(Family::CtBot, target)?;

        let size = u32::try_from(image.len()).map_err(|_| UploadError::DeviceRejectedImage {
            device: device.to_string(),
            reason: format!("image of {} bytes is too large", image.len()),
        })?;

        let timeout = self.options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let mut transport = Transport::open(&self.connector, device, speed, timeout)?;

        let pb = progress_bar(self.options.progress, image.len());
        let mut session = Session {
            transport: &mut transport,
            device,
            offset: 0,
        };
        let result = session.run(size, image, &pb);
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
    fn run(&mut self, size: u32, image: &Image, pb: &ProgressBar) -> Result<()> {
        self.transport.drain_rx();

        let reply = self.exchange(&ctbot::encode_length(size), "size acknowledgement")?;
        self.expect_ok(reply, "size announcement")?;

        for chunk in image.as_bytes().chunks(DATA_LINE_BYTES) {
            let line = ctbot::encode_data(chunk)
                .ok_or_else(|| self.interrupted(format!("cannot encode {} bytes", chunk.len())))?;
            let reply = self.exchange(&line, "data acknowledgement")?;
            self.expect_ok(reply, "data line")?;

            self.offset += chunk.len();
            pb.set_position(self.offset as u64);
        }

        let crc16 = CRC16.checksum(image.as_bytes());
        log::debug!("Image: {} bytes, CRC16 0x{:04x}", size, crc16);
        let end = ctbot::encode_end(crc16);
        let reply = self
            .transport
            .with_timeout(END_TIMEOUT, |t| {
                t.write_frame(&end)?;
                t.read_line(MAX_REPLY_LEN)
            })
            .map_err(|e| self.link(e, "end acknowledgement"))?;
        self.expect_ok(reply, "image")?;

        log::debug!("Bot stored {} bytes", size);
        Ok(())
    }

    /// Send one line and return the reply line.
    fn exchange(&mut self, line: &[u8], waiting_for: &'static str) -> Result<Vec<u8>> {
        self.transport
            .write_frame(line)
            .and_then(|_| self.transport.read_line(MAX_REPLY_LEN))
            .map_err(|e| self.link(e, waiting_for))
    }

    fn expect_ok(&self, reply: Vec<u8>, what: &str) -> Result<()> {
        match Reply::parse(&reply) {
            Some(Reply::Ok) => Ok(()),
            Some(Reply::Error) => Err(UploadError::DeviceRejectedImage {
                device: self.device.to_string(),
                reason: format!("bot answered ER to the {}", what),
            }),
            None => Err(self.interrupted(format!(
                "unexpected reply {:?} to the {}",
                String::from_utf8_lossy(&reply),
                what
            ))),
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

#[cfg(test)]
mod tests {
    use super::*;

    use crate::channel::fake::{Reply as DeviceReply, ScriptedConnector};
    use crate::error::ErrorKind;
    use nvm_common::TARGET_CTBOT;

    fn ok() -> DeviceReply {
        DeviceReply::Bytes(b"OK\r\n".to_vec())
    }

    fn er() -> DeviceReply {
        DeviceReply::Bytes(b"ER\n".to_vec())
    }

    fn upload(connector: &ScriptedConnector, image: &[u8]) -> Result<()> {
        CtBotStrategy::new(connector.clone()).transfer(
            "/dev/ttyUSB1",
            TARGET_CTBOT,
            Speed::new(57_600).unwrap(),
            &Image::new(image.to_vec()),
        )
    }

    #[test]
    fn test_upload_lines() {
        let connector = ScriptedConnector::new([ok(), ok(), ok()]);
        upload(&connector, &[0x0C, 0x94]).unwrap();

        let expected = format!("L00000002\n:0C94\nE{:04X}\n", CRC16.checksum(&[0x0C, 0x94]));
        assert_eq!(String::from_utf8(connector.written()).unwrap(), expected);
        assert_eq!(connector.opens(), vec![("/dev/ttyUSB1".to_string(), 57_600)]);
        assert_eq!(connector.open_channels(), 0);
    }

    #[test]
    fn test_data_split_into_lines() {
        let image = vec![0x11; DATA_LINE_BYTES + 3];
        let connector = ScriptedConnector::new([ok(), ok(), ok(), ok()]);
        upload(&connector, &image).unwrap();

        let written = String::from_utf8(connector.written()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].len(), 1 + 2 * DATA_LINE_BYTES);
        assert_eq!(lines[2], ":111111");
    }

    #[test]
    fn test_empty_image() {
        let connector = ScriptedConnector::new([ok(), ok()]);
        upload(&connector, &[]).unwrap();
        assert_eq!(
            String::from_utf8(connector.written()).unwrap(),
            "L00000000\nE0000\n"
        );
    }

    #[test]
    fn test_er_on_data_is_rejected() {
        let connector = ScriptedConnector::new([ok(), er()]);
        let err = upload(&connector, &[1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceRejectedImage);
        assert_eq!(connector.open_channels(), 0);
    }

    #[test]
    fn test_er_on_crc_is_rejected() {
        let connector = ScriptedConnector::new([ok(), ok(), er()]);
        let err = upload(&connector, &[1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceRejectedImage);
    }

    #[test]
    fn test_unexpected_line_is_interrupted() {
        let connector = ScriptedConnector::new([ok(), DeviceReply::Bytes(b"HUH\n".to_vec())]);
        let err = upload(&connector, &[1]).unwrap_err();
        assert!(matches!(
            err,
            UploadError::TransferInterrupted { offset: 0, .. }
        ));
    }

    #[test]
    fn test_silent_bot_is_timeout() {
        let connector = ScriptedConnector::new([DeviceReply::Silence]);
        let err = upload(&connector, &[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceTimeout);
    }

    #[test]
    fn test_hangup_is_interrupted() {
        let connector = ScriptedConnector::new([ok(), DeviceReply::Hangup]);
        let err = upload(&connector, &[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransferInterrupted);
        assert_eq!(connector.open_channels(), 0);
    }

    #[test]
    fn test_unknown_target() {
        let connector = ScriptedConnector::new([]);
        let err = CtBotStrategy::new(connector.clone())
            .transfer(
                "/dev/ttyUSB1",
                TargetId::new(5),
                Speed::new(57_600).unwrap(),
                &Image::new(vec![1]),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownTarget);
        assert!(connector.opens().is_empty());
    }
}
