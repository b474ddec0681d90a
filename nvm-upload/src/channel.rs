// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Byte channels to a target and the connectors that open them.
//!
//! Strategies never touch `serialport` directly. They ask a [`Connector`] for
//! a [`Channel`], which keeps the protocol code testable without hardware.

use std::io::{self, Read, Write};
use std::time::Duration;

use nvm_common::Speed;
use serialport::SerialPort;

/// A duplex byte stream with a read timeout.
///
/// A read that times out must fail with [`io::ErrorKind::TimedOut`]. The
/// channel is closed when dropped.
pub trait Channel: Read + Write {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    fn timeout(&self) -> Duration;
}

/// Opens a channel to a named device.
pub trait Connector {
    fn open(&self, device: &str, speed: Speed, timeout: Duration) -> io::Result<Box<dyn Channel>>;
}

/// Opens real serial ports (8N1, no flow control).
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn open(&self, device: &str, speed: Speed, timeout: Duration) -> io::Result<Box<dyn Channel>> {
        let port = serialport::new(device, speed.get())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()?;

        log::debug!("Opened {} at {} baud", device, speed);
        Ok(Box::new(port))
    }
}

impl Channel for Box<dyn SerialPort> {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        SerialPort::set_timeout(&mut **self, timeout).map_err(io::Error::from)
    }

    fn timeout(&self) -> Duration {
        SerialPort::timeout(&**self)
    }
}

/// Scripted in-memory device for protocol tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};
    use std::rc::Rc;
    use std::time::Duration;

    use nvm_common::Speed;

    use super::{Channel, Connector};

    /// What the device does after the host flushes a request.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Bytes(Vec<u8>),
        /// Say nothing; the next read times out.
        Silence,
        /// Drop the line; reads return end-of-stream.
        Hangup,
    }

    #[derive(Default)]
    struct State {
        replies: VecDeque<Reply>,
        rx: VecDeque<u8>,
        written: Vec<u8>,
        hung_up: bool,
        fail_open: bool,
        opens: Vec<(String, u32)>,
        open_channels: usize,
    }

    #[derive(Clone, Default)]
    pub struct ScriptedConnector {
        state: Rc<RefCell<State>>,
    }

    impl ScriptedConnector {
        pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            let connector = Self::default();
            connector.state.borrow_mut().replies = replies.into_iter().collect();
            connector
        }

        /// A connector whose device does not exist.
        pub fn failing() -> Self {
            let connector = Self::default();
            connector.state.borrow_mut().fail_open = true;
            connector
        }

        /// Every byte the host wrote, across all opens.
        pub fn written(&self) -> Vec<u8> {
            self.state.borrow().written.clone()
        }

        /// (device, baud) of each successful open.
        pub fn opens(&self) -> Vec<(String, u32)> {
            self.state.borrow().opens.clone()
        }

        /// Channels opened and not yet dropped.
        pub fn open_channels(&self) -> usize {
            self.state.borrow().open_channels
        }
    }

    impl Connector for ScriptedConnector {
        fn open(
            &self,
            device: &str,
            speed: Speed,
            timeout: Duration,
        ) -> io::Result<Box<dyn Channel>> {
            let mut state = self.state.borrow_mut();
            if state.fail_open {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no such device"));
            }
            state.opens.push((device.to_string(), speed.get()));
            state.open_channels += 1;
            Ok(Box::new(ScriptedChannel {
                state: Rc::clone(&self.state),
                timeout,
            }))
        }
    }

    struct ScriptedChannel {
        state: Rc<RefCell<State>>,
        timeout: Duration,
    }

    impl Read for ScriptedChannel {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut state = self.state.borrow_mut();
            if state.rx.is_empty() {
                if state.hung_up {
                    return Ok(0);
                }
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no reply"));
            }
            let n = buf.len().min(state.rx.len());
            for slot in buf.iter_mut().take(n) {
                *slot = state.rx.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    impl Write for ScriptedChannel {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.state.borrow_mut().written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            let mut state = self.state.borrow_mut();
            match state.replies.pop_front() {
                Some(Reply::Bytes(bytes)) => state.rx.extend(bytes),
                Some(Reply::Hangup) => state.hung_up = true,
                Some(Reply::Silence) | None => {}
            }
            Ok(())
        }
    }

    impl Channel for ScriptedChannel {
        fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.timeout = timeout;
            Ok(())
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }
    }

    impl Drop for ScriptedChannel {
        fn drop(&mut self) {
            self.state.borrow_mut().open_channels -= 1;
        }
    }
}
