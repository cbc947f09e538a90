//! Best-effort event uplink: turns a tag transition into a 34-byte ASCII GET
//! line and hands it to a line-oriented transport.
//!
//! Grounded on `upload_to_server`'s AT-command CIPSTART/CIPSEND/payload/blank
//! line sequence in `examples/original_source/GccApplication1_644.c`, and on
//! the TCP reconnect-and-retry shape of `connect_panopticon`/`ensure_connected`
//! /`send_scan` in `sentinel/src/main.rs`. The teacher's board speaks Wi-Fi
//! natively (`esp-idf-svc`'s `EspWifi`) rather than driving an ESP8266 over a
//! second UART with AT commands, so the transport here is a raw
//! `std::net::TcpStream` write instead of a CIPSTART/CIPSEND dance.

use crate::decoder::TagHex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connected,
    Disconnected,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkError {
    NotConnected,
    Io,
}

impl core::fmt::Display for UplinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UplinkError::NotConnected => write!(f, "uplink is not connected"),
            UplinkError::Io => write!(f, "uplink transport error"),
        }
    }
}

impl std::error::Error for UplinkError {}

/// Line-oriented transport contract a Wi-Fi collaborator must satisfy.
pub trait Uplink {
    fn send_line(&mut self, s: &[u8]) -> Result<(), UplinkError>;
    fn reset(&mut self) -> Result<(), UplinkError>;
    fn status(&self) -> LinkStatus;
}

/// Length of `GET /add/##########/& HTTP/1.0` in bytes, not counting the
/// CRLF the transport appends.
pub const EVENT_LINE_LEN: usize = 30;

/// Build the 30-byte payload line for one transition and hand it to the
/// transport. Failures are logged and dropped; the caller's state
/// transition has already been applied and is never rolled back.
pub fn emit<U: Uplink>(uplink: &mut U, id: &TagHex, action: u8) {
    let line = build_event_line(id, action);
    if let Err(err) = uplink.send_line(&line) {
        log::warn!("event uplink dropped a line: {err}");
    }
}

fn build_event_line(id: &TagHex, action: u8) -> [u8; EVENT_LINE_LEN] {
    let mut line = [0u8; EVENT_LINE_LEN];
    line[..9].copy_from_slice(b"GET /add/");
    line[9..19].copy_from_slice(id);
    line[19] = b'/';
    line[20] = action;
    line[21..].copy_from_slice(b" HTTP/1.0");
    line
}

#[cfg(feature = "hw")]
pub mod hw {
    use super::*;
    use crate::logger::TcpHandle;
    use std::io::{Error, ErrorKind, Write};
    use std::net::TcpStream;

    /// Wi-Fi-backed uplink over a plain TCP socket, sharing its connection
    /// with [`crate::logger::DualLogger`]'s TCP mirror rather than opening a
    /// second socket to the same host — the same shared-handle shape
    /// `connect_panopticon`/`ensure_connected`/`send_scan` use in the
    /// teacher's `main.rs`. Reconnects lazily on the next send after a
    /// failed write.
    pub struct EspWifiUplink {
        addr: String,
        tcp: TcpHandle,
    }

    impl EspWifiUplink {
        pub fn new(addr: impl Into<String>, tcp: TcpHandle) -> Self {
            Self { addr: addr.into(), tcp }
        }

        fn is_connected(&self) -> bool {
            self.tcp.lock().map(|guard| guard.is_some()).unwrap_or(false)
        }

        fn connect(&self) -> Result<(), UplinkError> {
            match TcpStream::connect(&self.addr) {
                Ok(stream) => {
                    if let Ok(mut guard) = self.tcp.lock() {
                        *guard = Some(stream);
                    }
                    Ok(())
                }
                Err(err) => {
                    log::warn!("uplink connect to {} failed: {err}", self.addr);
                    Err(UplinkError::Io)
                }
            }
        }

        fn write_once(&self, s: &[u8]) -> std::io::Result<()> {
            let mut guard = self
                .tcp
                .lock()
                .map_err(|_| Error::new(ErrorKind::Other, "tcp handle poisoned"))?;
            match guard.as_mut() {
                Some(stream) => {
                    stream.write_all(s)?;
                    stream.write_all(b"\r\n")?;
                    stream.write_all(b"\r\n")
                }
                None => Err(Error::new(ErrorKind::NotConnected, "uplink not connected")),
            }
        }
    }

    impl Uplink for EspWifiUplink {
        fn send_line(&mut self, s: &[u8]) -> Result<(), UplinkError> {
            if !self.is_connected() {
                self.connect()?;
            }

            if self.write_once(s).is_ok() {
                return Ok(());
            }

            if let Ok(mut guard) = self.tcp.lock() {
                *guard = None;
            }
            self.connect()?;
            self.write_once(s).map_err(|_| UplinkError::Io)
        }

        fn reset(&mut self) -> Result<(), UplinkError> {
            if let Ok(mut guard) = self.tcp.lock() {
                *guard = None;
            }
            self.connect()
        }

        fn status(&self) -> LinkStatus {
            if self.is_connected() {
                LinkStatus::Connected
            } else {
                LinkStatus::Disconnected
            }
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Records every line handed to it, in order, instead of sending
    /// anything over a real transport.
    pub struct NullUplink {
        pub lines: Vec<Vec<u8>>,
        pub fail_next: bool,
    }

    impl NullUplink {
        pub fn new() -> Self {
            Self {
                lines: Vec::new(),
                fail_next: false,
            }
        }
    }

    impl Default for NullUplink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Uplink for NullUplink {
        fn send_line(&mut self, s: &[u8]) -> Result<(), UplinkError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(UplinkError::Io);
            }
            self.lines.push(s.to_vec());
            Ok(())
        }

        fn reset(&mut self) -> Result<(), UplinkError> {
            Ok(())
        }

        fn status(&self) -> LinkStatus {
            LinkStatus::Connected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::NullUplink;
    use super::*;

    #[test]
    fn event_line_matches_wire_layout() {
        let line = build_event_line(b"310037D93D", b'o');
        assert_eq!(&line, b"GET /add/310037D93D/o HTTP/1.0");
        assert_eq!(line.len(), EVENT_LINE_LEN);
    }

    #[test]
    fn emit_records_a_dropped_send_without_panicking() {
        let mut uplink = NullUplink::new();
        uplink.fail_next = true;
        emit(&mut uplink, b"0000000000", b'o');
        assert!(uplink.lines.is_empty());
    }

    #[test]
    fn emit_preserves_order_across_several_events() {
        let mut uplink = NullUplink::new();
        emit(&mut uplink, b"1111111111", b'o');
        emit(&mut uplink, b"2222222222", b'i');
        emit(&mut uplink, b"3333333333", b'a');

        assert_eq!(uplink.lines[0], build_event_line(b"1111111111", b'o'));
        assert_eq!(uplink.lines[1], build_event_line(b"2222222222", b'i'));
        assert_eq!(uplink.lines[2], build_event_line(b"3333333333", b'a'));
    }
}
