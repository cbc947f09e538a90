//! Dual-drain logger: ESP-IDF serial always, plus a best-effort TCP mirror
//! to the same host the event uplink talks to.
//!
//! Ported from `sentinel/src/logger.rs`'s `DualLogger`, sharing that
//! file's newline-sanitizing rule so one `LOG:` line can't be split or
//! injected by a message containing a stray `\r`/`\n`.

#![cfg(feature = "hw")]

use std::io::Write;
use std::net::TcpStream;
use std::sync::Mutex;

use log::{Level, Log, Metadata, Record};

/// Shared TCP stream handle. `None` when not yet connected or after a
/// disconnect; the main loop's uplink reconnect logic refills it.
pub type TcpHandle = &'static Mutex<Option<TcpStream>>;

pub struct DualLogger {
    tcp: TcpHandle,
    serial: esp_idf_svc::log::EspLogger,
}

impl DualLogger {
    /// Registers as the global logger and returns the shared TCP handle so
    /// the caller can later store a connected stream into it.
    pub fn init() -> TcpHandle {
        static TCP_STREAM: Mutex<Option<TcpStream>> = Mutex::new(None);

        let logger = Box::new(DualLogger {
            tcp: &TCP_STREAM,
            serial: esp_idf_svc::log::EspLogger::new(),
        });

        log::set_logger(Box::leak(logger)).expect("logger already set");
        log::set_max_level(log::LevelFilter::Info);

        &TCP_STREAM
    }
}

impl Log for DualLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        self.serial.log(record);

        if let Ok(mut guard) = self.tcp.try_lock() {
            if let Some(ref mut stream) = *guard {
                let msg = format!("LOG: [{} {}] {}", record.level(), record.target(), record.args());
                let line = msg.replace('\r', "\\r").replace('\n', "\\n") + "\n";
                if stream.write_all(line.as_bytes()).is_err() {
                    *guard = None;
                }
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.tcp.try_lock() {
            if let Some(ref mut stream) = *guard {
                let _ = stream.flush();
            }
        }
    }
}
