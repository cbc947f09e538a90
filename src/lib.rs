//! PharmaTracker appliance logic: EM4100 tag decoding, per-tag check-in/
//! check-out tracking with overdue alarms, and a four-screen LCD UI, wired
//! up for an ESP32 board in `main.rs`.
//!
//! Split so the algorithmic core (decoding, the scan buffer, the tag
//! registry, the tick accountant, the controller state machine, and the
//! uplink line format) has no dependency on `esp-idf-svc` and can be
//! exercised with `cargo test --no-default-features`; only the `hw`
//! submodules reach for real GPIO/LEDC/Wi-Fi.

pub mod buttons;
pub mod buzzer;
pub mod controller;
pub mod decoder;
pub mod lcd;
pub mod logger;
pub mod registry;
pub mod scan_buffer;
pub mod screen;
pub mod tick;
pub mod uplink;
