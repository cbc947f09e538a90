//! Four-screen UI and the setup wizard, grounded on `clocks_screen`,
//! `confirm_setup_screen`, `tagsID_screen`, `setup_screen`, `set_card_id`,
//! `set_card_timeout`, and `format_time` in
//! `examples/original_source/GccApplication1_644.c`.
//!
//! The original dispatches four free functions through a raw `screen_t`
//! enum and a `switch` in `main`; here `Navigator` is one state machine
//! whose `step` methods each return the next [`Screen`] to enter, and the
//! setup wizard's `counter`/100-sentinel pair becomes a typed
//! [`SetupState`] instead of an `int` that can go negative or hit a magic
//! "done" value.

use std::time::Instant;

use crate::buttons::{Button, Buttons};
use crate::buzzer::Buzzer;
use crate::controller::{Outcome, TagController};
use crate::decoder::{self, SampleSource, TagHex};
use crate::lcd::Lcd;
use crate::registry::TagStatus;
use crate::scan_buffer::ScanBuffer;
use crate::tick::Ticker;
use crate::uplink::Uplink;

/// Which wizard stage `setup` is on: even stages scan a new id for
/// `slot`, odd stages edit its timeout. Mirrors the original's
/// `counter >> 1` / `counter & 1` split without reusing the counter as
/// both an index and a stage flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupState {
    stage: i32,
    slot_count: usize,
}

impl SetupState {
    pub fn first(slot_count: usize) -> Self {
        Self { stage: 0, slot_count }
    }

    fn slot(&self) -> usize {
        (self.stage / 2) as usize
    }

    fn editing_timeout(&self) -> bool {
        self.stage % 2 == 1
    }

    fn done(&self) -> bool {
        self.stage >= 2 * self.slot_count as i32
    }

    fn aborted(&self) -> bool {
        self.stage < 0
    }

    fn advance(&mut self, success: bool) {
        self.stage += if success { 1 } else { -1 };
    }
}

/// Which of the four UI screens is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Clocks,
    ConfirmSetup,
    Tags,
    Setup(SetupState),
}

/// Writes `seconds` as `MM:SS` into `out`, replacing the original's
/// `static char time_str[6]` (a pointer to a buffer reused, and
/// invalidated, by the next call) with a value written into
/// caller-provided storage.
pub fn format_time(seconds: u16, out: &mut [u8; 5]) {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    out[0] = b'0' + (minutes / 10) as u8;
    out[1] = b'0' + (minutes % 10) as u8;
    out[2] = b':';
    out[3] = b'0' + (secs / 10) as u8;
    out[4] = b'0' + (secs % 10) as u8;
}

/// Progress of the MM:SS digit wizard within `set_card_timeout`. Pulled
/// out as its own pure-logic type so the cursor-skip-over-`:`,
/// wraparound, and abort/finish rules are host-testable without a real
/// LCD or button matrix.
pub struct TimeoutEditor {
    digits: [u8; 5], // [min_tens, min_ones, _, sec_tens, sec_ones]
    cursor: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorStep {
    Continue,
    Aborted,
    Finished,
}

impl TimeoutEditor {
    pub fn new(initial_seconds: u16) -> Self {
        let minutes = initial_seconds / 60;
        let secs = initial_seconds % 60;
        Self {
            digits: [
                (minutes / 10) as u8,
                (minutes % 10) as u8,
                0,
                (secs / 10) as u8,
                (secs % 10) as u8,
            ],
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor as usize
    }

    pub fn digit(&self, index: usize) -> u8 {
        self.digits[index]
    }

    /// Mirrors the `LEFT` branch: moves left, skipping index 2 (the `:`
    /// placeholder); aborts if already at the leftmost digit.
    pub fn on_left(&mut self) -> EditorStep {
        if self.cursor <= 0 {
            return EditorStep::Aborted;
        }
        loop {
            self.cursor -= 1;
            if self.cursor != 2 {
                break;
            }
        }
        EditorStep::Continue
    }

    /// Mirrors the `RIGHT` branch: moves right, skipping the `:`;
    /// finishes if already at the rightmost digit.
    pub fn on_right(&mut self) -> EditorStep {
        if self.cursor >= 4 {
            return EditorStep::Finished;
        }
        loop {
            self.cursor += 1;
            if self.cursor != 2 {
                break;
            }
        }
        EditorStep::Continue
    }

    /// `OK` always finishes, matching the original.
    pub fn on_ok(&self) -> EditorStep {
        EditorStep::Finished
    }

    /// Mirrors the `UP`/`DOWN` branches: the tens-of-minutes and
    /// tens-of-seconds digits wrap mod 6, the rest wrap mod 10.
    pub fn adjust(&mut self, increase: bool) {
        let idx = self.cursor();
        if idx == 2 {
            return;
        }
        let modulus: i32 = if idx == 0 || idx == 3 { 6 } else { 10 };
        let current = self.digits[idx] as i32;
        let delta = if increase { 1 } else { -1 };
        let next = current + delta;
        self.digits[idx] = (if next < 0 { modulus - 1 } else { next % modulus }) as u8;
    }

    pub fn total_seconds(&self) -> u16 {
        60 * (10 * self.digits[0] as u16 + self.digits[1] as u16)
            + 10 * self.digits[3] as u16
            + self.digits[4] as u16
    }
}

/// Owns the tag controller, the scan buffer, and the remaining hardware
/// collaborators (the sample source, buttons, and display), and drives the
/// four screens. Grounded on `main`'s `switch (current_screen)` dispatch
/// loop. The decoder's `SampleSource` and the scan buffer stand in for the
/// original's second board and inter-board UART: here one decode attempt
/// per loop iteration plays the role the UART RX interrupt played there,
/// since this appliance collapses both boards onto a single ESP32 the way
/// the teacher collapses the Wi-Fi module's AT-command UART into a native
/// `EspWifi` socket.
pub struct Navigator<S: SampleSource, U: Uplink, B: Buttons, L: Lcd, Z: Buzzer, const N: usize> {
    controller: TagController<U, N>,
    scan_buffer: ScanBuffer,
    sample_source: S,
    buttons: B,
    lcd: L,
    buzzer: Z,
    ticker: Ticker,
    last_tick: Instant,
}

impl<S: SampleSource, U: Uplink, B: Buttons, L: Lcd, Z: Buzzer, const N: usize>
    Navigator<S, U, B, L, Z, N>
{
    pub fn new(controller: TagController<U, N>, sample_source: S, buttons: B, lcd: L, buzzer: Z) -> Self {
        Self {
            controller,
            scan_buffer: ScanBuffer::new(),
            sample_source,
            buttons,
            lcd,
            buzzer,
            ticker: Ticker::new(),
            last_tick: Instant::now(),
        }
    }

    /// One decode attempt, framed and fed into the scan buffer on success.
    /// Mirrors one byte-at-a-time delivery of `ISR(USART0_RX_vect)`, but
    /// all at once since there's no real inter-chip UART to drip-feed it.
    fn poll_decoder(&mut self) {
        if let Ok(hex) = decoder::decode_frame(&mut self.sample_source) {
            for &b in &decoder::encode_tag_frame(&hex) {
                self.scan_buffer.push_byte(b);
            }
        }
    }

    /// Stands in for `ISR(TIMER1_COMPA_vect)`: there's no hardware timer
    /// interrupt here, so the screen loop checks elapsed wall-clock time
    /// and applies whole seconds as they pass instead.
    fn maybe_tick(&mut self) {
        let elapsed = self.last_tick.elapsed().as_secs();
        if elapsed == 0 {
            return;
        }
        for _ in 0..elapsed {
            self.ticker.tick(self.controller.registry_mut());
        }
        self.last_tick = Instant::now();
    }

    pub fn controller_mut(&mut self) -> &mut TagController<U, N> {
        &mut self.controller
    }

    pub fn scan_buffer_mut(&mut self) -> &mut ScanBuffer {
        &mut self.scan_buffer
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Called once at boot, before entering the screen loop.
    pub fn on_startup(&mut self) {
        self.controller.on_startup();
        self.ticker.enable();
    }

    /// Drains the scan buffer (if a frame is ready) and runs it through the
    /// controller, rendering the outcome. Mirrors `probe_card_reader`.
    fn process_scan(&mut self) {
        if !self.scan_buffer.is_ready() {
            return;
        }
        self.lcd.clear();
        let hex: TagHex = self
            .scan_buffer
            .hex_digits()
            .try_into()
            .expect("scan buffer payload is always 10 hex bytes");
        self.scan_buffer.release();

        let outcome = self.controller.on_scan(&hex);
        self.render_scan_outcome(outcome, &hex);
    }

    fn render_scan_outcome(&mut self, outcome: Outcome, hex: &TagHex) {
        match outcome {
            Outcome::NotRegistered => {
                self.lcd.write_string("This card is");
                self.lcd.set_cursor(1, 0);
                self.lcd.write_string("not registered.");
            }
            Outcome::CheckedOut { index } => {
                self.write_card_header(index);
                self.lcd.write_string(" check out");
                self.write_id_line(hex);
            }
            Outcome::CheckedIn { index } => {
                self.buzzer.disable();
                self.write_card_header(index);
                self.lcd.write_string(" check in");
                self.write_id_line(hex);
            }
            Outcome::Alarmed { .. } | Outcome::Replaced { .. } => {}
        }
        self.lcd.clear();
    }

    fn write_card_header(&mut self, index: usize) {
        self.lcd.write_string("Card ");
        self.lcd.write_char(b'1' + index as u8);
    }

    fn write_id_line(&mut self, hex: &TagHex) {
        self.lcd.set_cursor(1, 0);
        self.lcd.write_string("ID: ");
        for &b in hex {
            self.lcd.write_char(b);
        }
    }

    /// Checks for newly-expired tags and renders/engages the alarm.
    /// Mirrors `check_alarm`, polled every loop iteration rather than from
    /// the 1 Hz ISR.
    fn process_alarms(&mut self) {
        for outcome in self.controller.on_tick() {
            if let Outcome::Alarmed { index } = outcome {
                self.buzzer.enable();
                self.lcd.clear();
                self.write_card_header(index);
                self.lcd.write_string(" ran out");
                self.lcd.set_cursor(1, 0);
                self.lcd.write_string("of time!!!");
                self.lcd.clear();
            }
        }
    }

    pub fn clocks(&mut self) -> Screen {
        self.lcd.clear();
        loop {
            self.poll_decoder();
            self.maybe_tick();
            self.process_alarms();
            self.process_scan();
            match self.buttons.poll() {
                Button::Left => return Screen::Tags,
                Button::Right => return Screen::ConfirmSetup,
                _ => {}
            }
            self.lcd.home();
            for i in 0..N {
                let slot = self.controller.registry().get(i).expect("slot in range");
                self.lcd.write_char(b'1' + i as u8);
                self.lcd.write_string(": ");
                let mut buf = [0u8; 5];
                format_time(slot.time_left, &mut buf);
                for &b in &buf {
                    self.lcd.write_char(b);
                }
                match slot.status {
                    TagStatus::CheckedIn => self.lcd.write_string(" IN"),
                    TagStatus::CheckedOut => self.lcd.write_string(" OUT"),
                    TagStatus::Alarmed => self.lcd.write_string(" ALARMED"),
                }
                self.lcd.set_cursor(1, 0);
            }
        }
    }

    pub fn tags(&mut self) -> Screen {
        self.lcd.clear();
        loop {
            self.poll_decoder();
            self.maybe_tick();
            self.process_alarms();
            self.process_scan();
            match self.buttons.poll() {
                Button::Left => return Screen::ConfirmSetup,
                Button::Right => return Screen::Clocks,
                _ => {}
            }
            self.lcd.home();
            for i in 0..N {
                self.lcd.write_string(if i == 0 { "1: " } else { "2: " });
                let id = self.controller.registry().get(i).expect("slot in range").id;
                for &b in &id {
                    self.lcd.write_char(b);
                }
                self.lcd.set_cursor(1, 0);
            }
        }
    }

    pub fn confirm_setup(&mut self) -> Screen {
        self.lcd.clear();
        loop {
            self.poll_decoder();
            self.maybe_tick();
            self.process_alarms();
            self.process_scan();
            match self.buttons.poll() {
                Button::Left => return Screen::Clocks,
                Button::Right => return Screen::Tags,
                Button::Ok => return Screen::Setup(SetupState::first(N)),
                _ => {}
            }
            self.lcd.home();
            self.lcd.write_string("Press OK to");
            self.lcd.set_cursor(1, 0);
            self.lcd.write_string("configure system");
        }
    }

    fn set_card_id(&mut self, index: usize) -> bool {
        self.lcd.clear();
        self.lcd.write_string("Scan card ");
        self.lcd.write_char(b'1' + index as u8);
        self.lcd.write_string(":");
        self.lcd.set_cursor(1, 0);
        let mut id = self.controller.registry().get(index).expect("slot in range").id;
        for &b in &id {
            self.lcd.write_char(b);
        }

        let mut new_scanned = false;
        loop {
            self.poll_decoder();
            self.maybe_tick();
            if self.scan_buffer.is_ready() {
                id = self
                    .scan_buffer
                    .hex_digits()
                    .try_into()
                    .expect("scan buffer payload is always 10 hex bytes");
                self.scan_buffer.release();
                self.lcd.set_cursor(1, 0);
                for &b in &id {
                    self.lcd.write_char(b);
                }
                new_scanned = true;
                continue;
            }
            match self.buttons.poll() {
                Button::Ok | Button::Right => {
                    if new_scanned {
                        self.lcd.clear();
                        self.lcd.write_string("Updating...");
                        let _ = self.controller.on_setup_overwrite(index, id);
                    }
                    return true;
                }
                Button::Left => return false,
                _ => {}
            }
        }
    }

    fn set_card_timeout(&mut self, index: usize) -> bool {
        self.lcd.clear();
        self.lcd.set_cursor_visible(true);
        self.lcd.write_string("Time for card ");
        self.lcd.write_char(b'1' + index as u8);
        self.lcd.write_char(b':');
        self.lcd.set_cursor(1, 0);

        let current_max = self.controller.registry().get(index).expect("slot in range").max_time;
        let mut editor = TimeoutEditor::new(current_max);
        let mut buf = [0u8; 5];
        format_time(current_max, &mut buf);
        for &b in &buf {
            self.lcd.write_char(b);
        }
        self.lcd.write_string(" (MM/SS)");
        self.lcd.set_cursor(1, 0);

        let completed = loop {
            match self.buttons.poll() {
                Button::Left => match editor.on_left() {
                    EditorStep::Aborted => break false,
                    _ => self.lcd.move_cursor_left(),
                },
                Button::Right => match editor.on_right() {
                    EditorStep::Finished => break true,
                    _ => self.lcd.move_cursor_right(),
                },
                Button::Ok => break true,
                Button::Up => {
                    editor.adjust(true);
                    self.lcd.write_char(b'0' + editor.digit(editor.cursor()));
                    self.lcd.move_cursor_left();
                }
                Button::Down => {
                    editor.adjust(false);
                    self.lcd.write_char(b'0' + editor.digit(editor.cursor()));
                    self.lcd.move_cursor_left();
                }
                _ => {}
            }
        };

        let total = editor.total_seconds();
        if let Some(slot) = self.controller.registry_mut().get_mut(index) {
            slot.max_time = total;
            slot.time_left = total;
        }
        self.lcd.set_cursor_visible(false);
        completed
    }

    pub fn setup(&mut self, mut state: SetupState) -> Screen {
        self.ticker.disable();
        self.buzzer.disable();
        self.lcd.clear();

        while !state.done() && !state.aborted() {
            let slot = state.slot();
            let success = if state.editing_timeout() {
                self.set_card_timeout(slot)
            } else {
                self.set_card_id(slot)
            };
            state.advance(success);
        }

        self.ticker.enable();
        Screen::Clocks
    }

    /// Runs the screen dispatch loop forever, mirroring `main`'s
    /// `switch (current_screen)`.
    pub fn run(&mut self) -> ! {
        let mut screen = Screen::Clocks;
        loop {
            screen = match screen {
                Screen::Clocks => self.clocks(),
                Screen::ConfirmSetup => self.confirm_setup(),
                Screen::Tags => self.tags(),
                Screen::Setup(state) => self.setup(state),
            };
        }
    }
}
