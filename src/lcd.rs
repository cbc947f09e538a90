//! HD44780-style character LCD collaborator.
//!
//! Grounded on `LCD_send_upper_nibble`/`LCD_init`/`LCD_command`/`LCD_char` in
//! `examples/original_source/GccApplication1_644.c`: the original drives four
//! data lines plus RS/E directly off a port register two nibbles at a time.
//! Here the same nibble sequencing runs over individual `PinDriver` GPIO
//! writes instead of a single port write.

const SET_CURSOR: u8 = 0x80;
const LINE_ONE: u8 = 0x00;
const LINE_TWO: u8 = 0x40;
const CLEAR: u8 = 0x01;
const HOME: u8 = 0x02;
const MOVE_LEFT: u8 = 0x10;
const MOVE_RIGHT: u8 = 0x14;
const CURSOR_ON: u8 = 0x0E;
const CURSOR_OFF: u8 = 0x0C;

/// Minimal contract the screen navigator needs from a character display.
pub trait Lcd {
    fn clear(&mut self);
    fn home(&mut self);
    /// `line` is 0 or 1; `col` is 0-indexed within the line.
    fn set_cursor(&mut self, line: u8, col: u8);
    fn write_char(&mut self, c: u8);
    fn write_string(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.write_char(b);
        }
    }
    fn set_cursor_visible(&mut self, visible: bool);
    fn move_cursor_left(&mut self);
    fn move_cursor_right(&mut self);
}

#[cfg(feature = "hw")]
fn line_base(line: u8) -> u8 {
    if line == 0 {
        LINE_ONE
    } else {
        LINE_TWO
    }
}

#[cfg(feature = "hw")]
pub mod hw {
    use super::*;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};

    /// Four data lines (D4..D7), register-select, and enable strobe.
    pub struct Hd44780Lcd<'a> {
        data: [PinDriver<'a, AnyOutputPin, Output>; 4],
        rs: PinDriver<'a, AnyOutputPin, Output>,
        e: PinDriver<'a, AnyOutputPin, Output>,
    }

    impl<'a> Hd44780Lcd<'a> {
        pub fn new(data: [AnyOutputPin; 4], rs: AnyOutputPin, e: AnyOutputPin) -> anyhow::Result<Self> {
            let [d0, d1, d2, d3] = data;
            let mut lcd = Self {
                data: [
                    PinDriver::output(d0)?,
                    PinDriver::output(d1)?,
                    PinDriver::output(d2)?,
                    PinDriver::output(d3)?,
                ],
                rs: PinDriver::output(rs)?,
                e: PinDriver::output(e)?,
            };
            lcd.init();
            Ok(lcd)
        }

        fn strobe(&mut self) {
            let _ = self.e.set_high();
            let _ = self.e.set_low();
            FreeRtos::delay_us(50);
        }

        /// Writes the upper nibble of `byte` onto the four data lines and
        /// strobes `E`, matching `LCD_send_upper_nibble`.
        fn send_upper_nibble(&mut self, byte: u8) {
            for (i, pin) in self.data.iter_mut().enumerate() {
                let bit = (byte >> (4 + i)) & 1;
                let _ = if bit != 0 { pin.set_high() } else { pin.set_low() };
            }
            self.strobe();
        }

        fn init(&mut self) {
            FreeRtos::delay_ms(40);
            for cmd in [0x30, 0x30, 0x30, 0x20, 0x20, 0xC0, 0x00, 0xC0] {
                self.send_upper_nibble(cmd);
                FreeRtos::delay_ms(10);
            }
        }

        fn command(&mut self, cmd: u8) {
            let _ = self.rs.set_low();
            self.send_upper_nibble(cmd);
            FreeRtos::delay_us(10);
            self.send_upper_nibble(cmd << 4);
            FreeRtos::delay_ms(5);
        }
    }

    impl Lcd for Hd44780Lcd<'_> {
        fn clear(&mut self) {
            self.command(CLEAR);
        }

        fn home(&mut self) {
            self.command(HOME);
        }

        fn set_cursor(&mut self, line: u8, col: u8) {
            self.command(SET_CURSOR | (line_base(line) + col));
        }

        fn write_char(&mut self, c: u8) {
            let _ = self.rs.set_high();
            self.send_upper_nibble(c);
            FreeRtos::delay_us(10);
            self.send_upper_nibble(c << 4);
            FreeRtos::delay_us(10);
        }

        fn set_cursor_visible(&mut self, visible: bool) {
            self.command(if visible { CURSOR_ON } else { CURSOR_OFF });
        }

        fn move_cursor_left(&mut self) {
            self.command(MOVE_LEFT);
        }

        fn move_cursor_right(&mut self) {
            self.command(MOVE_RIGHT);
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Records every operation for assertions in navigator tests, instead of
    /// driving real GPIO.
    #[derive(Default)]
    pub struct FakeLcd {
        pub ops: Vec<String>,
        pub cursor: (u8, u8),
    }

    impl Lcd for FakeLcd {
        fn clear(&mut self) {
            self.ops.push("clear".into());
        }

        fn home(&mut self) {
            self.ops.push("home".into());
        }

        fn set_cursor(&mut self, line: u8, col: u8) {
            self.cursor = (line, col);
            self.ops.push(format!("set_cursor({line},{col})"));
        }

        fn write_char(&mut self, c: u8) {
            self.ops.push(format!("char({})", c as char));
        }

        fn set_cursor_visible(&mut self, visible: bool) {
            self.ops.push(format!("cursor_visible({visible})"));
        }

        fn move_cursor_left(&mut self) {
            self.ops.push("move_left".into());
        }

        fn move_cursor_right(&mut self) {
            self.ops.push("move_right".into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeLcd;
    use super::*;

    #[test]
    fn write_string_emits_one_char_op_per_byte() {
        let mut lcd = FakeLcd::default();
        lcd.write_string("hi");
        assert_eq!(lcd.ops, vec!["char(h)", "char(i)"]);
    }

    #[test]
    fn set_cursor_records_line_and_column() {
        let mut lcd = FakeLcd::default();
        lcd.set_cursor(1, 3);
        assert_eq!(lcd.cursor, (1, 3));
    }
}
