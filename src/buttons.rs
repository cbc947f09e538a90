//! Keypad front-end collaborator.
//!
//! Grounded on `probe_buttons()` in
//! `examples/original_source/GccApplication1_644.c`: a one-hot read across
//! five input pins, with a 200ms debounce delay after any press.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    None,
    Left,
    Right,
    Up,
    Down,
    Ok,
    /// More than one pin was asserted at once.
    Invalid,
}

pub trait Buttons {
    fn poll(&mut self) -> Button;
}

/// Decides which button is pressed from the five one-hot input levels,
/// mirroring `probe_buttons`'s `PINB & 0x1F` dispatch.
fn decode(right: bool, left: bool, up: bool, down: bool, ok: bool) -> Button {
    let pressed = [right, left, up, down, ok];
    match pressed.iter().filter(|&&p| p).count() {
        0 => Button::None,
        1 => {
            if right {
                Button::Right
            } else if left {
                Button::Left
            } else if up {
                Button::Up
            } else if down {
                Button::Down
            } else {
                Button::Ok
            }
        }
        _ => Button::Invalid,
    }
}

#[cfg(feature = "hw")]
pub mod hw {
    use super::*;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::{AnyInputPin, Input, PinDriver};

    const DEBOUNCE_MS: u32 = 200;

    pub struct GpioButtons<'a> {
        right: PinDriver<'a, AnyInputPin, Input>,
        left: PinDriver<'a, AnyInputPin, Input>,
        up: PinDriver<'a, AnyInputPin, Input>,
        down: PinDriver<'a, AnyInputPin, Input>,
        ok: PinDriver<'a, AnyInputPin, Input>,
    }

    impl<'a> GpioButtons<'a> {
        pub fn new(
            right: AnyInputPin,
            left: AnyInputPin,
            up: AnyInputPin,
            down: AnyInputPin,
            ok: AnyInputPin,
        ) -> anyhow::Result<Self> {
            Ok(Self {
                right: PinDriver::input(right)?,
                left: PinDriver::input(left)?,
                up: PinDriver::input(up)?,
                down: PinDriver::input(down)?,
                ok: PinDriver::input(ok)?,
            })
        }
    }

    impl Buttons for GpioButtons<'_> {
        fn poll(&mut self) -> Button {
            let pressed = decode(
                self.right.is_high(),
                self.left.is_high(),
                self.up.is_high(),
                self.down.is_high(),
                self.ok.is_high(),
            );
            if pressed != Button::None {
                FreeRtos::delay_ms(DEBOUNCE_MS);
            }
            pressed
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    /// Replays a fixed sequence of button reads, for navigator tests.
    pub struct ScriptedButtons {
        pub script: std::vec::Vec<Button>,
        pub pos: usize,
    }

    impl ScriptedButtons {
        pub fn new(script: std::vec::Vec<Button>) -> Self {
            Self { script, pos: 0 }
        }
    }

    impl Buttons for ScriptedButtons {
        fn poll(&mut self) -> Button {
            let b = *self.script.get(self.pos).unwrap_or(&Button::None);
            if self.pos < self.script.len() {
                self.pos += 1;
            }
            b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pins_high_is_none() {
        assert_eq!(decode(false, false, false, false, false), Button::None);
    }

    #[test]
    fn each_single_pin_maps_to_its_button() {
        assert_eq!(decode(true, false, false, false, false), Button::Right);
        assert_eq!(decode(false, true, false, false, false), Button::Left);
        assert_eq!(decode(false, false, true, false, false), Button::Up);
        assert_eq!(decode(false, false, false, true, false), Button::Down);
        assert_eq!(decode(false, false, false, false, true), Button::Ok);
    }

    #[test]
    fn multiple_pins_high_is_invalid() {
        assert_eq!(decode(true, true, false, false, false), Button::Invalid);
    }
}
