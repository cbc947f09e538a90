//! Piezo alarm buzzer collaborator.
//!
//! Grounded on `buzzer_init`/`enable_buzzer`/`disable_buzzer` in
//! `examples/original_source/GccApplication1_644.c` (a ~1kHz square wave
//! toggled through a Timer0 compare match) and reusing the ESP32 LEDC
//! timer/channel setup from `sentinel/src/buzzer.rs`, repurposed from a
//! fixed startup melody into a continuous enable/disable alarm tone.

/// Minimal contract the tag controller's alarm needs from the buzzer.
pub trait Buzzer {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// Matches the original firmware's Timer0 compare-match toggle rate
/// (`F_CPU / (prescaler * 2 * (OCR0A + 1))` with `F_CPU=8MHz`,
/// `prescaler=256`, `OCR0A=15`).
pub const ALARM_TONE_HZ: u32 = 977;

#[cfg(feature = "hw")]
pub mod hw {
    use super::*;
    use esp_idf_svc::hal::gpio::OutputPin;
    use esp_idf_svc::hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
    use esp_idf_svc::hal::peripheral::Peripheral;
    use esp_idf_svc::hal::prelude::*;

    pub struct LedcBuzzer<'a> {
        driver: LedcDriver<'a>,
        max_duty: u32,
    }

    impl<'a> LedcBuzzer<'a> {
        pub fn new(
            timer: impl Peripheral<P = esp_idf_svc::hal::ledc::TIMER0> + 'a,
            channel: impl Peripheral<P = esp_idf_svc::hal::ledc::CHANNEL0> + 'a,
            pin: impl Peripheral<P = impl OutputPin> + 'a,
        ) -> anyhow::Result<Self> {
            let timer_driver = LedcTimerDriver::new(
                timer,
                &TimerConfig::default().frequency(ALARM_TONE_HZ.Hz().into()),
            )?;
            let mut driver = LedcDriver::new(channel, &timer_driver, pin)?;
            let max_duty = driver.get_max_duty();
            driver.set_duty(0)?;
            Ok(Self { driver, max_duty })
        }
    }

    impl Buzzer for LedcBuzzer<'_> {
        fn enable(&mut self) {
            let _ = self.driver.set_duty(self.max_duty / 2);
        }

        fn disable(&mut self) {
            let _ = self.driver.set_duty(0);
        }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;

    #[derive(Default)]
    pub struct FakeBuzzer {
        pub engaged: bool,
    }

    impl Buzzer for FakeBuzzer {
        fn enable(&mut self) {
            self.engaged = true;
        }

        fn disable(&mut self) {
            self.engaged = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeBuzzer;
    use super::*;

    #[test]
    fn enable_then_disable_round_trips() {
        let mut buzzer = FakeBuzzer::default();
        assert!(!buzzer.engaged);
        buzzer.enable();
        assert!(buzzer.engaged);
        buzzer.disable();
        assert!(!buzzer.engaged);
    }
}
