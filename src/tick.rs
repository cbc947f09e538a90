//! 1Hz countdown tick, grounded on `T1SEC_init`/`enable_T1SEC`/`disable_T1SEC`
//! and the `ISR(TIMER1_COMPA_vect)` handler.
//!
//! The original timer only decrements slots that are checked out; slots that
//! are checked in or already alarmed are left alone. `Ticker` captures that
//! rule as a plain function so it can run on a host without a hardware
//! timer, and the hardware side just needs to call [`Ticker::tick`] once a
//! second from its compare-match interrupt.

use crate::registry::{TagRecord, TagRegistry, TagStatus};

/// Drives the once-a-second countdown across a registry.
pub struct Ticker {
    enabled: bool,
}

impl Ticker {
    pub const fn new() -> Self {
        Self { enabled: false }
    }

    /// Mirrors `enable_T1SEC`: start decrementing on future ticks.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Mirrors `disable_T1SEC`: stop decrementing, e.g. while the setup menu
    /// is open.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Advance every checked-out slot's countdown by one second. No-op if
    /// disabled. Mirrors the body of `ISR(TIMER1_COMPA_vect)`.
    pub fn tick<const N: usize>(&self, registry: &mut TagRegistry<N>) {
        if !self.enabled {
            return;
        }
        for slot in registry.iter_mut() {
            tick_one(slot);
        }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

fn tick_one(slot: &mut TagRecord) {
    if slot.time_left > 0 && slot.status == TagStatus::CheckedOut {
        slot.time_left -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_table;

    #[test]
    fn disabled_ticker_leaves_time_left_untouched() {
        let ticker = Ticker::new();
        let mut table = default_table();
        table.get_mut(0).unwrap().status = TagStatus::CheckedOut;
        let before = table.get(0).unwrap().time_left;
        ticker.tick(&mut table);
        assert_eq!(table.get(0).unwrap().time_left, before);
    }

    #[test]
    fn enabled_ticker_decrements_only_checked_out_slots() {
        let mut ticker = Ticker::new();
        ticker.enable();
        let mut table = default_table();
        table.get_mut(0).unwrap().status = TagStatus::CheckedOut;
        table.get_mut(1).unwrap().status = TagStatus::CheckedIn;
        let out_before = table.get(0).unwrap().time_left;
        let in_before = table.get(1).unwrap().time_left;

        ticker.tick(&mut table);

        assert_eq!(table.get(0).unwrap().time_left, out_before - 1);
        assert_eq!(table.get(1).unwrap().time_left, in_before);
    }

    #[test]
    fn countdown_never_underflows_past_zero() {
        let mut ticker = Ticker::new();
        ticker.enable();
        let mut table = default_table();
        let slot = table.get_mut(0).unwrap();
        slot.status = TagStatus::CheckedOut;
        slot.time_left = 0;

        ticker.tick(&mut table);

        assert_eq!(table.get(0).unwrap().time_left, 0);
    }

    #[test]
    fn alarmed_slots_are_not_decremented() {
        let mut ticker = Ticker::new();
        ticker.enable();
        let mut table = default_table();
        let slot = table.get_mut(0).unwrap();
        slot.status = TagStatus::Alarmed;
        slot.time_left = 3;

        ticker.tick(&mut table);

        assert_eq!(table.get(0).unwrap().time_left, 3);
    }
}
