//! Per-tag state machine and its host-testable surface.
//!
//! Grounded on `probe_card_reader` (scan-triggered transitions) and
//! `check_alarm` (overdue-triggered transitions) in
//! `examples/original_source/GccApplication1_644.c`. The controller never
//! touches the LCD directly — it returns an [`Outcome`] describing what
//! happened, and the screen navigator renders it. This keeps the state
//! machine testable without a display collaborator.

use crate::decoder::TagHex;
use crate::registry::{RegistryError, TagRegistry, TagStatus};
use crate::uplink::{emit, Uplink};

/// What a scan, tick, or setup overwrite produced, for the navigator to
/// render and for tests to assert against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A scanned id matched no registered slot.
    NotRegistered,
    /// Slot `index` transitioned to `CheckedOut`.
    CheckedOut { index: usize },
    /// Slot `index` transitioned to `CheckedIn` (from `CheckedOut` or
    /// `Alarmed`).
    CheckedIn { index: usize },
    /// Slot `index` ran out of time and is now `Alarmed`.
    Alarmed { index: usize },
    /// Slot `index` had its id replaced via the setup wizard.
    Replaced { index: usize },
}

/// The one-shot event emitted at boot, independent of any tag.
pub const BOOTSTRAP_ID: &[u8; 10] = b"----------";
const ACTION_CHECKED_OUT: u8 = b'o';
const ACTION_CHECKED_IN: u8 = b'i';
const ACTION_ALARMED: u8 = b'a';
const ACTION_REPLACED: u8 = b'r';
const ACTION_BOOTSTRAP: u8 = b'b';

/// Owns the tag table and the uplink, and applies the trigger table from
/// the tag tracker state machine.
pub struct TagController<U: Uplink, const N: usize> {
    registry: TagRegistry<N>,
    uplink: U,
}

impl<U: Uplink, const N: usize> TagController<U, N> {
    pub fn new(registry: TagRegistry<N>, uplink: U) -> Self {
        Self { registry, uplink }
    }

    pub fn registry(&self) -> &TagRegistry<N> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TagRegistry<N> {
        &mut self.registry
    }

    /// Emit the boot-time bootstrap event. Call once at startup.
    pub fn on_startup(&mut self) {
        emit(&mut self.uplink, BOOTSTRAP_ID, ACTION_BOOTSTRAP);
    }

    /// Apply a scan against the registry, following the trigger table's
    /// `scan(matching id)` / `scan(unknown id)` rows.
    pub fn on_scan(&mut self, id: &[u8]) -> Outcome {
        let Some(index) = self.registry.find_by_id(id) else {
            return Outcome::NotRegistered;
        };

        let slot = self.registry.get_mut(index).expect("index from find_by_id is valid");
        let outcome = match slot.status {
            TagStatus::CheckedIn => {
                slot.status = TagStatus::CheckedOut;
                Outcome::CheckedOut { index }
            }
            TagStatus::CheckedOut | TagStatus::Alarmed => {
                slot.status = TagStatus::CheckedIn;
                slot.time_left = slot.max_time;
                slot.armed = true;
                Outcome::CheckedIn { index }
            }
        };

        let action = match outcome {
            Outcome::CheckedOut { .. } => ACTION_CHECKED_OUT,
            Outcome::CheckedIn { .. } => ACTION_CHECKED_IN,
            _ => unreachable!("on_scan only produces CheckedOut/CheckedIn transitions"),
        };
        let id = self.registry.get(index).expect("index is valid").id;
        emit(&mut self.uplink, &id, action);
        outcome
    }

    /// Advance one second and fire any alarms that newly expired.
    ///
    /// Decrementing `time_left` itself is the [`crate::tick::Ticker`]'s job;
    /// this only checks for and reacts to expiry, matching the original
    /// split between `ISR(TIMER1_COMPA_vect)` and `check_alarm`. Ties are
    /// broken in slot index order.
    pub fn on_tick(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        for index in 0..N {
            let slot = self.registry.get_mut(index).expect("index in range");
            if slot.time_left == 0 && slot.armed && slot.status == TagStatus::CheckedOut {
                slot.status = TagStatus::Alarmed;
                slot.armed = false;
                let id = slot.id;
                emit(&mut self.uplink, &id, ACTION_ALARMED);
                outcomes.push(Outcome::Alarmed { index });
            }
        }
        outcomes
    }

    /// Apply the setup wizard's id overwrite for a slot, resetting it to a
    /// fresh `CheckedIn` state regardless of its prior status.
    pub fn on_setup_overwrite(&mut self, index: usize, id: TagHex) -> Result<Outcome, RegistryError> {
        self.registry.set_id(index, id)?;
        let slot = self.registry.get_mut(index).expect("index is valid");
        slot.status = TagStatus::CheckedIn;
        slot.time_left = slot.max_time;
        slot.armed = true;
        emit(&mut self.uplink, &id, ACTION_REPLACED);
        Ok(Outcome::Replaced { index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_table;
    use crate::uplink::test_support::NullUplink;

    fn controller() -> TagController<NullUplink, 2> {
        TagController::new(default_table(), NullUplink::new())
    }

    #[test]
    fn clean_scan_checks_out_a_known_tag() {
        let mut c = controller();
        let outcome = c.on_scan(b"310037D93D");
        assert_eq!(outcome, Outcome::CheckedOut { index: 0 });
        assert_eq!(c.registry().get(0).unwrap().status, TagStatus::CheckedOut);
        assert_eq!(c.registry().get(0).unwrap().time_left, 5);
        assert_eq!(&c.uplink.lines[0][9..19], b"310037D93D");
        assert_eq!(c.uplink.lines[0][20], b'o');
    }

    #[test]
    fn unknown_tag_produces_no_event() {
        let mut c = controller();
        let outcome = c.on_scan(b"0000000000");
        assert_eq!(outcome, Outcome::NotRegistered);
        assert!(c.uplink.lines.is_empty());
    }

    #[test]
    fn alarm_fires_at_expiry_then_resets_on_scan() {
        let mut c = controller();
        c.registry_mut().get_mut(0).unwrap().status = TagStatus::CheckedOut;
        c.registry_mut().get_mut(0).unwrap().time_left = 0;
        c.registry_mut().get_mut(0).unwrap().armed = true;

        let outcomes = c.on_tick();
        assert_eq!(outcomes, vec![Outcome::Alarmed { index: 0 }]);
        assert_eq!(c.registry().get(0).unwrap().status, TagStatus::Alarmed);
        assert!(!c.registry().get(0).unwrap().armed);

        let outcome = c.on_scan(b"310037D93D");
        assert_eq!(outcome, Outcome::CheckedIn { index: 0 });
        let slot = c.registry().get(0).unwrap();
        assert_eq!(slot.status, TagStatus::CheckedIn);
        assert_eq!(slot.time_left, slot.max_time);
        assert!(slot.armed);
    }

    #[test]
    fn simultaneous_alarms_are_emitted_in_slot_order() {
        let mut c = controller();
        for i in 0..2 {
            let slot = c.registry_mut().get_mut(i).unwrap();
            slot.status = TagStatus::CheckedOut;
            slot.time_left = 0;
            slot.armed = true;
        }

        let outcomes = c.on_tick();
        assert_eq!(
            outcomes,
            vec![Outcome::Alarmed { index: 0 }, Outcome::Alarmed { index: 1 }]
        );
    }

    #[test]
    fn setup_overwrite_resets_status_and_rejects_duplicates() {
        let mut c = controller();
        let outcome = c.on_setup_overwrite(1, *b"AAAAAAAAAA").unwrap();
        assert_eq!(outcome, Outcome::Replaced { index: 1 });
        let slot = c.registry().get(1).unwrap();
        assert_eq!(slot.id, *b"AAAAAAAAAA");
        assert_eq!(slot.status, TagStatus::CheckedIn);

        let err = c.on_setup_overwrite(0, *b"AAAAAAAAAA").unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId);
    }

    #[test]
    fn startup_emits_exactly_one_bootstrap_line() {
        let mut c = controller();
        c.on_startup();
        assert_eq!(c.uplink.lines.len(), 1);
        assert_eq!(&c.uplink.lines[0][9..19], BOOTSTRAP_ID);
        assert_eq!(c.uplink.lines[0][20], b'b');
    }
}
