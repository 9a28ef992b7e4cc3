use serde::{Deserialize, Serialize};

use crate::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HihatState {
    Open,
    #[default]
    Closed,
}

impl HihatState {
    /// Column value the controller expects: 1 closed, 0 open
    pub fn flag(self) -> u8 {
        match self {
            HihatState::Closed => 1,
            HihatState::Open => 0,
        }
    }
}

/// Strikes that land on the same instant, plus the hands chosen to play them.
///
/// `time` is the delta from the previous event, not an absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompoundEvent {
    pub time: f64,
    pub slot_a: Instrument,
    pub slot_b: Instrument,
    pub bass: bool,
    pub hihat: HihatState,
    pub right: Instrument,
    pub left: Instrument,
}

impl CompoundEvent {
    pub fn new(time: f64) -> Self {
        CompoundEvent {
            time,
            slot_a: Instrument::EMPTY,
            slot_b: Instrument::EMPTY,
            bass: false,
            hihat: HihatState::Closed,
            right: Instrument::EMPTY,
            left: Instrument::EMPTY,
        }
    }

    /// Number of occupied instrument slots (0, 1 or 2)
    pub fn slot_count(&self) -> usize {
        [self.slot_a, self.slot_b].iter().filter(|s| !s.is_empty()).count()
    }

    /// The occupied slots in order
    pub fn slots(&self) -> impl Iterator<Item = Instrument> {
        [self.slot_a, self.slot_b].into_iter().filter(|s| !s.is_empty())
    }

    /// Hands carrying an instrument
    pub fn hand_count(&self) -> usize {
        [self.right, self.left].iter().filter(|s| !s.is_empty()).count()
    }

    pub fn has_content(&self) -> bool {
        self.slot_count() > 0 || self.bass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hihat_flags() {
        assert_eq!(HihatState::Closed.flag(), 1);
        assert_eq!(HihatState::Open.flag(), 0);
        assert_eq!(HihatState::default(), HihatState::Closed);
    }

    #[test]
    fn test_slot_counting() {
        let mut event = CompoundEvent::new(0.25);
        assert_eq!(event.slot_count(), 0);
        assert!(!event.has_content());

        event.slot_a = Instrument::SNARE;
        event.slot_b = Instrument::HIHAT;
        assert_eq!(event.slot_count(), 2);
        assert_eq!(event.slots().collect::<Vec<_>>(), vec![Instrument::SNARE, Instrument::HIHAT]);

        let pedal_only = CompoundEvent { bass: true, ..CompoundEvent::new(0.0) };
        assert!(pedal_only.has_content());
        assert_eq!(pedal_only.hand_count(), 0);
    }
}
