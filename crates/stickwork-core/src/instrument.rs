use serde::{Deserialize, Serialize};
use std::fmt;

/// A small-integer instrument code. `0` means "no instrument".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(pub u8);

impl Instrument {
    pub const EMPTY: Instrument = Instrument(0);
    pub const SNARE: Instrument = Instrument(1);
    pub const FLOOR_TOM: Instrument = Instrument(2);
    pub const MID_TOM: Instrument = Instrument(3);
    pub const HIGH_TOM: Instrument = Instrument(4);
    pub const HIHAT: Instrument = Instrument(5);
    pub const RIDE: Instrument = Instrument(6);
    pub const CRASH_RIGHT: Instrument = Instrument(7);
    pub const CRASH_LEFT: Instrument = Instrument(8);
    pub const BASS: Instrument = Instrument(10);
    pub const HIHAT_OPEN: Instrument = Instrument(11);

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `None` for the empty code, `Some(self)` otherwise
    pub fn non_empty(self) -> Option<Instrument> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<u8> for Instrument {
    fn from(code: u8) -> Self {
        Instrument(code)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Velocity class used by the dynamics summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceClass {
    Drum,
    Cymbal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_instrument() {
        assert!(Instrument::EMPTY.is_empty());
        assert_eq!(Instrument::EMPTY.non_empty(), None);
        assert_eq!(Instrument::SNARE.non_empty(), Some(Instrument::SNARE));
    }

    #[test]
    fn test_serializes_as_plain_code() {
        let json = serde_json::to_string(&Instrument::CRASH_RIGHT).unwrap();
        assert_eq!(json, "7");
        let back: Instrument = serde_json::from_str("11").unwrap();
        assert_eq!(back, Instrument::HIHAT_OPEN);
    }
}
