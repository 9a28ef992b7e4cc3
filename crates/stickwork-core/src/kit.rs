use serde::{Deserialize, Serialize};

use crate::{Instrument, VoiceClass};

/// A point in kit space, in metres from the robot's origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }

    /// Euclidean distance between two positions
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Left-to-right zones of the kit as seen from the drummer's seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    HiHat,
    Center,
    RightCenter,
    FarRight,
}

impl Section {
    /// Sections a lone stroke falls to the right hand in
    pub fn is_right_side(self) -> bool {
        matches!(self, Section::RightCenter | Section::FarRight)
    }
}

/// Section plus left-to-right order inside the section. Lower sorts further left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub section: Section,
    pub order: u8,
}

/// What a code does when it appears in the hit stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceRole {
    /// Struck by a hand
    Strike,
    /// Sets the bass pedal flag
    BassPedal,
    /// Opens the hi-hat
    HiHatOpen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub code: Instrument,
    pub name: String,
    pub role: VoiceRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<VoiceClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl Voice {
    fn strike(code: Instrument, name: &str, class: VoiceClass, position: Position, section: Section, order: u8) -> Self {
        Voice {
            code,
            name: name.to_string(),
            role: VoiceRole::Strike,
            class: Some(class),
            position: Some(position),
            placement: Some(Placement { section, order }),
        }
    }

    fn flag(code: Instrument, name: &str, role: VoiceRole, class: VoiceClass) -> Self {
        Voice {
            code,
            name: name.to_string(),
            role,
            class: Some(class),
            position: None,
            placement: None,
        }
    }
}

/// Physical description of the robot's kit.
///
/// Every stage that needs to know where an instrument sits, which velocity
/// class it belongs to or how it is played gets a `DrumKit` injected instead
/// of reading global tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumKit {
    pub voices: Vec<Voice>,
    pub snare: Instrument,
    pub hihat: Instrument,
    pub crash_right: Instrument,
    pub crash_left: Instrument,
    /// Instruments that park a hand on the right half of the kit
    pub ride_floor: Vec<Instrument>,
    /// Where an idle hand is assumed to rest before its first stroke
    pub rest: Instrument,
}

impl DrumKit {
    /// The five-piece kit the robot ships with
    pub fn standard() -> Self {
        use Section::*;
        use VoiceClass::*;

        let voices = vec![
            Voice::strike(Instrument::SNARE, "snare", Drum, Position::new(-0.13, 0.52, 0.61), Center, 2),
            Voice::strike(Instrument::FLOOR_TOM, "floor tom", Drum, Position::new(0.25, 0.50, 0.62), RightCenter, 2),
            Voice::strike(Instrument::MID_TOM, "mid tom", Drum, Position::new(0.21, 0.67, 0.87), RightCenter, 1),
            Voice::strike(Instrument::HIGH_TOM, "high tom", Drum, Position::new(-0.05, 0.69, 0.83), Center, 3),
            Voice::strike(Instrument::HIHAT, "hi-hat", Cymbal, Position::new(-0.28, 0.60, 0.88), HiHat, 1),
            Voice::strike(Instrument::RIDE, "ride", Cymbal, Position::new(0.32, 0.71, 1.06), RightCenter, 3),
            Voice::strike(Instrument::CRASH_RIGHT, "crash right", Cymbal, Position::new(0.47, 0.52, 0.88), FarRight, 1),
            Voice::strike(Instrument::CRASH_LEFT, "crash left", Cymbal, Position::new(-0.06, 0.73, 1.06), Center, 1),
            Voice::flag(Instrument::BASS, "bass pedal", VoiceRole::BassPedal, Drum),
            Voice::flag(Instrument::HIHAT_OPEN, "hi-hat open", VoiceRole::HiHatOpen, Cymbal),
        ];

        DrumKit {
            voices,
            snare: Instrument::SNARE,
            hihat: Instrument::HIHAT,
            crash_right: Instrument::CRASH_RIGHT,
            crash_left: Instrument::CRASH_LEFT,
            ride_floor: vec![Instrument::FLOOR_TOM, Instrument::MID_TOM, Instrument::RIDE],
            rest: Instrument::SNARE,
        }
    }

    pub fn voice(&self, code: Instrument) -> Option<&Voice> {
        self.voices.iter().find(|v| v.code == code)
    }

    pub fn role(&self, code: Instrument) -> Option<VoiceRole> {
        self.voice(code).map(|v| v.role)
    }

    pub fn is_strikeable(&self, code: Instrument) -> bool {
        self.role(code) == Some(VoiceRole::Strike)
    }

    pub fn class(&self, code: Instrument) -> Option<VoiceClass> {
        self.voice(code).and_then(|v| v.class)
    }

    pub fn position(&self, code: Instrument) -> Option<Position> {
        self.voice(code).and_then(|v| v.position)
    }

    pub fn placement(&self, code: Instrument) -> Option<Placement> {
        self.voice(code).and_then(|v| v.placement)
    }

    pub fn is_crash(&self, code: Instrument) -> bool {
        !code.is_empty() && (code == self.crash_right || code == self.crash_left)
    }

    pub fn is_ride_floor(&self, code: Instrument) -> bool {
        self.ride_floor.contains(&code)
    }

    /// Distance between two instruments, `None` if either has no position
    pub fn distance(&self, a: Instrument, b: Instrument) -> Option<f64> {
        Some(self.position(a)?.distance(&self.position(b)?))
    }

    /// Display name for logs
    pub fn name(&self, code: Instrument) -> &str {
        if code.is_empty() {
            return "-";
        }
        self.voice(code).map(|v| v.name.as_str()).unwrap_or("unknown")
    }
}

impl Default for DrumKit {
    fn default() -> Self {
        DrumKit::standard()
    }
}
