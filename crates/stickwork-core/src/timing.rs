use serde::{Deserialize, Serialize};

pub const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// A tempo in beats (quarter notes) per minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tempo(f64);

impl Tempo {
    pub fn from_bpm(bpm: f64) -> Self {
        Tempo(bpm)
    }

    /// From the payload of a MIDI set-tempo meta event
    pub fn from_micros_per_quarter(micros: u32) -> Self {
        Tempo(MICROS_PER_MINUTE / micros.max(1) as f64)
    }

    pub fn bpm(self) -> f64 {
        self.0
    }

    pub fn beat_seconds(self) -> f64 {
        60.0 / self.0
    }

    /// Duration of `n` beats in seconds
    pub fn beats(self, n: f64) -> f64 {
        n * self.beat_seconds()
    }

    pub fn is_valid(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo(100.0)
    }
}
