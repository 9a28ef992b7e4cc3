use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{HihatState, Instrument};

/// Mean intensity of the drum and cymbal classes over `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityWindow {
    pub start: f64,
    pub end: f64,
    pub drum: u8,
    pub cymbal: u8,
}

impl VelocityWindow {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }
}

impl fmt::Display for VelocityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}\t{:.3}\t{}\t{}", self.start, self.end, self.drum, self.cymbal)
    }
}

/// One sub-step of the robot command table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasureRow {
    /// 1-based measure number; -1 marks the end-of-stream sentinel
    pub measure: i32,
    pub duration: f64,
    pub right: Instrument,
    pub left: Instrument,
    pub right_power: u8,
    pub left_power: u8,
    pub bass: bool,
    pub hihat: HihatState,
}

impl MeasureRow {
    pub const SUB_STEP: f64 = 0.6;

    /// A full sub-step with nothing struck and the hi-hat pedal up
    pub fn silence(measure: i32) -> Self {
        MeasureRow {
            measure,
            duration: Self::SUB_STEP,
            right: Instrument::EMPTY,
            left: Instrument::EMPTY,
            right_power: 0,
            left_power: 0,
            bass: false,
            hihat: HihatState::Open,
        }
    }

    /// Tells the controller the stream has ended
    pub fn sentinel() -> Self {
        MeasureRow {
            measure: -1,
            duration: Self::SUB_STEP,
            right: Instrument::SNARE,
            left: Instrument::SNARE,
            right_power: 1,
            left_power: 1,
            bass: true,
            hihat: HihatState::Closed,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.measure < 0
    }
}

impl fmt::Display for MeasureRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{:.3}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.measure,
            self.duration,
            self.right,
            self.left,
            self.right_power,
            self.left_power,
            u8::from(self.bass),
            self.hihat.flag()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_rows_render() {
        assert_eq!(MeasureRow::silence(1).to_string(), "1\t0.600\t0\t0\t0\t0\t0\t0");
        assert_eq!(MeasureRow::sentinel().to_string(), "-1\t0.600\t1\t1\t1\t1\t1\t1");
        assert!(MeasureRow::sentinel().is_sentinel());
    }

    #[test]
    fn test_window_bounds() {
        let window = VelocityWindow { start: 2.4, end: 4.8, drum: 1, cymbal: 0 };
        assert!(window.contains(2.4));
        assert!(!window.contains(4.8));
        assert_eq!(window.to_string(), "2.400\t4.800\t1\t0");
    }
}
