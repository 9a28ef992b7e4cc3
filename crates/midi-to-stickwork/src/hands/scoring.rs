use serde::Serialize;

use stickwork_core::{DrumKit, Instrument};

use super::{rules::section_hand, Hand, HandState};
use crate::config::HandsConfig;

/// Scores of both hands for one instrument; the lower score plays
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub right: f64,
    pub left: f64,
    pub tied: bool,
}

/// `(min(since, cap) * factor / cap) * (1 - min(distance / max_distance, 1))`
///
/// `last` is the hand's previous instrument; a hand that has not played yet
/// is measured from the kit's rest instrument.
pub fn score(config: &HandsConfig, kit: &DrumKit, instrument: Instrument, last: Option<Instrument>, since: f64) -> f64 {
    let last = last.unwrap_or(kit.rest);
    let distance = kit.distance(instrument, last).unwrap_or(config.max_distance);
    let timing = since.max(0.0).min(config.timing_cap) * config.timing_factor / config.timing_cap;
    let closeness = 1.0 - (distance / config.max_distance).min(1.0);
    timing * closeness
}

/// Pick a hand for a lone instrument by score, falling back to its section on a tie
pub fn choose(config: &HandsConfig, kit: &DrumKit, state: &HandState, instrument: Instrument) -> (Hand, Scores) {
    let right = score(config, kit, instrument, state.prev_right, state.since_right);
    let left = score(config, kit, instrument, state.prev_left, state.since_left);
    let tied = (right - left).abs() <= config.tie_epsilon;

    let hand = if tied {
        section_hand(kit, instrument)
    } else if right < left {
        Hand::Right
    } else {
        Hand::Left
    };
    (hand, Scores { right, left, tied })
}
