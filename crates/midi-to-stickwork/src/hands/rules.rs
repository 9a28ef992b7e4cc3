use serde::{Deserialize, Serialize};

use stickwork_core::{CompoundEvent, DrumKit, Instrument};

use super::{Assignment, Hand, HandState};
use crate::config::HandsConfig;

/// Override rules tried in order before distance scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Crashes go to the right hand, moved to the right crash when the
    /// left side is busy on the ride or floor toms
    Crash,
    /// Snare with hi-hat: hi-hat right, snare left
    SnareHiHatPair,
    /// Two voices: the one further left goes to the left hand
    SectionOrder,
    /// A fast repeat stays on the hand that just played it
    FastRepeat,
}

impl Rule {
    pub fn standard() -> Vec<Rule> {
        vec![Rule::Crash, Rule::SnareHiHatPair, Rule::SectionOrder, Rule::FastRepeat]
    }

    /// The assignment this rule forces on `event`, if it applies
    pub fn apply(
        self,
        config: &HandsConfig,
        kit: &DrumKit,
        state: &HandState,
        event: &CompoundEvent,
    ) -> Option<Assignment> {
        match self {
            Rule::Crash => crash(kit, state, event),
            Rule::SnareHiHatPair => snare_hihat(kit, event),
            Rule::SectionOrder => section_order(kit, event),
            Rule::FastRepeat => fast_repeat(config, state, event),
        }
    }
}

fn crash(kit: &DrumKit, state: &HandState, event: &CompoundEvent) -> Option<Assignment> {
    let (a, b) = (event.slot_a, event.slot_b);
    if kit.is_crash(a) && kit.is_crash(b) {
        return Some(Assignment::new(a, b));
    }

    let (struck, paired) = if kit.is_crash(a) {
        (a, b)
    } else if kit.is_crash(b) {
        (b, a)
    } else {
        return None;
    };

    let left_busy = state.prev_left.is_some_and(|prev| kit.is_ride_floor(prev)) || kit.is_ride_floor(paired);
    let right = if left_busy { kit.crash_right } else { struck };
    Some(Assignment::new(right, paired))
}

fn snare_hihat(kit: &DrumKit, event: &CompoundEvent) -> Option<Assignment> {
    let pair = (event.slot_a, event.slot_b);
    if pair == (kit.snare, kit.hihat) || pair == (kit.hihat, kit.snare) {
        Some(Assignment::new(kit.hihat, kit.snare))
    } else {
        None
    }
}

fn section_order(kit: &DrumKit, event: &CompoundEvent) -> Option<Assignment> {
    if event.slot_count() != 2 {
        return None;
    }
    let a = kit.placement(event.slot_a)?;
    let b = kit.placement(event.slot_b)?;
    if a <= b {
        Some(Assignment::new(event.slot_b, event.slot_a))
    } else {
        Some(Assignment::new(event.slot_a, event.slot_b))
    }
}

fn fast_repeat(config: &HandsConfig, state: &HandState, event: &CompoundEvent) -> Option<Assignment> {
    if event.slot_count() != 1 {
        return None;
    }
    let x = event.slots().next()?;
    let window = config.repeat_window;
    let right = state.prev_right == Some(x) && state.since_right <= window;
    let left = state.prev_left == Some(x) && state.since_left <= window;

    let hand = match (right, left) {
        (true, true) if state.since_left < state.since_right => Hand::Left,
        (true, _) => Hand::Right,
        (false, true) => Hand::Left,
        (false, false) => return None,
    };
    Some(Assignment::single(hand, x))
}

/// Section fallback for a lone instrument
pub fn section_hand(kit: &DrumKit, instrument: Instrument) -> Hand {
    match kit.placement(instrument) {
        Some(p) if !p.section.is_right_side() => Hand::Left,
        _ => Hand::Right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(a: u8, b: u8) -> CompoundEvent {
        CompoundEvent {
            slot_a: Instrument(a),
            slot_b: Instrument(b),
            ..CompoundEvent::new(0.0)
        }
    }

    fn apply(rule: Rule, state: &HandState, event: &CompoundEvent) -> Option<Assignment> {
        rule.apply(&HandsConfig::default(), &DrumKit::standard(), state, event)
    }

    #[test]
    fn test_lone_crash_goes_right() {
        let state = HandState::default();
        assert_eq!(apply(Rule::Crash, &state, &event(7, 0)), Some(Assignment::new(Instrument(7), Instrument(0))));
        assert_eq!(apply(Rule::Crash, &state, &event(8, 0)), Some(Assignment::new(Instrument(8), Instrument(0))));
        assert_eq!(apply(Rule::Crash, &state, &event(1, 0)), None);
    }

    #[test]
    fn test_crash_reroutes_when_left_was_on_ride() {
        let state = HandState {
            prev_left: Some(Instrument::RIDE),
            ..HandState::default()
        };
        assert_eq!(apply(Rule::Crash, &state, &event(8, 0)), Some(Assignment::new(Instrument(7), Instrument(0))));
    }

    #[test]
    fn test_crash_reroutes_with_floor_tom_partner() {
        let state = HandState::default();
        let got = apply(Rule::Crash, &state, &event(2, 8)).unwrap();
        assert_eq!(got, Assignment::new(Instrument(7), Instrument(2)));

        let got = apply(Rule::Crash, &state, &event(1, 8)).unwrap();
        assert_eq!(got, Assignment::new(Instrument(8), Instrument(1)));
    }

    #[test]
    fn test_two_crashes() {
        let got = apply(Rule::Crash, &HandState::default(), &event(8, 7)).unwrap();
        assert_eq!(got, Assignment::new(Instrument(8), Instrument(7)));
    }

    #[test]
    fn test_snare_hihat_pair_in_either_order() {
        let expected = Some(Assignment::new(Instrument::HIHAT, Instrument::SNARE));
        assert_eq!(apply(Rule::SnareHiHatPair, &HandState::default(), &event(1, 5)), expected);
        assert_eq!(apply(Rule::SnareHiHatPair, &HandState::default(), &event(5, 1)), expected);
        assert_eq!(apply(Rule::SnareHiHatPair, &HandState::default(), &event(5, 4)), None);
    }

    #[test]
    fn test_section_order() {
        let state = HandState::default();
        // floor tom sits right of the snare
        assert_eq!(apply(Rule::SectionOrder, &state, &event(2, 1)), Some(Assignment::new(Instrument(2), Instrument(1))));
        assert_eq!(apply(Rule::SectionOrder, &state, &event(1, 2)), Some(Assignment::new(Instrument(2), Instrument(1))));
        // hi-hat is always leftmost
        assert_eq!(apply(Rule::SectionOrder, &state, &event(6, 5)), Some(Assignment::new(Instrument(6), Instrument(5))));
        assert_eq!(apply(Rule::SectionOrder, &state, &event(1, 0)), None);
    }

    #[test]
    fn test_fast_repeat() {
        let state = HandState {
            prev_right: Some(Instrument::SNARE),
            since_right: 0.05,
            prev_left: Some(Instrument::HIHAT),
            since_left: 0.05,
        };
        assert_eq!(apply(Rule::FastRepeat, &state, &event(1, 0)), Some(Assignment::single(Hand::Right, Instrument(1))));
        assert_eq!(apply(Rule::FastRepeat, &state, &event(5, 0)), Some(Assignment::single(Hand::Left, Instrument(5))));
        assert_eq!(apply(Rule::FastRepeat, &state, &event(4, 0)), None);

        let slow = HandState { since_right: 0.3, ..state };
        assert_eq!(apply(Rule::FastRepeat, &slow, &event(1, 0)), None);
    }

    #[test]
    fn test_fast_repeat_on_both_hands() {
        let state = HandState {
            prev_right: Some(Instrument::SNARE),
            since_right: 0.08,
            prev_left: Some(Instrument::SNARE),
            since_left: 0.04,
        };
        assert_eq!(apply(Rule::FastRepeat, &state, &event(1, 0)).unwrap().left, Instrument::SNARE);

        let even = HandState { since_left: 0.08, ..state };
        assert_eq!(apply(Rule::FastRepeat, &even, &event(1, 0)).unwrap().right, Instrument::SNARE);
    }

    #[test]
    fn test_section_hand() {
        let kit = DrumKit::standard();
        assert_eq!(section_hand(&kit, Instrument::RIDE), Hand::Right);
        assert_eq!(section_hand(&kit, Instrument::CRASH_RIGHT), Hand::Right);
        assert_eq!(section_hand(&kit, Instrument::SNARE), Hand::Left);
        assert_eq!(section_hand(&kit, Instrument::HIHAT), Hand::Left);
        assert_eq!(section_hand(&kit, Instrument(42)), Hand::Right);
    }
}
