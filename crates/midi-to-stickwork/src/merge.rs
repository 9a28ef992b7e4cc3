//! Merging of time-ordered hits into compound events.
//!
//! Hits on the same snapped instant share one event. The hi-hat state is
//! sticky across events: a hi-hat strike closes it and the open toggle opens
//! it. When both occur at one instant the toggle wins, whatever the order
//! of the two notes in the input.

use log::debug;
use serde::Serialize;

use stickwork_core::{CompoundEvent, DrumKit, HihatState, Instrument, RawHit, VoiceRole};

use crate::config::MergerConfig;

/// Inter-arrival times below this are the same instant
const SAME_INSTANT: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub hits: usize,
    pub events: usize,
    /// Strikes dropped because both slots were taken
    pub discarded: usize,
    pub duplicates: usize,
    pub unknown: usize,
}

/// Folds time-ordered hits into compound events
pub struct HitMerger<'a> {
    kit: &'a DrumKit,
    grid: f64,
}

impl<'a> HitMerger<'a> {
    pub fn new(kit: &'a DrumKit, config: &MergerConfig) -> Self {
        Self { kit, grid: config.grid }
    }

    fn snap(&self, time: f64) -> f64 {
        if self.grid > 0.0 {
            (time / self.grid).round() * self.grid
        } else {
            time
        }
    }

    pub fn merge(&self, hits: &[RawHit]) -> (Vec<CompoundEvent>, MergeStats) {
        let mut events: Vec<CompoundEvent> = Vec::new();
        let mut stats = MergeStats::default();
        let mut clock = 0.0;
        let mut hihat = HihatState::Closed;
        let mut opened_here = false;

        for hit in hits {
            stats.hits += 1;
            let Some(role) = self.kit.role(hit.instrument) else {
                debug!("Dropping hit on unknown instrument {} at {:.3}s", hit.instrument, hit.time);
                stats.unknown += 1;
                continue;
            };

            let at = self.snap(hit.time);
            if events.is_empty() || at - clock > SAME_INSTANT {
                events.push(CompoundEvent::new((at - clock).max(0.0)));
                clock = at;
                opened_here = false;
            }
            let Some(event) = events.last_mut() else {
                continue;
            };

            match role {
                VoiceRole::Strike => {
                    if hit.instrument == self.kit.hihat && !opened_here {
                        hihat = HihatState::Closed;
                    }
                    self.place(event, hit.instrument, at, &mut stats);
                }
                VoiceRole::BassPedal => event.bass = true,
                VoiceRole::HiHatOpen => {
                    hihat = HihatState::Open;
                    opened_here = true;
                }
            }
            event.hihat = hihat;
        }

        stats.events = events.len();
        (events, stats)
    }

    fn place(&self, event: &mut CompoundEvent, code: Instrument, at: f64, stats: &mut MergeStats) {
        if event.slot_a == code || event.slot_b == code {
            stats.duplicates += 1;
        } else if event.slot_a.is_empty() {
            event.slot_a = code;
        } else if event.slot_b.is_empty() {
            event.slot_b = code;
        } else {
            debug!(
                "Discarding {} at {:.3}s: {} and {} already struck",
                self.kit.name(code),
                at,
                self.kit.name(event.slot_a),
                self.kit.name(event.slot_b)
            );
            stats.discarded += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(hits: &[RawHit]) -> (Vec<CompoundEvent>, MergeStats) {
        let kit = DrumKit::standard();
        HitMerger::new(&kit, &MergerConfig::default()).merge(hits)
    }

    #[test]
    fn test_simultaneous_hits_share_an_event() {
        let (events, stats) = merge(&[
            RawHit::new(0.0, 1, 100),
            RawHit::new(0.0, 5, 90),
            RawHit::new(0.5, 1, 100),
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].slot_a, Instrument::SNARE);
        assert_eq!(events[0].slot_b, Instrument::HIHAT);
        assert_eq!(events[0].time, 0.0);
        assert!((events[1].time - 0.5).abs() < 1e-9);
        assert_eq!(stats.events, 2);
    }

    #[test]
    fn test_third_voice_is_discarded_but_flags_survive() {
        let (events, stats) = merge(&[
            RawHit::new(1.0, 1, 100),
            RawHit::new(1.0, 5, 100),
            RawHit::new(1.0, 7, 100),
            RawHit::new(1.0, 10, 100),
        ]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].slot_count(), 2);
        assert!(events[0].bass);
        assert_eq!(stats.discarded, 1);
        assert!((events[0].time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_code_does_not_fill_slot_b() {
        let (events, stats) = merge(&[RawHit::new(0.2, 1, 100), RawHit::new(0.2, 1, 60)]);
        assert_eq!(events[0].slot_a, Instrument::SNARE);
        assert!(events[0].slot_b.is_empty());
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn test_grid_snaps_near_simultaneous_hits() {
        let (events, _) = merge(&[
            RawHit::new(0.51, 1, 100),
            RawHit::new(0.52, 5, 100),
            RawHit::new(1.04, 1, 100),
        ]);
        assert_eq!(events.len(), 2);
        assert!((events[0].time - 0.5).abs() < 1e-9);
        assert!((events[1].time - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_zero_grid_only_merges_exact_times() {
        let kit = DrumKit::standard();
        let merger = HitMerger::new(&kit, &MergerConfig { grid: 0.0 });
        let (events, _) = merger.merge(&[RawHit::new(0.51, 1, 100), RawHit::new(0.52, 5, 100)]);
        assert_eq!(events.len(), 2);
        assert!((events[1].time - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_rounding_does_not_accumulate() {
        let hits: Vec<RawHit> = (0..100).map(|i| RawHit::new(i as f64 * 0.2499, 1, 100)).collect();
        let (events, _) = merge(&hits);
        let total: f64 = events.iter().map(|e| e.time).sum();
        let expected = (99.0 * 0.2499 / 0.05_f64).round() * 0.05;
        assert!((total - expected).abs() < 1e-6);
    }

    #[test]
    fn test_hihat_state_is_sticky() {
        let (events, _) = merge(&[
            RawHit::new(0.0, 5, 100),
            RawHit::new(0.5, 11, 100),
            RawHit::new(0.5, 1, 100),
            RawHit::new(1.0, 1, 100),
            RawHit::new(1.5, 5, 100),
        ]);
        let states: Vec<HihatState> = events.iter().map(|e| e.hihat).collect();
        assert_eq!(
            states,
            vec![HihatState::Closed, HihatState::Open, HihatState::Open, HihatState::Closed]
        );
        // the open toggle is a flag, not a voice
        assert_eq!(events[1].slot_count(), 1);
    }

    #[test]
    fn test_open_toggle_wins_within_an_instant() {
        let open_first = merge(&[RawHit::new(0.5, 11, 100), RawHit::new(0.5, 5, 100)]).0;
        let strike_first = merge(&[RawHit::new(0.5, 5, 100), RawHit::new(0.5, 11, 100)]).0;
        assert_eq!(open_first, strike_first);
        assert_eq!(open_first[0].hihat, HihatState::Open);
        assert_eq!(open_first[0].slot_a, Instrument::HIHAT);

        // the next instant's strike closes it again
        let (events, _) = merge(&[
            RawHit::new(0.5, 11, 100),
            RawHit::new(0.5, 5, 100),
            RawHit::new(1.0, 5, 100),
        ]);
        assert_eq!(events[1].hihat, HihatState::Closed);
    }

    #[test]
    fn test_pedal_only_event() {
        let (events, _) = merge(&[RawHit::new(0.0, 1, 100), RawHit::new(0.6, 10, 100)]);
        assert_eq!(events.len(), 2);
        assert!(events[1].bass);
        assert_eq!(events[1].slot_count(), 0);
    }

    #[test]
    fn test_unknown_codes_are_dropped() {
        let (events, stats) = merge(&[RawHit::new(0.0, 9, 100), RawHit::new(0.3, 1, 100)]);
        assert_eq!(events.len(), 1);
        assert_eq!(stats.unknown, 1);
        assert!((events[0].time - 0.3).abs() < 1e-9);
    }
}
