//! Drift correction for long runs of short gaps.
//!
//! Gaps are summed as the stream goes by. Once the sum reaches the
//! threshold (two beats by default) a small offset is moved from the
//! current event's delta to the next one and the sum restarts.

use log::{debug, info};

use stickwork_core::{CompoundEvent, Tempo};

use crate::config::GrooveConfig;

const THRESHOLD_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct GrooveCorrector {
    threshold: f64,
    offset: f64,
    accumulator: f64,
}

impl GrooveCorrector {
    pub fn new(config: &GrooveConfig, tempo: Tempo) -> Self {
        Self {
            threshold: tempo.beats(config.beats),
            offset: config.offset,
            accumulator: 0.0,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Correct `events` in place, continuing from earlier slices. Returns the number of nudges.
    pub fn correct(&mut self, events: &mut [CompoundEvent]) -> usize {
        let mut nudges = 0;
        for i in 0..events.len() {
            self.accumulator += events[i].time;
            if self.accumulator + THRESHOLD_SLACK < self.threshold {
                continue;
            }

            let has_next = i + 1 < events.len();
            if has_next && events[i].time >= self.offset {
                events[i].time -= self.offset;
                events[i + 1].time += self.offset;
                nudges += 1;
            } else {
                debug!("Skipping nudge at event {}", i);
            }
            self.accumulator = 0.0;
        }
        nudges
    }
}

/// Run a fresh corrector over the whole stream
pub fn apply(events: &mut [CompoundEvent], config: &GrooveConfig, tempo: Tempo) -> usize {
    if !config.enabled {
        return 0;
    }
    let mut corrector = GrooveCorrector::new(config, tempo);
    let nudges = corrector.correct(events);
    info!(
        "Groove correction: {} nudges of {:.3}s (threshold {:.3}s)",
        nudges,
        config.offset,
        corrector.threshold()
    );
    nudges
}
