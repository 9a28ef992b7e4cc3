//! Sub-step and measure segmentation of the assigned event stream.
//!
//! Each event becomes zero or more empty filler rows of one sub-step
//! followed by a row carrying its content and the leftover duration. Rows are
//! never split: a row that would push a measure past its length starts the
//! next measure instead. The table opens with a silence row (part of measure
//! 1) and ends with a silence row in a fresh measure plus the sentinel.

use log::info;
use serde::Serialize;

use stickwork_core::{CompoundEvent, DrumKit, Instrument, MeasureRow, VelocityWindow};

use crate::config::EncoderConfig;
use crate::dynamics::level_at;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureTable {
    pub rows: Vec<MeasureRow>,
}

impl MeasureTable {
    /// Rows between the opening silence and the closing silence and sentinel
    pub fn body(&self) -> &[MeasureRow] {
        let end = self.rows.len().saturating_sub(2);
        self.rows.get(1..end).unwrap_or(&[])
    }

    /// Number of the last measure holding event rows
    pub fn last_measure(&self) -> i32 {
        self.rows
            .iter()
            .filter(|r| !r.is_sentinel())
            .map(|r| r.measure)
            .max()
            .unwrap_or(0)
    }

    /// Total duration per measure, in order, sentinel excluded
    pub fn measure_durations(&self) -> Vec<(i32, f64)> {
        let mut out: Vec<(i32, f64)> = Vec::new();
        for row in self.rows.iter().filter(|r| !r.is_sentinel()) {
            match out.last_mut() {
                Some((measure, total)) if *measure == row.measure => *total += row.duration,
                _ => out.push((row.measure, row.duration)),
            }
        }
        out
    }
}

pub struct MeasureEncoder<'a> {
    config: &'a EncoderConfig,
    kit: &'a DrumKit,
    dynamics: Option<&'a [VelocityWindow]>,
}

struct Cursor {
    measure: i32,
    filled: f64,
}

impl<'a> MeasureEncoder<'a> {
    pub fn new(config: &'a EncoderConfig, kit: &'a DrumKit) -> Self {
        Self {
            config,
            kit,
            dynamics: None,
        }
    }

    /// Take hand power from these windows instead of the default
    pub fn with_dynamics(mut self, windows: &'a [VelocityWindow]) -> Self {
        self.dynamics = Some(windows);
        self
    }

    pub fn encode(&self, events: &[CompoundEvent]) -> MeasureTable {
        let step = self.config.sub_step;
        let eps = self.config.epsilon;

        let opening = MeasureRow {
            duration: step,
            ..MeasureRow::silence(1)
        };
        let mut rows = vec![opening];
        let mut cursor = Cursor {
            measure: 1,
            filled: step,
        };
        let mut clock = 0.0;

        for event in events {
            clock += event.time;
            let mut remaining = event.time.max(0.0);
            while remaining > step + eps {
                self.push(&mut rows, &mut cursor, self.filler(step));
                remaining -= step;
            }
            let row = self.content_row(event, remaining.max(0.0), clock);
            self.push(&mut rows, &mut cursor, row);
        }

        let closing = MeasureRow {
            duration: step,
            ..MeasureRow::silence(cursor.measure + 1)
        };
        rows.push(closing);
        rows.push(MeasureRow::sentinel());

        info!(
            "Encoded {} events into {} rows over {} measures",
            events.len(),
            rows.len(),
            cursor.measure
        );
        MeasureTable { rows }
    }

    fn push(&self, rows: &mut Vec<MeasureRow>, cursor: &mut Cursor, mut row: MeasureRow) {
        if cursor.filled + row.duration > self.config.measure_length + self.config.epsilon {
            cursor.measure += 1;
            cursor.filled = row.duration;
        } else {
            cursor.filled += row.duration;
        }
        row.measure = cursor.measure;
        rows.push(row);
    }

    fn filler(&self, duration: f64) -> MeasureRow {
        MeasureRow {
            duration,
            ..MeasureRow::silence(0)
        }
    }

    fn content_row(&self, event: &CompoundEvent, duration: f64, at: f64) -> MeasureRow {
        MeasureRow {
            measure: 0,
            duration,
            right: event.right,
            left: event.left,
            right_power: self.power(event.right, at),
            left_power: self.power(event.left, at),
            bass: event.bass,
            hihat: event.hihat,
        }
    }

    fn power(&self, instrument: Instrument, at: f64) -> u8 {
        if instrument.is_empty() {
            return 0;
        }
        let level = self
            .dynamics
            .zip(self.kit.class(instrument))
            .and_then(|(windows, class)| level_at(windows, at, class));
        match level {
            Some(level) => self.config.power_for_level(level),
            None => self.config.default_power,
        }
    }
}
