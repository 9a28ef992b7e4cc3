//! Left/right hand assignment.
//!
//! [`decide`] is a pure function of the configuration, the current
//! [`HandState`] and one event. [`HandEngine`] owns the state, advances it
//! between events and reports an [`AssignmentTrace`] per decision to an
//! optional [`TraceObserver`].

mod rules;
mod scoring;
mod trace;

pub use rules::{section_hand, Rule};
pub use scoring::{choose, score, Scores};
pub use trace::{to_jsonl, AssignmentTrace, LogObserver, TraceCollector, TraceObserver};

use log::info;
use serde::Serialize;
use std::fmt;

use stickwork_core::{CompoundEvent, DrumKit, Instrument};

use crate::config::HandsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Right,
    Left,
}

/// What each hand was doing before the current event
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HandState {
    pub prev_right: Option<Instrument>,
    pub prev_left: Option<Instrument>,
    /// Seconds since the right hand last struck
    pub since_right: f64,
    pub since_left: f64,
}

impl HandState {
    pub fn advance(&mut self, delta: f64) {
        self.since_right += delta;
        self.since_left += delta;
    }

    pub fn record(&mut self, assignment: &Assignment) {
        if let Some(code) = assignment.right.non_empty() {
            self.prev_right = Some(code);
            self.since_right = 0.0;
        }
        if let Some(code) = assignment.left.non_empty() {
            self.prev_left = Some(code);
            self.since_left = 0.0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Assignment {
    pub right: Instrument,
    pub left: Instrument,
}

impl Assignment {
    pub fn new(right: Instrument, left: Instrument) -> Self {
        Self { right, left }
    }

    pub fn single(hand: Hand, instrument: Instrument) -> Self {
        match hand {
            Hand::Right => Self::new(instrument, Instrument::EMPTY),
            Hand::Left => Self::new(Instrument::EMPTY, instrument),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// Nothing to strike
    Idle,
    Rule { rule: Rule },
    Scored { scores: Scores },
    /// Two voices no rule could order: slot A right, slot B left
    SlotOrder,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Idle => write!(f, "idle"),
            Reason::Rule { rule } => write!(f, "rule {:?}", rule),
            Reason::Scored { scores } if scores.tied => {
                write!(f, "tie {:.3}/{:.3}, section", scores.right, scores.left)
            }
            Reason::Scored { scores } => write!(f, "score {:.3}/{:.3}", scores.right, scores.left),
            Reason::SlotOrder => write!(f, "slot order"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub assignment: Assignment,
    pub reason: Reason,
}

/// Decide the hands for `event` given a state already advanced by its delta
pub fn decide(config: &HandsConfig, kit: &DrumKit, state: &HandState, event: &CompoundEvent) -> Decision {
    if event.slot_count() == 0 {
        return Decision {
            assignment: Assignment::default(),
            reason: Reason::Idle,
        };
    }

    for &rule in &config.rules {
        if let Some(assignment) = rule.apply(config, kit, state, event) {
            return Decision {
                assignment,
                reason: Reason::Rule { rule },
            };
        }
    }

    let mut slots = event.slots();
    match (slots.next(), slots.next()) {
        (Some(a), Some(b)) => Decision {
            assignment: Assignment::new(a, b),
            reason: Reason::SlotOrder,
        },
        (Some(x), None) => {
            let (hand, scores) = choose(config, kit, state, x);
            Decision {
                assignment: Assignment::single(hand, x),
                reason: Reason::Scored { scores },
            }
        }
        _ => Decision {
            assignment: Assignment::default(),
            reason: Reason::Idle,
        },
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignStats {
    pub events: usize,
    pub by_rule: usize,
    pub scored: usize,
    pub ties: usize,
}

/// Stateful wrapper around [`decide`]
pub struct HandEngine<'a> {
    config: &'a HandsConfig,
    kit: &'a DrumKit,
    state: HandState,
    index: usize,
}

impl<'a> HandEngine<'a> {
    pub fn new(config: &'a HandsConfig, kit: &'a DrumKit) -> Self {
        Self {
            config,
            kit,
            state: HandState::default(),
            index: 0,
        }
    }

    pub fn state(&self) -> &HandState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = HandState::default();
        self.index = 0;
    }

    /// Assign one event in place
    pub fn step(&mut self, event: &mut CompoundEvent) -> AssignmentTrace {
        self.state.advance(event.time);
        let snapshot = self.state;
        let decision = decide(self.config, self.kit, &snapshot, event);

        event.right = decision.assignment.right;
        event.left = decision.assignment.left;
        self.state.record(&decision.assignment);

        let trace = AssignmentTrace {
            index: self.index,
            time: event.time,
            slots: [event.slot_a, event.slot_b],
            state: snapshot,
            decision,
        };
        self.index += 1;
        trace
    }

    /// Assign a whole stream, handing each trace to `observer`
    pub fn assign(&mut self, events: &mut [CompoundEvent], mut observer: Option<&mut dyn TraceObserver>) -> AssignStats {
        let mut stats = AssignStats::default();
        for event in events.iter_mut() {
            let trace = self.step(event);
            stats.events += 1;
            match trace.decision.reason {
                Reason::Rule { .. } => stats.by_rule += 1,
                Reason::Scored { scores } => {
                    stats.scored += 1;
                    if scores.tied {
                        stats.ties += 1;
                    }
                }
                Reason::Idle | Reason::SlotOrder => {}
            }
            if let Some(observer) = observer.as_deref_mut() {
                observer.observe(&trace);
            }
        }
        info!(
            "Assigned hands for {} events ({} by rule, {} scored, {} ties)",
            stats.events, stats.by_rule, stats.scored, stats.ties
        );
        stats
    }
}
