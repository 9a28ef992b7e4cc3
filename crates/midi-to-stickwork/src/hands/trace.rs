use log::debug;
use serde::Serialize;

use stickwork_core::{Instrument, Result};

use super::{Decision, HandState};

/// Everything that went into one assignment decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentTrace {
    pub index: usize,
    /// Delta time of the event
    pub time: f64,
    pub slots: [Instrument; 2],
    /// Hand state after advancing by `time`, before the decision
    pub state: HandState,
    pub decision: Decision,
}

/// Receives a trace per assigned event
pub trait TraceObserver {
    fn observe(&mut self, trace: &AssignmentTrace);
}

/// Feeds both observers, first then second
impl<A: TraceObserver, B: TraceObserver> TraceObserver for (A, B) {
    fn observe(&mut self, trace: &AssignmentTrace) {
        self.0.observe(trace);
        self.1.observe(trace);
    }
}

/// Logs each trace at debug level
#[derive(Debug, Default)]
pub struct LogObserver;

impl TraceObserver for LogObserver {
    fn observe(&mut self, trace: &AssignmentTrace) {
        debug!(
            "event {} (+{:.3}s) [{} {}] -> R {} L {} via {}",
            trace.index,
            trace.time,
            trace.slots[0],
            trace.slots[1],
            trace.decision.assignment.right,
            trace.decision.assignment.left,
            trace.decision.reason
        );
    }
}

/// Keeps every trace in memory
#[derive(Debug, Default)]
pub struct TraceCollector {
    pub traces: Vec<AssignmentTrace>,
}

impl TraceObserver for TraceCollector {
    fn observe(&mut self, trace: &AssignmentTrace) {
        self.traces.push(trace.clone());
    }
}

/// One JSON object per trace, one per line
pub fn to_jsonl(traces: &[AssignmentTrace]) -> Result<String> {
    let mut out = String::new();
    for trace in traces {
        out.push_str(&serde_json::to_string(trace)?);
        out.push('\n');
    }
    Ok(out)
}
