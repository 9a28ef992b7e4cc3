use serde::{Deserialize, Serialize};

use crate::Instrument;

/// One decoded drum strike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// Seconds since the start of the track
    pub time: f64,
    pub instrument: Instrument,
    pub velocity: u8,
}

impl RawHit {
    pub fn new(time: f64, instrument: impl Into<Instrument>, velocity: u8) -> Self {
        RawHit {
            time,
            instrument: instrument.into(),
            velocity,
        }
    }
}

/// Stable sort by time; hits at the same instant keep their decode order.
pub fn sort_by_time(hits: &mut [RawHit]) {
    hits.sort_by(|a, b| a.time.total_cmp(&b.time));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_stable() {
        let mut hits = vec![
            RawHit::new(0.5, 1, 90),
            RawHit::new(0.0, 5, 80),
            RawHit::new(0.5, 10, 70),
        ];
        sort_by_time(&mut hits);
        let codes: Vec<u8> = hits.iter().map(|h| h.instrument.code()).collect();
        assert_eq!(codes, vec![5, 1, 10]);
    }
}
