//! Sidecar velocity logs: `time,instrument,velocity` per line.
//!
//! Commas and whitespace both separate fields, blank lines are skipped and
//! a leading header line is ignored. A record with time `-1` ends the log.

use log::debug;
use std::path::Path;

use stickwork_core::{Error, Instrument, RawHit, Result};

const END_MARKER: f64 = -1.0;

pub fn parse(text: &str) -> Result<Vec<RawHit>> {
    let mut hits = Vec::new();
    let mut seen_record = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            continue;
        }

        let time = match fields[0].parse::<f64>() {
            Ok(time) => time,
            Err(_) if !seen_record => {
                debug!("Skipping velocity log header: {}", line.trim());
                seen_record = true;
                continue;
            }
            Err(_) => return Err(bad_line(line_no, format!("invalid time {:?}", fields[0]))),
        };
        seen_record = true;

        if time == END_MARKER {
            debug!("Velocity log ends at line {}", line_no);
            break;
        }
        if fields.len() < 3 {
            return Err(bad_line(line_no, format!("expected 3 fields, found {}", fields.len())));
        }
        if !time.is_finite() || time < 0.0 {
            return Err(bad_line(line_no, format!("time {} is out of range", time)));
        }
        let instrument: u8 = fields[1]
            .parse()
            .map_err(|_| bad_line(line_no, format!("invalid instrument {:?}", fields[1])))?;
        let velocity: u8 = fields[2]
            .parse()
            .ok()
            .filter(|v| *v <= 127)
            .ok_or_else(|| bad_line(line_no, format!("invalid velocity {:?}", fields[2])))?;

        hits.push(RawHit::new(time, Instrument(instrument), velocity));
    }

    Ok(hits)
}

pub fn read(path: &Path) -> Result<Vec<RawHit>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse(&text)
}

fn bad_line(line: usize, message: String) -> Error {
    Error::VelocityLog { line, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_and_whitespace_separators() {
        let hits = parse("0.0,1,100\n0.5 5 80\n1.0, 2,\t64\n").unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[1], RawHit::new(0.5, 5, 80));
        assert_eq!(hits[2].instrument, Instrument::FLOOR_TOM);
    }

    #[test]
    fn test_header_and_blank_lines() {
        let hits = parse("time,instrument,velocity\n\n0.25,7,127\n\n").unwrap();
        assert_eq!(hits, vec![RawHit::new(0.25, 7, 127)]);
    }

    #[test]
    fn test_end_marker_stops_reading() {
        let hits = parse("0.0,1,90\n-1,0,0\n2.0,1,90\n").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let err = parse("0.0,1,90\n0.5,snare,90\n").unwrap_err();
        match err {
            Error::VelocityLog { line, .. } => assert_eq!(line, 2),
            other => panic!("expected VelocityLog, got {:?}", other),
        }

        let err = parse("0.0,1,200\n").unwrap_err();
        assert!(matches!(err, Error::VelocityLog { line: 1, .. }));

        let err = parse("0.0,1\n").unwrap_err();
        assert!(matches!(err, Error::VelocityLog { line: 1, .. }));
    }

    #[test]
    fn test_header_only_once() {
        let err = parse("time,instrument,velocity\nagain,a,header\n").unwrap_err();
        assert!(matches!(err, Error::VelocityLog { line: 2, .. }));
    }
}
