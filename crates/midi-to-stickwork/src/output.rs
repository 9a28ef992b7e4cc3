use serde::Serialize;
use std::fs;
use std::path::Path;

use stickwork_core::{CompoundEvent, Diagnostic, Error, MeasureRow, RawHit, Result, VelocityWindow};

use crate::decoder::TrackStats;
use crate::hands;
use crate::merge::MergeStats;
use crate::pipeline::PipelineOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated rows, as read by the robot controller
    #[default]
    Tsv,
    Json,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn build_output(&self, output: &PipelineOutput) -> String {
        match self.format {
            OutputFormat::Tsv => self.build_output_tsv(&output.table.rows),
            OutputFormat::Json => self.build_output_json(output),
        }
    }

    /// One line per measure row, sentinel included
    pub fn build_output_tsv(&self, rows: &[MeasureRow]) -> String {
        let mut out = String::new();
        for row in rows {
            out.push_str(&row.to_string());
            out.push('\n');
        }
        out
    }

    pub fn build_output_json(&self, output: &PipelineOutput) -> String {
        #[derive(Serialize)]
        struct JsonOutput<'a> {
            bpm: f64,
            measures: i32,
            rows: &'a [MeasureRow],
            dynamics: &'a [VelocityWindow],
            dynamics_applied: bool,
            merge: MergeStats,
            tracks: &'a [TrackStats],
            diagnostics: &'a [Diagnostic],
        }

        let json = JsonOutput {
            bpm: output.tempo.bpm(),
            measures: output.table.last_measure(),
            rows: &output.table.rows,
            dynamics: &output.dynamics,
            dynamics_applied: output.dynamics_applied,
            merge: output.merge_stats,
            tracks: &output.hit_log.tracks,
            diagnostics: &output.hit_log.diagnostics,
        };

        serde_json::to_string_pretty(&json).unwrap_or_else(|e| {
            log::error!("Error serializing to JSON: {}", e);
            "{}".to_string()
        })
    }
}

pub fn dynamics_table(windows: &[VelocityWindow]) -> String {
    let mut out = String::from("start_time\tend_time\tdrum\tcymbal\n");
    for window in windows {
        out.push_str(&format!("{}\n", window));
    }
    out
}

pub fn hits_table(hits: &[RawHit]) -> String {
    let mut out = String::from("time\tinstrument\tvelocity\n");
    for hit in hits {
        out.push_str(&format!("{:.3}\t{}\t{}\n", hit.time, hit.instrument, hit.velocity));
    }
    out
}

/// Merger output: delta, both slots and the flags
pub fn events_table(events: &[CompoundEvent]) -> String {
    let mut out = String::from("delta\tslotA\tslotB\tbass\thihat\n");
    for e in events {
        out.push_str(&format!(
            "{:.3}\t{}\t{}\t{}\t{}\n",
            e.time,
            e.slot_a,
            e.slot_b,
            u8::from(e.bass),
            e.hihat.flag()
        ));
    }
    out
}

pub fn assigned_table(events: &[CompoundEvent]) -> String {
    let mut out = String::from("delta\tright\tleft\tbass\thihat\n");
    for e in events {
        out.push_str(&format!(
            "{:.3}\t{}\t{}\t{}\t{}\n",
            e.time,
            e.right,
            e.left,
            u8::from(e.bass),
            e.hihat.flag()
        ));
    }
    out
}

/// Write every intermediate stage into `dir`, creating it if needed
pub fn write_stage_dumps(dir: &Path, output: &PipelineOutput) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let trace = hands::to_jsonl(&output.traces)?;

    let files = [
        ("hits.tsv", hits_table(&output.hit_log.hits)),
        ("events.tsv", events_table(&output.events)),
        ("assigned.tsv", assigned_table(&output.assigned)),
        ("dynamics.tsv", dynamics_table(&output.dynamics)),
        ("trace.jsonl", trace),
    ];
    for (name, contents) in files {
        let path = dir.join(name);
        fs::write(&path, contents).map_err(|e| Error::io(&path, e))?;
        log::debug!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::Pipeline;
    use crate::smf::tests::build_smf;
    use stickwork_core::{HihatState, Instrument};

    fn run() -> PipelineOutput {
        let track = vec![
            0x00, 0x99, 38, 100, //
            0x00, 42, 90, //
            0x83, 0x60, 51, 70, //
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let data = build_smf(0, 480, &[track]);
        Pipeline::new(PipelineConfig::default()).unwrap().run_bytes(data, None).unwrap()
    }

    #[test]
    fn test_tsv_ends_with_sentinel() {
        let output = run();
        let text = OutputFormatter::new(OutputFormat::Tsv).build_output(&output);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), output.table.rows.len());
        assert_eq!(lines[0], "1\t0.600\t0\t0\t0\t0\t0\t0");
        assert_eq!(lines[lines.len() - 1], "-1\t0.600\t1\t1\t1\t1\t1\t1");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_json_output() {
        let output = run();
        let text = OutputFormatter::new(OutputFormat::Json).build_output(&output);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["bpm"], 100.0);
        assert_eq!(value["rows"].as_array().unwrap().len(), output.table.rows.len());
        assert_eq!(value["rows"][0]["measure"], 1);
        // no tempo event in the file
        assert_eq!(value["diagnostics"][0]["kind"], "missing_tempo");
    }

    #[test]
    fn test_dynamics_table() {
        let windows = [VelocityWindow { start: 0.0, end: 2.4, drum: 2, cymbal: 0 }];
        assert_eq!(dynamics_table(&windows), "start_time\tend_time\tdrum\tcymbal\n0.000\t2.400\t2\t0\n");
        assert_eq!(dynamics_table(&[]).lines().count(), 1);
    }

    #[test]
    fn test_stage_tables() {
        let event = CompoundEvent {
            slot_a: Instrument::SNARE,
            slot_b: Instrument::HIHAT,
            right: Instrument::HIHAT,
            left: Instrument::SNARE,
            bass: true,
            hihat: HihatState::Closed,
            ..CompoundEvent::new(0.25)
        };
        assert_eq!(events_table(&[event]).lines().nth(1), Some("0.250\t1\t5\t1\t1"));
        assert_eq!(assigned_table(&[event]).lines().nth(1), Some("0.250\t5\t1\t1\t1"));
        assert_eq!(hits_table(&[RawHit::new(1.5, 7, 99)]).lines().nth(1), Some("1.500\t7\t99"));
    }

    #[test]
    fn test_stage_dumps() {
        let output = run();
        let dir = std::env::temp_dir().join(format!("stickwork-dumps-{}", std::process::id()));
        write_stage_dumps(&dir, &output).unwrap();

        for name in ["hits.tsv", "events.tsv", "assigned.tsv", "dynamics.tsv", "trace.jsonl"] {
            assert!(dir.join(name).is_file(), "{} missing", name);
        }
        let trace = fs::read_to_string(dir.join("trace.jsonl")).unwrap();
        assert_eq!(trace.lines().count(), output.events.len());
        let first: serde_json::Value = serde_json::from_str(trace.lines().next().unwrap()).unwrap();
        assert_eq!(first["index"], 0);

        fs::remove_dir_all(&dir).unwrap();
    }
}
