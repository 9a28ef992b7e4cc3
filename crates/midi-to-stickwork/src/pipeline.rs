//! End-to-end orchestration of the stages.
//!
//! Decoding failures abort the run before any table exists, so a caller
//! either gets a complete [`PipelineOutput`] or an error.

use log::{info, warn};
use std::path::Path;

use stickwork_core::{CompoundEvent, RawHit, Result, Tempo, VelocityWindow};

use crate::config::PipelineConfig;
use crate::decoder::{decode_hits, HitLog};
use crate::dynamics::DynamicsSummarizer;
use crate::groove;
use crate::hands::{AssignStats, AssignmentTrace, HandEngine, LogObserver, TraceCollector};
use crate::measure::{MeasureEncoder, MeasureTable};
use crate::merge::{HitMerger, MergeStats};
use crate::smf::SmfFile;

/// Every intermediate product of a run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub hit_log: HitLog,
    /// Tempo used for groove correction and dynamics windows
    pub tempo: Tempo,
    /// Merger output, before hand assignment
    pub events: Vec<CompoundEvent>,
    /// Hand-assigned and drift-corrected events fed to the encoder
    pub assigned: Vec<CompoundEvent>,
    pub traces: Vec<AssignmentTrace>,
    pub dynamics: Vec<VelocityWindow>,
    /// Whether `dynamics` drove the power columns
    pub dynamics_applied: bool,
    pub table: MeasureTable,
    pub merge_stats: MergeStats,
    pub assign_stats: AssignStats,
    pub nudges: usize,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run on a MIDI file, with an optional sidecar velocity log
    pub fn run_file(&self, midi: &Path, velocity_log: Option<&Path>) -> Result<PipelineOutput> {
        let smf = SmfFile::read(midi)?;
        let velocities = velocity_log.map(crate::velocity_log::read).transpose()?;
        self.run(&smf, velocities)
    }

    pub fn run_bytes(&self, data: Vec<u8>, velocities: Option<Vec<RawHit>>) -> Result<PipelineOutput> {
        let smf = SmfFile::parse(data)?;
        self.run(&smf, velocities)
    }

    pub fn run(&self, smf: &SmfFile, velocities: Option<Vec<RawHit>>) -> Result<PipelineOutput> {
        let hit_log = decode_hits(smf, &self.config.decoder, &self.config.notes)?;
        Ok(self.process(hit_log, velocities))
    }

    /// Everything after decoding; cannot fail
    pub fn process(&self, hit_log: HitLog, velocities: Option<Vec<RawHit>>) -> PipelineOutput {
        let config = &self.config;
        let kit = &config.kit;

        if hit_log.hits.is_empty() {
            warn!("No drum hits found on channel {}", config.decoder.drum_channel);
        }

        let tempo = config
            .tempo
            .map(Tempo::from_bpm)
            .unwrap_or_else(|| hit_log.tempo_map.primary_tempo());
        info!("Using {:.2} BPM for groove and dynamics", tempo.bpm());

        let (events, merge_stats) = HitMerger::new(kit, &config.merger).merge(&hit_log.hits);
        info!(
            "Merged {} hits into {} events ({} discarded)",
            merge_stats.hits, merge_stats.events, merge_stats.discarded
        );

        let mut assigned = events.clone();
        let mut observers = (LogObserver, TraceCollector::default());
        let assign_stats = HandEngine::new(&config.hands, kit).assign(&mut assigned, Some(&mut observers));
        let traces = observers.1.traces;

        let nudges = groove::apply(&mut assigned, &config.groove, tempo);

        let dynamics_applied = config.dynamics.apply_power || velocities.is_some();
        let source = velocities.as_deref().unwrap_or(&hit_log.hits);
        let dynamics = DynamicsSummarizer::new(kit, &config.dynamics, tempo).summarize(source);

        let mut encoder = MeasureEncoder::new(&config.encoder, kit);
        if dynamics_applied {
            encoder = encoder.with_dynamics(&dynamics);
        }
        let table = encoder.encode(&assigned);

        PipelineOutput {
            hit_log,
            tempo,
            events,
            assigned,
            traces,
            dynamics,
            dynamics_applied,
            table,
            merge_stats,
            assign_stats,
            nudges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smf::tests::build_smf;
    use stickwork_core::{Error, Instrument};

    /// Conductor at 100 BPM plus a drum track; one beat is 480 ticks = 0.6 s
    fn groove_file() -> Vec<u8> {
        let conductor = vec![0x00, 0xFF, 0x51, 0x03, 0x09, 0x27, 0xC0, 0x00, 0xFF, 0x2F, 0x00];
        let drums = vec![
            // beat 1: crash + kick
            0x00, 0x99, 49, 110, //
            0x00, 36, 100, //
            // beat 2: hi-hat + snare
            0x83, 0x60, 42, 80, //
            0x00, 38, 90, //
            // beat 3: hi-hat
            0x83, 0x60, 42, 70, //
            // beat 3 + 1/16: hi-hat again (0.15 s later)
            0x78, 42, 70, //
            // four beats later: floor tom
            0x8F, 0x00, 41, 100, //
            0x00, 0xFF, 0x2F, 0x00,
        ];
        build_smf(1, 480, &[conductor, drums])
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_end_to_end_table() {
        let output = pipeline().run_bytes(groove_file(), None).unwrap();
        assert_eq!(output.hit_log.hits.len(), 7);
        assert_eq!(output.events.len(), 5);
        assert!((output.tempo.bpm() - 100.0).abs() < 1e-9);

        let rows = &output.table.rows;
        assert_eq!(rows[0].to_string(), "1\t0.600\t0\t0\t0\t0\t0\t0");
        assert_eq!(rows[rows.len() - 1].to_string(), "-1\t0.600\t1\t1\t1\t1\t1\t1");

        let body = output.table.body();
        // crash on the right, kick pedal down
        assert_eq!(body[0].right, Instrument::CRASH_RIGHT);
        assert!(body[0].bass);
        assert_eq!(body[0].duration, 0.0);
        // hi-hat right, snare left
        assert_eq!(body[1].right, Instrument::HIHAT);
        assert_eq!(body[1].left, Instrument::SNARE);

        // one groove nudge; total time is unchanged
        assert_eq!(output.nudges, 1);
        let total: f64 = body.iter().map(|r| r.duration).sum();
        assert!((total - 3.75).abs() < 1e-6);
        assert_eq!(output.traces.len(), output.events.len());
    }

    #[test]
    fn test_every_event_is_played_by_its_slots() {
        let output = pipeline().run_bytes(groove_file(), None).unwrap();
        for event in &output.assigned {
            assert_eq!(event.hand_count(), event.slot_count());
        }
    }

    #[test]
    fn test_malformed_file_yields_no_table() {
        let mut data = groove_file();
        data[1] = b'X';
        let err = pipeline().run_bytes(data, None).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { .. }));

        let mut data = groove_file();
        data.truncate(data.len() - 3);
        let err = pipeline().run_bytes(data, None).unwrap_err();
        assert!(matches!(err, Error::TruncatedFile { .. }));
    }

    #[test]
    fn test_velocity_log_drives_power() {
        let velocities: Vec<RawHit> = (0..10).map(|i| RawHit::new(i as f64 * 0.2, 2, 80)).collect();
        let output = pipeline().run_bytes(groove_file(), Some(velocities)).unwrap();
        assert!(output.dynamics_applied);
        assert_eq!(output.dynamics.len(), 1);
        assert_eq!(output.dynamics[0].drum, 2);

        // snare in the first window: drum level 2 -> power 5; crash cymbal level 0 -> 3
        let body = output.table.body();
        assert_eq!(body[0].right_power, 3);
        assert_eq!(body[1].left_power, 5);
    }

    #[test]
    fn test_default_power_without_dynamics() {
        let output = pipeline().run_bytes(groove_file(), None).unwrap();
        assert!(!output.dynamics_applied);
        assert!(!output.dynamics.is_empty());
        for row in output.table.body() {
            if !row.right.is_empty() {
                assert_eq!(row.right_power, 5);
            }
        }
    }

    #[test]
    fn test_tempo_override() {
        let config = PipelineConfig {
            tempo: Some(120.0),
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).unwrap().run_bytes(groove_file(), None).unwrap();
        assert_eq!(output.tempo.bpm(), 120.0);
        // decoded times still follow the file's tempo
        assert!((output.hit_log.hits[2].time - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.encoder.sub_step = 0.0;
        assert!(matches!(Pipeline::new(config), Err(Error::Config(_))));
    }
}
