//! Pipeline configuration, loadable from TOML.
//!
//! Every section falls back to its defaults, so a config file only needs the
//! values it changes:
//!
//! ```toml
//! tempo = 120.0
//!
//! [decoder]
//! drum_channel = 10
//!
//! [groove]
//! enabled = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use stickwork_core::{DrumKit, Error, Result};

use crate::hands::Rule;
use crate::notes::NoteMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// 1-based MIDI channel carrying the drums
    pub drum_channel: u8,
    /// Tempo assumed until the first tempo event
    pub default_bpm: f64,
}

impl DecoderConfig {
    /// Channel nibble as it appears in status bytes
    pub fn channel_index(&self) -> u8 {
        self.drum_channel.saturating_sub(1)
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            drum_channel: 10,
            default_bpm: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergerConfig {
    /// Simultaneity grid in seconds; 0 merges only exactly equal times
    pub grid: f64,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self { grid: 0.05 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandsConfig {
    /// Override rules, tried in order before distance scoring
    pub rules: Vec<Rule>,
    pub repeat_window: f64,
    pub timing_cap: f64,
    pub timing_factor: f64,
    pub max_distance: f64,
    pub tie_epsilon: f64,
}

impl Default for HandsConfig {
    fn default() -> Self {
        Self {
            rules: Rule::standard(),
            repeat_window: 0.1,
            timing_cap: 0.6,
            timing_factor: 1.38,
            max_distance: 0.754,
            tie_epsilon: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrooveConfig {
    pub enabled: bool,
    /// Accumulated beats that trigger a nudge
    pub beats: f64,
    /// Seconds moved from the current event to the next
    pub offset: f64,
}

impl Default for GrooveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            beats: 2.0,
            offset: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Drive hand power from the window levels
    pub apply_power: bool,
    pub window_beats: f64,
    /// Mean velocity is divided by this before rounding
    pub divisor: f64,
    pub max_level: u8,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            apply_power: false,
            window_beats: 4.0,
            divisor: 40.0,
            max_level: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub sub_step: f64,
    pub measure_length: f64,
    /// Power for a struck hand when no dynamics are available
    pub default_power: u8,
    /// Power per dynamics level, indexed by level
    pub power_tiers: Vec<u8>,
    pub epsilon: f64,
}

impl EncoderConfig {
    pub fn power_for_level(&self, level: u8) -> u8 {
        self.power_tiers
            .get(usize::from(level))
            .or_else(|| self.power_tiers.last())
            .copied()
            .unwrap_or(self.default_power)
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sub_step: 0.6,
            measure_length: 2.4,
            default_power: 5,
            power_tiers: vec![3, 3, 5, 7],
            epsilon: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tempo for groove and dynamics windows; the file's first tempo when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
    pub decoder: DecoderConfig,
    pub merger: MergerConfig,
    pub hands: HandsConfig,
    pub groove: GrooveConfig,
    pub dynamics: DynamicsConfig,
    pub encoder: EncoderConfig,
    pub kit: DrumKit,
    pub notes: NoteMap,
}

impl PipelineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        log::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values the stages cannot work with
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, message: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::Config(message.to_string()))
            }
        }

        check((1..=16).contains(&self.decoder.drum_channel), "decoder.drum_channel must be 1-16")?;
        check(positive(self.decoder.default_bpm), "decoder.default_bpm must be positive")?;
        if let Some(tempo) = self.tempo {
            check(positive(tempo), "tempo must be positive")?;
        }
        check(self.merger.grid >= 0.0 && self.merger.grid.is_finite(), "merger.grid must not be negative")?;
        check(positive(self.hands.timing_cap), "hands.timing_cap must be positive")?;
        check(positive(self.hands.max_distance), "hands.max_distance must be positive")?;
        check(self.hands.repeat_window >= 0.0, "hands.repeat_window must not be negative")?;
        check(self.hands.tie_epsilon >= 0.0, "hands.tie_epsilon must not be negative")?;
        check(positive(self.groove.beats), "groove.beats must be positive")?;
        check(self.groove.offset >= 0.0, "groove.offset must not be negative")?;
        check(positive(self.dynamics.window_beats), "dynamics.window_beats must be positive")?;
        check(positive(self.dynamics.divisor), "dynamics.divisor must be positive")?;
        check(positive(self.encoder.sub_step), "encoder.sub_step must be positive")?;
        check(
            self.encoder.measure_length >= self.encoder.sub_step,
            "encoder.measure_length must hold at least one sub-step",
        )?;
        check(
            self.encoder.power_tiers.len() > usize::from(self.dynamics.max_level),
            "encoder.power_tiers needs one entry per dynamics level",
        )?;
        check(self.kit.position(self.kit.rest).is_some(), "kit.rest must name a placed instrument")?;
        Ok(())
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
