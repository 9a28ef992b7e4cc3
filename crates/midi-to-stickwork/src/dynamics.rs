use log::info;

use stickwork_core::{DrumKit, RawHit, Tempo, VelocityWindow, VoiceClass, VoiceRole};

use crate::config::DynamicsConfig;

/// Pads the last observed time so a hit exactly on a boundary still gets a window
const END_PADDING: f64 = 0.001;

/// Buckets hit velocities into fixed windows and quantizes each class to a level
pub struct DynamicsSummarizer<'a> {
    kit: &'a DrumKit,
    window: f64,
    divisor: f64,
    max_level: u8,
}

#[derive(Default, Clone, Copy)]
struct Bucket {
    sum: u32,
    count: u32,
}

impl Bucket {
    fn add(&mut self, velocity: u8) {
        self.sum += u32::from(velocity);
        self.count += 1;
    }

    fn level(&self, divisor: f64, max_level: u8) -> u8 {
        if self.count == 0 {
            return 0;
        }
        let mean = f64::from(self.sum) / f64::from(self.count);
        let level = (mean / divisor).round();
        level.clamp(0.0, f64::from(max_level)) as u8
    }
}

impl<'a> DynamicsSummarizer<'a> {
    pub fn new(kit: &'a DrumKit, config: &DynamicsConfig, tempo: Tempo) -> Self {
        Self {
            kit,
            window: tempo.beats(config.window_beats),
            divisor: config.divisor,
            max_level: config.max_level,
        }
    }

    pub fn window_size(&self) -> f64 {
        self.window
    }

    pub fn summarize(&self, hits: &[RawHit]) -> Vec<VelocityWindow> {
        let max_time = hits
            .iter()
            .map(|h| h.time)
            .filter(|t| t.is_finite() && *t >= 0.0)
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |m| m.max(t))));
        let Some(max_time) = max_time else {
            return Vec::new();
        };

        let count = ((max_time + END_PADDING) / self.window).ceil().max(1.0) as usize;
        let mut drums = vec![Bucket::default(); count];
        let mut cymbals = vec![Bucket::default(); count];

        for hit in hits {
            if !(hit.time.is_finite() && hit.time >= 0.0) {
                continue;
            }
            let idx = ((hit.time / self.window) as usize).min(count - 1);
            // pedal and hi-hat toggle velocities are flags, not strikes
            if self.kit.role(hit.instrument) != Some(VoiceRole::Strike) {
                continue;
            }
            match self.kit.class(hit.instrument) {
                Some(VoiceClass::Drum) => drums[idx].add(hit.velocity),
                Some(VoiceClass::Cymbal) => cymbals[idx].add(hit.velocity),
                None => {}
            }
        }

        let windows: Vec<VelocityWindow> = (0..count)
            .map(|i| VelocityWindow {
                start: i as f64 * self.window,
                end: (i + 1) as f64 * self.window,
                drum: drums[i].level(self.divisor, self.max_level),
                cymbal: cymbals[i].level(self.divisor, self.max_level),
            })
            .collect();

        info!(
            "Summarized dynamics of {} hits into {} windows of {:.3}s",
            hits.len(),
            windows.len(),
            self.window
        );
        windows
    }
}

/// Level of `class` in the window containing `time`
pub fn level_at(windows: &[VelocityWindow], time: f64, class: VoiceClass) -> Option<u8> {
    windows.iter().find(|w| w.contains(time)).map(|w| match class {
        VoiceClass::Drum => w.drum,
        VoiceClass::Cymbal => w.cymbal,
    })
}
