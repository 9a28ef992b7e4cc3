//! Track event decoding and drum hit extraction.
//!
//! `EventDecoder` walks one MTrk payload byte by byte, keeping the running
//! status and the absolute tick. `decode_hits` drives one decoder per track,
//! builds the tempo map from every track and converts drum Note-Ons into
//! time-ordered [`RawHit`]s.

use log::{debug, info, warn};
use serde::Serialize;

use stickwork_core::hit::sort_by_time;
use stickwork_core::{Diagnostic, Error, RawHit, Result, Tempo};

use crate::config::DecoderConfig;
use crate::notes::{gm_drum_name, NoteMap};
use crate::smf::{SmfFile, TimeBase, TrackChunk};
use crate::vlq;

const META: u8 = 0xFF;
const META_END_OF_TRACK: u8 = 0x2F;
const META_TEMPO: u8 = 0x51;
const META_TIME_SIGNATURE: u8 = 0x58;
const SYSEX: u8 = 0xF0;
const SYSEX_ESCAPE: u8 = 0xF7;
const NOTE_ON: u8 = 0x90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    Tempo { micros_per_quarter: u32 },
    TimeSignature { numerator: u8, denominator: u8 },
    EndOfTrack,
    /// A byte that could not start an event; it has been skipped
    Unrecognized { byte: u8 },
    /// Anything consumed without further interest
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    /// Absolute tick from the start of the track
    pub tick: u64,
    /// File offset of the status (or first data) byte
    pub offset: usize,
    pub event: TrackEvent,
}

/// Streaming decoder over one track chunk
pub struct EventDecoder<'a> {
    data: &'a [u8],
    track: usize,
    pos: usize,
    end: usize,
    tick: u64,
    running_status: Option<u8>,
    finished: bool,
}

impl<'a> EventDecoder<'a> {
    /// `data` is the whole file buffer; the decoder stays inside the chunk's range
    pub fn new(data: &'a [u8], chunk: &TrackChunk) -> Self {
        EventDecoder {
            data,
            track: chunk.index,
            pos: chunk.start,
            end: chunk.end.min(data.len()),
            tick: 0,
            running_status: None,
            finished: false,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Decode the next event, `None` once the track is exhausted
    pub fn next_event(&mut self) -> Result<Option<TimedEvent>> {
        if self.finished || self.pos >= self.end {
            self.finished = true;
            return Ok(None);
        }

        let (delta, next) = vlq::read(self.data, self.pos, self.end)?;
        self.pos = next;
        self.tick += u64::from(delta);

        let offset = self.pos;
        let first = self.take(1)?[0];

        let status = if first & 0x80 != 0 {
            first
        } else if let Some(status) = self.running_status {
            // data byte under running status; put it back
            self.pos -= 1;
            status
        } else {
            return Ok(Some(self.timed(offset, TrackEvent::Unrecognized { byte: first })));
        };

        let event = match status {
            META => self.meta_event()?,
            SYSEX | SYSEX_ESCAPE => {
                let (len, next) = vlq::read(self.data, self.pos, self.end)?;
                self.pos = next;
                self.take(len as usize)?;
                TrackEvent::Other
            }
            0x80..=0xEF => {
                self.running_status = Some(status);
                self.channel_event(status)?
            }
            _ => TrackEvent::Unrecognized { byte: status },
        };

        Ok(Some(self.timed(offset, event)))
    }

    fn timed(&self, offset: usize, event: TrackEvent) -> TimedEvent {
        TimedEvent {
            tick: self.tick,
            offset,
            event,
        }
    }

    fn meta_event(&mut self) -> Result<TrackEvent> {
        let kind = self.take(1)?[0];
        let (len, next) = vlq::read(self.data, self.pos, self.end)?;
        self.pos = next;
        let payload = self.take(len as usize)?;

        let event = match kind {
            META_END_OF_TRACK => {
                self.pos = self.end;
                self.finished = true;
                TrackEvent::EndOfTrack
            }
            META_TEMPO if payload.len() >= 3 => TrackEvent::Tempo {
                micros_per_quarter: u32::from_be_bytes([0, payload[0], payload[1], payload[2]]),
            },
            META_TIME_SIGNATURE if payload.len() >= 2 => TrackEvent::TimeSignature {
                numerator: payload[0],
                denominator: 1u8.checked_shl(u32::from(payload[1])).unwrap_or(0),
            },
            _ => TrackEvent::Other,
        };
        Ok(event)
    }

    fn channel_event(&mut self, status: u8) -> Result<TrackEvent> {
        let kind = status & 0xF0;
        let len = if matches!(kind, 0xC0 | 0xD0) { 1 } else { 2 };
        let payload = self.take(len)?;

        if kind == NOTE_ON {
            Ok(TrackEvent::NoteOn {
                channel: status & 0x0F,
                key: payload[0] & 0x7F,
                velocity: payload[1] & 0x7F,
            })
        } else {
            Ok(TrackEvent::Other)
        }
    }

    /// Consume `n` bytes, failing if they run past the chunk
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.end - self.pos;
        if n > available {
            return Err(Error::TruncatedFile {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn track(&self) -> usize {
        self.track
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoSegment {
    pub tick: u64,
    /// Seconds elapsed at `tick`
    pub seconds: f64,
    pub seconds_per_quarter: f64,
}

/// Tick to seconds conversion across tempo changes
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    time_base: TimeBase,
    default_tempo: Tempo,
    segments: Vec<TempoSegment>,
    /// Tick of the first explicit tempo event
    first_tempo_tick: Option<u64>,
}

impl TempoMap {
    /// `changes` are (tick, microseconds per quarter) pairs in any order
    pub fn new(time_base: TimeBase, default_tempo: Tempo, mut changes: Vec<(u64, u32)>) -> Self {
        changes.sort_by_key(|&(tick, _)| tick);
        let first_tempo_tick = changes.first().map(|&(tick, _)| tick);

        let mut segments = vec![TempoSegment {
            tick: 0,
            seconds: 0.0,
            seconds_per_quarter: default_tempo.beat_seconds(),
        }];

        let ticks_per_quarter = match time_base {
            TimeBase::Metrical { ticks_per_quarter } => f64::from(ticks_per_quarter),
            TimeBase::Smpte { .. } => 1.0,
        };

        for (tick, micros) in changes {
            let seconds_per_quarter = f64::from(micros) / 1e6;
            let last = segments[segments.len() - 1];
            if tick == last.tick {
                // a later event at the same tick wins
                let idx = segments.len() - 1;
                segments[idx].seconds_per_quarter = seconds_per_quarter;
                continue;
            }
            let seconds = last.seconds + (tick - last.tick) as f64 * last.seconds_per_quarter / ticks_per_quarter;
            segments.push(TempoSegment {
                tick,
                seconds,
                seconds_per_quarter,
            });
        }

        TempoMap {
            time_base,
            default_tempo,
            segments,
            first_tempo_tick,
        }
    }

    pub fn seconds_at(&self, tick: u64) -> f64 {
        match self.time_base {
            TimeBase::Smpte { .. } => {
                let per_second = self.time_base.smpte_ticks_per_second().unwrap_or(1.0);
                tick as f64 / per_second
            }
            TimeBase::Metrical { ticks_per_quarter } => {
                let idx = self.segments.partition_point(|s| s.tick <= tick).saturating_sub(1);
                let seg = &self.segments[idx];
                seg.seconds + (tick - seg.tick) as f64 * seg.seconds_per_quarter / f64::from(ticks_per_quarter)
            }
        }
    }

    pub fn first_tempo_tick(&self) -> Option<u64> {
        self.first_tempo_tick
    }

    /// The first tempo the file sets, or the fallback when it sets none
    pub fn primary_tempo(&self) -> Tempo {
        match self.first_tempo_tick {
            Some(tick) => {
                let idx = self.segments.partition_point(|s| s.tick <= tick).saturating_sub(1);
                Tempo::from_bpm(60.0 / self.segments[idx].seconds_per_quarter)
            }
            None => self.default_tempo,
        }
    }

    pub fn segments(&self) -> &[TempoSegment] {
        &self.segments
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackStats {
    pub index: usize,
    pub events: usize,
    pub drum_notes: usize,
    pub unmapped_notes: usize,
    pub skipped_bytes: usize,
}

/// Everything the decoder learned from a file
#[derive(Debug, Clone)]
pub struct HitLog {
    pub hits: Vec<RawHit>,
    pub tempo_map: TempoMap,
    pub diagnostics: Vec<Diagnostic>,
    pub tracks: Vec<TrackStats>,
}

impl HitLog {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

struct DrumNote {
    track: usize,
    tick: u64,
    key: u8,
    velocity: u8,
}

/// Decode every track and collect the drum hits in time order
pub fn decode_hits(smf: &SmfFile, config: &DecoderConfig, notes: &NoteMap) -> Result<HitLog> {
    let channel = config.channel_index();
    let mut diagnostics = Vec::new();
    let mut tempo_changes = Vec::new();
    let mut drum_notes = Vec::new();
    let mut tracks = Vec::with_capacity(smf.tracks.len());

    for chunk in &smf.tracks {
        let mut decoder = EventDecoder::new(smf.data(), chunk);
        let mut stats = TrackStats {
            index: chunk.index,
            ..Default::default()
        };

        while let Some(timed) = decoder.next_event()? {
            stats.events += 1;
            match timed.event {
                TrackEvent::NoteOn { channel: ch, key, velocity } if ch == channel && velocity > 0 => {
                    stats.drum_notes += 1;
                    drum_notes.push(DrumNote {
                        track: tracks.len(),
                        tick: timed.tick,
                        key,
                        velocity,
                    });
                }
                TrackEvent::Tempo { micros_per_quarter } => {
                    tempo_changes.push((timed.tick, micros_per_quarter));
                    let bpm = Tempo::from_micros_per_quarter(micros_per_quarter).bpm();
                    debug!("Track {}: tempo {:.2} BPM at tick {}", chunk.index, bpm, timed.tick);
                    diagnostics.push(Diagnostic::TempoChange { tick: timed.tick, bpm });
                }
                TrackEvent::TimeSignature { numerator, denominator } => {
                    debug!(
                        "Track {}: time signature {}/{} at tick {}",
                        chunk.index, numerator, denominator, timed.tick
                    );
                    diagnostics.push(Diagnostic::TimeSignature {
                        tick: timed.tick,
                        numerator,
                        denominator,
                    });
                }
                TrackEvent::Unrecognized { byte } => {
                    stats.skipped_bytes += 1;
                    let diag = Diagnostic::UnrecognizedEvent {
                        track: chunk.index,
                        offset: timed.offset,
                        byte,
                    };
                    warn!("{}", diag);
                    diagnostics.push(diag);
                }
                _ => {}
            }
        }
        tracks.push(stats);
    }

    let tempo_map = TempoMap::new(
        smf.header.time_base,
        Tempo::from_bpm(config.default_bpm),
        tempo_changes,
    );

    let first_note_tick = drum_notes.iter().map(|n| n.tick).min();
    if let (Some(first_note_tick), TimeBase::Metrical { .. }) = (first_note_tick, smf.header.time_base) {
        let covered = tempo_map.first_tempo_tick().map_or(false, |t| t <= first_note_tick);
        if !covered {
            let diag = Diagnostic::MissingTempo {
                default_bpm: config.default_bpm,
                first_note_tick,
            };
            warn!("{}", diag);
            diagnostics.push(diag);
        }
    }

    let mut hits = Vec::with_capacity(drum_notes.len());
    for note in &drum_notes {
        let instrument = notes.map(note.key);
        if instrument.is_empty() {
            debug!("Ignoring unmapped note {} ({})", note.key, gm_drum_name(note.key));
            tracks[note.track].unmapped_notes += 1;
            continue;
        }
        hits.push(RawHit::new(tempo_map.seconds_at(note.tick), instrument, note.velocity));
    }
    sort_by_time(&mut hits);

    let unmapped = drum_notes.len() - hits.len();
    info!(
        "Decoded {} drum hits from {} tracks ({} unmapped notes)",
        hits.len(),
        smf.tracks.len(),
        unmapped
    );

    Ok(HitLog {
        hits,
        tempo_map,
        diagnostics,
        tracks,
    })
}
