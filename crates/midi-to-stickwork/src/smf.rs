use log::{debug, warn};
use std::path::Path;

use stickwork_core::{Error, Result};

const HEADER_TAG: &[u8; 4] = b"MThd";
const TRACK_TAG: &[u8; 4] = b"MTrk";
const CHUNK_PREFIX: usize = 8;
const MIN_HEADER_LEN: usize = 6;

/// How ticks map to time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBase {
    /// Ticks per quarter note; seconds depend on the tempo map
    Metrical { ticks_per_quarter: u16 },
    /// Ticks per SMPTE frame; seconds are tempo independent
    Smpte { frames_per_second: u8, ticks_per_frame: u8 },
}

impl TimeBase {
    fn from_division(division: u16) -> Result<Self> {
        if division & 0x8000 != 0 {
            let fps = (division >> 8) as u8 as i8;
            let ticks_per_frame = (division & 0xFF) as u8;
            let frames_per_second = fps.unsigned_abs();
            if !matches!(frames_per_second, 24 | 25 | 29 | 30) || ticks_per_frame == 0 {
                return Err(Error::malformed(format!("unsupported SMPTE division 0x{:04X}", division)));
            }
            Ok(TimeBase::Smpte {
                frames_per_second,
                ticks_per_frame,
            })
        } else if division == 0 {
            Err(Error::malformed("division of zero ticks per quarter note"))
        } else {
            Ok(TimeBase::Metrical {
                ticks_per_quarter: division,
            })
        }
    }

    /// Ticks per second for SMPTE time bases
    pub fn smpte_ticks_per_second(&self) -> Option<f64> {
        match *self {
            TimeBase::Smpte {
                frames_per_second,
                ticks_per_frame,
            } => {
                // 29 is drop-frame 29.97
                let fps = if frames_per_second == 29 { 29.97 } else { f64::from(frames_per_second) };
                Some(fps * f64::from(ticks_per_frame))
            }
            TimeBase::Metrical { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format: u16,
    pub declared_tracks: u16,
    pub time_base: TimeBase,
}

/// Byte range of one MTrk payload inside the file buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackChunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl TrackChunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A Standard MIDI File held in memory with its chunk layout resolved
#[derive(Debug, Clone)]
pub struct SmfFile {
    pub header: Header,
    pub tracks: Vec<TrackChunk>,
    data: Vec<u8>,
}

impl SmfFile {
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        Self::parse(data)
    }

    pub fn parse(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_TAG.len() || &data[..4] != HEADER_TAG {
            return Err(Error::malformed("missing MThd tag"));
        }
        let header_len = read_u32(&data, 4)? as usize;
        if header_len < MIN_HEADER_LEN {
            return Err(Error::malformed(format!("header length {} is shorter than 6", header_len)));
        }
        let header_end = chunk_end(&data, CHUNK_PREFIX, header_len)?;

        let format = read_u16(&data, 8)?;
        let declared_tracks = read_u16(&data, 10)?;
        let time_base = TimeBase::from_division(read_u16(&data, 12)?)?;

        let mut tracks = Vec::new();
        let mut pos = header_end;
        while pos < data.len() {
            let remaining = data.len() - pos;
            if remaining < CHUNK_PREFIX {
                warn!("Ignoring {} trailing bytes after the last chunk", remaining);
                break;
            }
            let tag = &data[pos..pos + 4];
            let len = read_u32(&data, pos + 4)? as usize;
            let start = pos + CHUNK_PREFIX;
            let end = chunk_end(&data, start, len)?;

            if tag == TRACK_TAG {
                tracks.push(TrackChunk {
                    index: tracks.len(),
                    start,
                    end,
                });
            } else {
                debug!(
                    "Skipping unknown chunk {:?} ({} bytes) at offset {}",
                    String::from_utf8_lossy(tag),
                    len,
                    pos
                );
            }
            pos = end;
        }

        if tracks.len() != usize::from(declared_tracks) {
            warn!(
                "Header declares {} tracks but the file contains {}",
                declared_tracks,
                tracks.len()
            );
        }

        Ok(SmfFile {
            header: Header {
                format,
                declared_tracks,
                time_base,
            },
            tracks,
            data,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn track_bytes(&self, chunk: &TrackChunk) -> &[u8] {
        &self.data[chunk.start..chunk.end]
    }
}

fn chunk_end(data: &[u8], start: usize, len: usize) -> Result<usize> {
    let available = data.len().saturating_sub(start);
    if len > available {
        return Err(Error::TruncatedFile {
            offset: start,
            needed: len,
            available,
        });
    }
    Ok(start + len)
}

fn read_u32(data: &[u8], pos: usize) -> Result<u32> {
    let bytes = data.get(pos..pos + 4).ok_or(Error::TruncatedFile {
        offset: pos,
        needed: 4,
        available: data.len().saturating_sub(pos),
    })?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u16(data: &[u8], pos: usize) -> Result<u16> {
    let bytes = data.get(pos..pos + 2).ok_or(Error::TruncatedFile {
        offset: pos,
        needed: 2,
        available: data.len().saturating_sub(pos),
    })?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}
