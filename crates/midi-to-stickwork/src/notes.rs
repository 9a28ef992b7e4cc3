//! Mapping from General MIDI percussion notes to kit instrument codes

use serde::{Deserialize, Serialize};

use stickwork_core::Instrument;

/// GM Level 1 percussion key map, notes 35 through 81
const GM_PERCUSSION: [&str; 47] = [
    "Acoustic Bass Drum",
    "Bass Drum 1",
    "Side Stick",
    "Acoustic Snare",
    "Hand Clap",
    "Electric Snare",
    "Low Floor Tom",
    "Closed Hi-Hat",
    "High Floor Tom",
    "Pedal Hi-Hat",
    "Low Tom",
    "Open Hi-Hat",
    "Low-Mid Tom",
    "Hi-Mid Tom",
    "Crash Cymbal 1",
    "High Tom",
    "Ride Cymbal 1",
    "Chinese Cymbal",
    "Ride Bell",
    "Tambourine",
    "Splash Cymbal",
    "Cowbell",
    "Crash Cymbal 2",
    "Vibraslap",
    "Ride Cymbal 2",
    "Hi Bongo",
    "Low Bongo",
    "Mute Hi Conga",
    "Open Hi Conga",
    "Low Conga",
    "High Timbale",
    "Low Timbale",
    "High Agogo",
    "Low Agogo",
    "Cabasa",
    "Maracas",
    "Short Whistle",
    "Long Whistle",
    "Short Guiro",
    "Long Guiro",
    "Claves",
    "Hi Wood Block",
    "Low Wood Block",
    "Mute Cuica",
    "Open Cuica",
    "Mute Triangle",
    "Open Triangle",
];

/// Human-readable GM name of a percussion note, for logs
pub fn gm_drum_name(note: u8) -> &'static str {
    note.checked_sub(35)
        .and_then(|i| GM_PERCUSSION.get(usize::from(i)))
        .copied()
        .unwrap_or("Unknown Drum")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteBinding {
    pub note: u8,
    pub instrument: Instrument,
}

/// Note number to instrument code lookup. Unbound notes map to the empty code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMap {
    pub bindings: Vec<NoteBinding>,
}

impl NoteMap {
    /// Bindings for the robot's standard kit
    pub fn standard() -> Self {
        let pairs: [(u8, Instrument); 12] = [
            (38, Instrument::SNARE),
            (41, Instrument::FLOOR_TOM),
            (45, Instrument::MID_TOM),
            (47, Instrument::HIGH_TOM),
            (48, Instrument::HIGH_TOM),
            (50, Instrument::HIGH_TOM),
            (42, Instrument::HIHAT),
            (51, Instrument::RIDE),
            (49, Instrument::CRASH_RIGHT),
            (57, Instrument::CRASH_LEFT),
            (36, Instrument::BASS),
            (46, Instrument::HIHAT_OPEN),
        ];
        NoteMap {
            bindings: pairs
                .iter()
                .map(|&(note, instrument)| NoteBinding { note, instrument })
                .collect(),
        }
    }

    pub fn map(&self, note: u8) -> Instrument {
        self.bindings
            .iter()
            .find(|b| b.note == note)
            .map(|b| b.instrument)
            .unwrap_or(Instrument::EMPTY)
    }

    /// Bind `note`, replacing any earlier binding
    pub fn bind(&mut self, note: u8, instrument: Instrument) {
        match self.bindings.iter_mut().find(|b| b.note == note) {
            Some(binding) => binding.instrument = instrument,
            None => self.bindings.push(NoteBinding { note, instrument }),
        }
    }
}

impl Default for NoteMap {
    fn default() -> Self {
        NoteMap::standard()
    }
}
