//! The decoded module: every table a song needs for playback.

use crate::instrument::Instrument;
use crate::pattern::{Note, Voice, VOICES_PER_STEP};
use crate::sample::Sample;
use crate::song::Song;

/// Size of one wave table in bytes.
pub const WAVE_SIZE: usize = 128;
/// Size of the opaque editor state block.
pub const EDIT_DATA_SIZE: usize = 20;

/// A 128-byte table used as synth waveform, ADSR or AMF envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveTable {
    pub data: [u8; WAVE_SIZE],
}

impl WaveTable {
    pub fn new(data: [u8; WAVE_SIZE]) -> Self {
        Self { data }
    }

    /// Entry at `pos` as a signed value. Out-of-range positions read 0.
    pub fn signed(&self, pos: usize) -> i8 {
        self.data.get(pos).map_or(0, |&b| b as i8)
    }

    /// Entry at `pos` as an unsigned value. Out-of-range positions read 0.
    pub fn unsigned(&self, pos: usize) -> u8 {
        self.data.get(pos).copied().unwrap_or(0)
    }
}

impl Default for WaveTable {
    fn default() -> Self {
        Self { data: [0; WAVE_SIZE] }
    }
}

/// Which encoding a module was decoded from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceFormat {
    /// Chunked "SOAR" file written by the editor.
    #[default]
    Tagged,
    /// Offset-table layout found in replay binaries.
    Legacy,
}

/// A complete Sonic Arranger module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Module {
    pub format: SourceFormat,
    /// Four-character version tag, `V1.0` for legacy modules.
    pub version: [u8; 4],
    /// Author string. Only the legacy encoding stores one.
    pub author: Option<String>,
    pub songs: Vec<Song>,
    /// Pattern steps, four voices each.
    pub voices: Vec<Voice>,
    pub notes: Vec<Note>,
    pub instruments: Vec<Instrument>,
    pub samples: Vec<Sample>,
    pub waves: Vec<WaveTable>,
    pub adsr_waves: Vec<WaveTable>,
    pub amf_waves: Vec<WaveTable>,
    /// Editor cursor state. Never read during playback.
    pub edit_data: Option<[u8; EDIT_DATA_SIZE]>,
}

impl Module {
    pub const DEFAULT_VERSION: [u8; 4] = *b"V1.0";

    pub fn new() -> Self {
        Self {
            format: SourceFormat::Tagged,
            version: Self::DEFAULT_VERSION,
            author: None,
            songs: Vec::new(),
            voices: Vec::new(),
            notes: Vec::new(),
            instruments: Vec::new(),
            samples: Vec::new(),
            waves: Vec::new(),
            adsr_waves: Vec::new(),
            amf_waves: Vec::new(),
            edit_data: None,
        }
    }

    pub fn version_str(&self) -> &str {
        core::str::from_utf8(&self.version).unwrap_or("????")
    }

    /// Number of complete pattern steps.
    pub fn pattern_steps(&self) -> usize {
        self.voices.len() / VOICES_PER_STEP
    }

    /// Voice for `channel` at pattern step `step`.
    pub fn voice(&self, step: usize, channel: usize) -> Option<&Voice> {
        if channel >= VOICES_PER_STEP {
            return None;
        }
        self.voices.get(step * VOICES_PER_STEP + channel)
    }

    /// Row `row` of the given voice.
    pub fn note(&self, voice: &Voice, row: usize) -> Option<&Note> {
        self.notes.get(voice.note_address as usize + row)
    }

    /// Instrument by 0-based index.
    pub fn instrument(&self, index: usize) -> Option<&Instrument> {
        self.instruments.get(index)
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}
