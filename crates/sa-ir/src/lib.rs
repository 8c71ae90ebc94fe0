//! Core model types for the Sonic Arranger player.
//!
//! Both module encodings decode into the types defined here, and the
//! playback engine reads them without mutation. A decoded [`Module`] is
//! meant to be wrapped in an `Arc` and shared by every stream playing it.

mod instrument;
mod module;
mod pattern;
mod sample;
pub mod song;

pub use instrument::{
    Arpeggio, Envelope, Instrument, SynthEffect, Vibrato, ARPEGGIO_COUNT, ARPEGGIO_STEPS,
    INSTRUMENT_NAME_LEN, INSTRUMENT_SIZE,
};
pub use module::{Module, SourceFormat, WaveTable, EDIT_DATA_SIZE, WAVE_SIZE};
pub use pattern::{Note, NoteCommand, Voice, NOTE_SIZE, VOICES_PER_STEP, VOICE_SIZE};
pub use sample::{Sample, SampleInfo, SAMPLE_INFO_SIZE, SAMPLE_NAME_LEN};
pub use song::{Song, SONG_SIZE};

/// Decode a fixed-size, NUL padded name field for display.
///
/// Non-ASCII bytes are shown as `?`; the raw bytes stay untouched in the
/// owning record so re-encoding is exact.
pub fn display_name<const N: usize>(raw: &[u8; N]) -> arrayvec::ArrayString<N> {
    let mut name = arrayvec::ArrayString::new();
    for &b in raw.iter().take_while(|&&b| b != 0) {
        let c = if b.is_ascii() && !b.is_ascii_control() { b as char } else { '?' };
        name.push(c);
    }
    name
}
