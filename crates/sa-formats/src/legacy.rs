//! The offset-table encoding found in replay binaries.
//!
//! The structure starts wherever the big-endian word `0x00000028` first
//! appears. That word is the song table offset and the head of an 8-entry
//! offset table, all relative to the structure base:
//! songs, voices, notes, instruments, synth waves, ADSR waves, AMF waves,
//! samples. Element counts come from the distance between consecutive
//! offsets. The sample table is followed by `deadbeef`, a zero word and
//! the bit-inverted, NUL-terminated author name.

use binrw::BinRead;
use sa_ir::{
    Module, SourceFormat, INSTRUMENT_SIZE, NOTE_SIZE, SONG_SIZE, VOICE_SIZE, WAVE_SIZE,
};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::{FormatError, Result};
use crate::records::{InstrumentRecord, NoteRecord, SongRecord, VoiceRecord};
use crate::table::{read_records, read_samples, read_waves, Reader};

/// Fixed offset of the song table, and the marker value scanned for.
const SONG_TABLE_OFFSET: u32 = 0x28;
const SENTINEL: &[u8; 8] = b"deadbeef";
const TABLE_NAMES: [&str; 8] = [
    "songs",
    "voices",
    "notes",
    "instruments",
    "synth waves",
    "ADSR waves",
    "AMF waves",
    "samples",
];

/// Byte offset of the first `0x00000028` word, scanning one byte at a time.
pub(crate) fn find_base(data: &[u8]) -> Option<usize> {
    let marker = SONG_TABLE_OFFSET.to_be_bytes();
    data.windows(4).position(|w| w == marker)
}

pub(crate) fn decode(data: &[u8]) -> Result<Module> {
    let base = find_base(data).ok_or(FormatError::MarkerNotFound)?;
    let mut r: Reader = Cursor::new(data);
    r.set_position(base as u64 + 4);

    let mut offsets = [SONG_TABLE_OFFSET; 8];
    for slot in offsets.iter_mut().skip(1) {
        *slot = u32::read_be(&mut r)?;
    }
    let _header_word = u16::read_be(&mut r)?;
    if u16::read_be(&mut r)? != 0xFFFF {
        return Err(FormatError::BadHeader);
    }
    let _reserved = u32::read_be(&mut r)?;

    for i in 1..offsets.len() {
        if offsets[i] < offsets[i - 1] {
            return Err(FormatError::NonMonotonicOffsets { table: TABLE_NAMES[i] });
        }
    }
    debug!(base, ?offsets, "legacy offset table");

    let span = |i: usize, size: usize| (offsets[i + 1] - offsets[i]) as usize / size;
    let base = base as u64;
    let seek = |r: &mut Reader, i: usize| -> Result<()> {
        let pos = base + offsets[i] as u64;
        if pos > r.get_ref().len() as u64 {
            return Err(FormatError::UnexpectedEof);
        }
        r.set_position(pos);
        Ok(())
    };

    seek(&mut r, 0)?;
    let songs = read_records::<SongRecord, _>(&mut r, span(0, SONG_SIZE), SONG_SIZE)?;
    seek(&mut r, 1)?;
    let voices = read_records::<VoiceRecord, _>(&mut r, span(1, VOICE_SIZE), VOICE_SIZE)?;
    seek(&mut r, 2)?;
    let notes = read_records::<NoteRecord, _>(&mut r, span(2, NOTE_SIZE), NOTE_SIZE)?;
    seek(&mut r, 3)?;
    let instruments =
        read_records::<InstrumentRecord, _>(&mut r, span(3, INSTRUMENT_SIZE), INSTRUMENT_SIZE)?;
    seek(&mut r, 4)?;
    let waves = read_waves(&mut r, span(4, WAVE_SIZE))?;
    seek(&mut r, 5)?;
    let adsr_waves = read_waves(&mut r, span(5, WAVE_SIZE))?;
    seek(&mut r, 6)?;
    let amf_waves = read_waves(&mut r, span(6, WAVE_SIZE))?;
    seek(&mut r, 7)?;
    let samples = read_samples(&mut r, false)?;

    let sentinel = <[u8; 8]>::read_be(&mut r).map_err(|_| FormatError::MissingSentinel)?;
    let zero = u32::read_be(&mut r).map_err(|_| FormatError::MissingSentinel)?;
    if &sentinel != SENTINEL || zero != 0 {
        return Err(FormatError::MissingSentinel);
    }
    let author = read_author(&mut r)?;

    if voices.len() % sa_ir::VOICES_PER_STEP != 0 {
        warn!(voices = voices.len(), "voice table does not end on a pattern step");
    }

    let module = Module {
        format: SourceFormat::Legacy,
        version: Module::DEFAULT_VERSION,
        author: Some(author),
        songs,
        voices,
        notes,
        instruments,
        samples,
        waves,
        adsr_waves,
        amf_waves,
        edit_data: None,
    };
    debug!(
        songs = module.songs.len(),
        steps = module.pattern_steps(),
        instruments = module.instruments.len(),
        samples = module.samples.len(),
        author = module.author.as_deref().unwrap_or(""),
        "decoded legacy module"
    );
    Ok(module)
}

/// Read the NOT-encoded author name up to its NUL terminator.
///
/// Encoded characters have their high bit set. The first byte without it
/// ends the name, but the scan continues to the terminator.
fn read_author(r: &mut Reader) -> Result<String> {
    let mut author = String::new();
    let mut reading = true;
    loop {
        let b = u8::read_be(r)?;
        if b == 0 {
            break;
        }
        if !reading {
            continue;
        }
        if b & 0x80 == 0 {
            reading = false;
        } else {
            author.push(char::from(!b));
        }
    }
    Ok(author)
}
