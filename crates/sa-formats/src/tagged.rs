//! The chunked "SOAR" encoding.
//!
//! Layout: `SOAR`, a 4-byte version, then chunks until end of input. Each
//! chunk is a 4-byte tag followed by its payload; payloads carry their own
//! counts, there is no chunk length field.

use binrw::BinRead;
use sa_ir::{
    Module, SourceFormat, EDIT_DATA_SIZE, INSTRUMENT_SIZE, NOTE_SIZE, SONG_SIZE, VOICES_PER_STEP,
    VOICE_SIZE,
};
use std::io::{Cursor, Write};
use tracing::debug;

use crate::error::{FormatError, Result};
use crate::records::{InstrumentRecord, NoteRecord, SongRecord, VoiceRecord};
use crate::table::{
    read_count, read_records, read_samples, read_waves, remaining, write_count, write_records,
    write_samples, write_waves, Reader,
};
use crate::TAGGED_MAGIC;

pub(crate) fn decode(data: &[u8]) -> Result<Module> {
    let mut r: Reader = Cursor::new(data);
    r.set_position(TAGGED_MAGIC.len() as u64);

    let mut module = Module {
        format: SourceFormat::Tagged,
        version: <[u8; 4]>::read_be(&mut r)?,
        ..Module::new()
    };

    while remaining(&r) > 0 {
        let offset = r.position();
        let tag = <[u8; 4]>::read_be(&mut r)?;
        match &tag {
            b"STBL" => {
                let n = read_count(&mut r)?;
                module.songs = read_records::<SongRecord, _>(&mut r, n, SONG_SIZE)?;
            }
            b"OVTB" => {
                let steps = read_count(&mut r)?;
                let n = steps.saturating_mul(VOICES_PER_STEP);
                module.voices = read_records::<VoiceRecord, _>(&mut r, n, VOICE_SIZE)?;
            }
            b"NTBL" => {
                let n = read_count(&mut r)?;
                module.notes = read_records::<NoteRecord, _>(&mut r, n, NOTE_SIZE)?;
            }
            b"INST" => {
                let n = read_count(&mut r)?;
                module.instruments = read_records::<InstrumentRecord, _>(&mut r, n, INSTRUMENT_SIZE)?;
            }
            b"SD8B" => module.samples = read_samples(&mut r, true)?,
            b"SYWT" => {
                let n = read_count(&mut r)?;
                module.waves = read_waves(&mut r, n)?;
            }
            b"SYAR" => {
                let n = read_count(&mut r)?;
                module.adsr_waves = read_waves(&mut r, n)?;
            }
            b"SYAF" => {
                let n = read_count(&mut r)?;
                module.amf_waves = read_waves(&mut r, n)?;
            }
            b"EDAT" => module.edit_data = Some(<[u8; EDIT_DATA_SIZE]>::read_be(&mut r)?),
            _ => {
                return Err(FormatError::UnknownChunk {
                    tag: String::from_utf8_lossy(&tag).into_owned(),
                    offset,
                })
            }
        }
        debug!(
            tag = %String::from_utf8_lossy(&tag),
            offset,
            end = r.position(),
            "read chunk"
        );
    }

    debug!(
        songs = module.songs.len(),
        steps = module.pattern_steps(),
        notes = module.notes.len(),
        instruments = module.instruments.len(),
        samples = module.samples.len(),
        "decoded tagged module"
    );
    Ok(module)
}

/// Write every chunk in canonical order. Only whole pattern steps are
/// written to the voice table.
pub(crate) fn encode(module: &Module) -> Result<Vec<u8>> {
    let mut w = Cursor::new(Vec::new());
    w.write_all(&TAGGED_MAGIC)?;
    w.write_all(&module.version)?;

    w.write_all(b"STBL")?;
    write_count(&mut w, module.songs.len(), "song")?;
    write_records::<SongRecord, _, _>(&mut w, &module.songs)?;

    let steps = module.pattern_steps();
    w.write_all(b"OVTB")?;
    write_count(&mut w, steps, "voice")?;
    write_records::<VoiceRecord, _, _>(&mut w, &module.voices[..steps * VOICES_PER_STEP])?;

    w.write_all(b"NTBL")?;
    write_count(&mut w, module.notes.len(), "note")?;
    write_records::<NoteRecord, _, _>(&mut w, &module.notes)?;

    w.write_all(b"INST")?;
    write_count(&mut w, module.instruments.len(), "instrument")?;
    write_records::<InstrumentRecord, _, _>(&mut w, &module.instruments)?;

    w.write_all(b"SD8B")?;
    write_samples(&mut w, &module.samples)?;

    w.write_all(b"SYWT")?;
    write_waves(&mut w, &module.waves, "synth wave")?;
    w.write_all(b"SYAR")?;
    write_waves(&mut w, &module.adsr_waves, "ADSR wave")?;
    w.write_all(b"SYAF")?;
    write_waves(&mut w, &module.amf_waves, "AMF wave")?;

    if let Some(edit) = &module.edit_data {
        w.write_all(b"EDAT")?;
        w.write_all(edit)?;
    }

    Ok(w.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_ir::Song;

    fn header() -> Vec<u8> {
        let mut bytes = TAGGED_MAGIC.to_vec();
        bytes.extend_from_slice(b"V1.0");
        bytes
    }

    #[test]
    fn header_only_is_an_empty_module() {
        let module = decode(&header()).unwrap();
        assert_eq!(module.version_str(), "V1.0");
        assert!(module.songs.is_empty());
        assert!(module.samples.is_empty());
        assert!(module.waves.is_empty() && module.adsr_waves.is_empty() && module.amf_waves.is_empty());
        assert!(module.edit_data.is_none());
    }

    #[test]
    fn unknown_tag_reports_offset() {
        let mut bytes = header();
        bytes.extend_from_slice(b"STBL");
        bytes.extend_from_slice(&0i32.to_be_bytes());
        bytes.extend_from_slice(b"XXXX");
        match decode(&bytes) {
            Err(FormatError::UnknownChunk { tag, offset }) => {
                assert_eq!(tag, "XXXX");
                assert_eq!(offset, 16);
            }
            other => panic!("expected unknown chunk, got {:?}", other),
        }
    }

    #[test]
    fn truncated_tag_is_eof() {
        let mut bytes = header();
        bytes.extend_from_slice(b"ST");
        assert!(matches!(decode(&bytes), Err(FormatError::UnexpectedEof)));
    }

    #[test]
    fn truncated_song_table_is_eof() {
        let mut bytes = header();
        bytes.extend_from_slice(b"STBL");
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.extend_from_slice(&[0; 12]);
        assert!(matches!(decode(&bytes), Err(FormatError::UnexpectedEof)));
    }

    #[test]
    fn partial_pattern_step_is_dropped_on_encode() {
        let mut module = Module::new();
        module.songs.push(Song { speed: 6, irqps: 50, ..Default::default() });
        module.voices = vec![Default::default(); 6];
        let decoded = decode(&encode(&module).unwrap()).unwrap();
        assert_eq!(decoded.voices.len(), 4);
    }

    #[test]
    fn edit_data_is_written_only_when_present() {
        let mut module = Module::new();
        let without = encode(&module).unwrap();
        module.edit_data = Some([7; EDIT_DATA_SIZE]);
        let with = encode(&module).unwrap();
        assert_eq!(with.len(), without.len() + 4 + EDIT_DATA_SIZE);
        assert_eq!(decode(&with).unwrap().edit_data, Some([7; EDIT_DATA_SIZE]));
    }
}
