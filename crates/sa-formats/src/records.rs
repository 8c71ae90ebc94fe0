//! Fixed-size big-endian records shared by both encodings.

use binrw::binrw;
use sa_ir::{
    Arpeggio, Envelope, Instrument, Note, SampleInfo, Song, SynthEffect, Vibrato, Voice,
    ARPEGGIO_STEPS, INSTRUMENT_NAME_LEN, SAMPLE_NAME_LEN,
};

#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SongRecord {
    speed: u16,
    pattern_length: u16,
    start_pos: u16,
    stop_pos: u16,
    repeat_pos: u16,
    irqps: u16,
}

impl From<SongRecord> for Song {
    fn from(r: SongRecord) -> Self {
        Song {
            speed: r.speed,
            pattern_length: r.pattern_length,
            start_pos: r.start_pos,
            stop_pos: r.stop_pos,
            repeat_pos: r.repeat_pos,
            irqps: r.irqps,
        }
    }
}

impl From<&Song> for SongRecord {
    fn from(s: &Song) -> Self {
        SongRecord {
            speed: s.speed,
            pattern_length: s.pattern_length,
            start_pos: s.start_pos,
            stop_pos: s.stop_pos,
            repeat_pos: s.repeat_pos,
            irqps: s.irqps,
        }
    }
}

#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct VoiceRecord {
    note_address: u16,
    sound_transpose: i8,
    note_transpose: i8,
}

impl From<VoiceRecord> for Voice {
    fn from(r: VoiceRecord) -> Self {
        Voice {
            note_address: r.note_address,
            sound_transpose: r.sound_transpose,
            note_transpose: r.note_transpose,
        }
    }
}

impl From<&Voice> for VoiceRecord {
    fn from(v: &Voice) -> Self {
        VoiceRecord {
            note_address: v.note_address,
            sound_transpose: v.sound_transpose,
            note_transpose: v.note_transpose,
        }
    }
}

#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NoteRecord {
    value: u8,
    instrument: u8,
    flags: u8,
    info: u8,
}

impl From<NoteRecord> for Note {
    fn from(r: NoteRecord) -> Self {
        Note {
            value: r.value,
            instrument: r.instrument,
            flags: r.flags,
            info: r.info,
        }
    }
}

impl From<&Note> for NoteRecord {
    fn from(n: &Note) -> Self {
        NoteRecord {
            value: n.value,
            instrument: n.instrument,
            flags: n.flags,
            info: n.info,
        }
    }
}

#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ArpeggioRecord {
    length: u8,
    repeat: u8,
    steps: [i8; ARPEGGIO_STEPS],
}

#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EnvelopeRecord {
    wave: u16,
    delay: u16,
    length: u16,
    repeat: u16,
}

/// The 152-byte instrument layout.
#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct InstrumentRecord {
    synth_mode: u16,
    wave_index: u16,
    length: u16,
    repeat: u16,
    reserved_a: [u8; 8],
    volume: u16,
    fine_tuning: i16,
    portamento: u16,
    vibrato_delay: u16,
    vibrato_speed: u16,
    vibrato_level: u16,
    amf: EnvelopeRecord,
    adsr: EnvelopeRecord,
    sustain_point: u16,
    sustain_value: u16,
    reserved_b: [u8; 16],
    effect_arg1: u16,
    effect: u16,
    effect_arg2: u16,
    effect_arg3: u16,
    effect_delay: u16,
    arpeggios: [ArpeggioRecord; 3],
    name: [u8; INSTRUMENT_NAME_LEN],
}

fn envelope(r: EnvelopeRecord) -> Envelope {
    Envelope {
        wave: r.wave,
        delay: r.delay,
        length: r.length,
        repeat: r.repeat,
    }
}

fn envelope_record(e: &Envelope) -> EnvelopeRecord {
    EnvelopeRecord {
        wave: e.wave,
        delay: e.delay,
        length: e.length,
        repeat: e.repeat,
    }
}

impl From<InstrumentRecord> for Instrument {
    fn from(r: InstrumentRecord) -> Self {
        Instrument {
            synth_mode: r.synth_mode,
            wave_index: r.wave_index,
            length: r.length,
            repeat: r.repeat,
            reserved_a: r.reserved_a,
            volume: r.volume,
            fine_tuning: r.fine_tuning,
            portamento: r.portamento,
            vibrato: Vibrato {
                delay: r.vibrato_delay,
                speed: r.vibrato_speed,
                level: r.vibrato_level,
            },
            amf: envelope(r.amf),
            adsr: envelope(r.adsr),
            sustain_point: r.sustain_point,
            sustain_value: r.sustain_value,
            reserved_b: r.reserved_b,
            effect: SynthEffect::from_number(r.effect),
            effect_args: [r.effect_arg1, r.effect_arg2, r.effect_arg3],
            effect_delay: r.effect_delay,
            arpeggios: r.arpeggios.map(|a| Arpeggio {
                length: a.length,
                repeat: a.repeat,
                steps: a.steps,
            }),
            name: r.name,
        }
    }
}

impl From<&Instrument> for InstrumentRecord {
    fn from(i: &Instrument) -> Self {
        InstrumentRecord {
            synth_mode: i.synth_mode,
            wave_index: i.wave_index,
            length: i.length,
            repeat: i.repeat,
            reserved_a: i.reserved_a,
            volume: i.volume,
            fine_tuning: i.fine_tuning,
            portamento: i.portamento,
            vibrato_delay: i.vibrato.delay,
            vibrato_speed: i.vibrato.speed,
            vibrato_level: i.vibrato.level,
            amf: envelope_record(&i.amf),
            adsr: envelope_record(&i.adsr),
            sustain_point: i.sustain_point,
            sustain_value: i.sustain_value,
            reserved_b: i.reserved_b,
            effect_arg1: i.effect_args[0],
            effect: i.effect.number(),
            effect_arg2: i.effect_args[1],
            effect_arg3: i.effect_args[2],
            effect_delay: i.effect_delay,
            arpeggios: i.arpeggios.map(|a| ArpeggioRecord {
                length: a.length,
                repeat: a.repeat,
                steps: a.steps,
            }),
            name: i.name,
        }
    }
}

/// The 38-byte sample info block of the SD8B chunk.
#[binrw]
#[brw(big)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SampleInfoRecord {
    length: u16,
    repeat: u16,
    name: [u8; SAMPLE_NAME_LEN],
    reserved: [u8; 4],
}

impl From<SampleInfoRecord> for SampleInfo {
    fn from(r: SampleInfoRecord) -> Self {
        SampleInfo {
            length: r.length,
            repeat: r.repeat,
            name: r.name,
            reserved: r.reserved,
        }
    }
}

impl From<&SampleInfo> for SampleInfoRecord {
    fn from(i: &SampleInfo) -> Self {
        SampleInfoRecord {
            length: i.length,
            repeat: i.repeat,
            name: i.name,
            reserved: i.reserved,
        }
    }
}
