//! Instrument definitions.

use arrayvec::ArrayString;

/// Size of one encoded instrument record in bytes.
pub const INSTRUMENT_SIZE: usize = 152;
/// Length of the NUL padded instrument name field.
pub const INSTRUMENT_NAME_LEN: usize = 30;
/// Arpeggio presets stored per instrument.
pub const ARPEGGIO_COUNT: usize = 3;
/// Step slots per arpeggio preset.
pub const ARPEGGIO_STEPS: usize = 14;

/// Wave manipulation run on a synth instrument's waveform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SynthEffect {
    NoEffect,
    WaveNegator,
    FreeNegator,
    RotateVertical,
    RotateHorizontal,
    AlienVoice,
    PolyNegator,
    ShackWave1,
    ShackWave2,
    Metawdrpk,
    LaserAmf,
    WaveAlias,
    NoiseGenerator,
    LowPassFilter1,
    LowPassFilter2,
    Oscillator1,
    NoiseGenerator2,
    FmDrum,
    /// Effect numbers past the known table are kept for re-encoding.
    Unknown(u16),
}

impl SynthEffect {
    pub fn from_number(n: u16) -> Self {
        match n {
            0 => Self::NoEffect,
            1 => Self::WaveNegator,
            2 => Self::FreeNegator,
            3 => Self::RotateVertical,
            4 => Self::RotateHorizontal,
            5 => Self::AlienVoice,
            6 => Self::PolyNegator,
            7 => Self::ShackWave1,
            8 => Self::ShackWave2,
            9 => Self::Metawdrpk,
            10 => Self::LaserAmf,
            11 => Self::WaveAlias,
            12 => Self::NoiseGenerator,
            13 => Self::LowPassFilter1,
            14 => Self::LowPassFilter2,
            15 => Self::Oscillator1,
            16 => Self::NoiseGenerator2,
            17 => Self::FmDrum,
            n => Self::Unknown(n),
        }
    }

    pub fn number(self) -> u16 {
        match self {
            Self::NoEffect => 0,
            Self::WaveNegator => 1,
            Self::FreeNegator => 2,
            Self::RotateVertical => 3,
            Self::RotateHorizontal => 4,
            Self::AlienVoice => 5,
            Self::PolyNegator => 6,
            Self::ShackWave1 => 7,
            Self::ShackWave2 => 8,
            Self::Metawdrpk => 9,
            Self::LaserAmf => 10,
            Self::WaveAlias => 11,
            Self::NoiseGenerator => 12,
            Self::LowPassFilter1 => 13,
            Self::LowPassFilter2 => 14,
            Self::Oscillator1 => 15,
            Self::NoiseGenerator2 => 16,
            Self::FmDrum => 17,
            Self::Unknown(n) => n,
        }
    }
}

impl Default for SynthEffect {
    fn default() -> Self {
        Self::NoEffect
    }
}

/// Vibrato settings. A raw delay of 255 or more disables vibrato.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Vibrato {
    pub delay: u16,
    pub speed: u16,
    pub level: u16,
}

impl Vibrato {
    /// Ticks to wait before the vibrato starts, or `None` when disabled.
    pub fn start_delay(&self) -> Option<u16> {
        (self.delay < 255).then_some(self.delay)
    }
}

/// Table-driven envelope (ADSR volume or AMF pitch).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Index into the ADSR or AMF wave table list.
    pub wave: u16,
    /// Ticks between two envelope steps.
    pub delay: u16,
    /// Entries played once.
    pub length: u16,
    /// Entries after `length` that loop. 0 holds the last value.
    pub repeat: u16,
}

/// One of an instrument's arpeggio presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Arpeggio {
    pub length: u8,
    pub repeat: u8,
    /// Semitone offsets.
    pub steps: [i8; ARPEGGIO_STEPS],
}

impl Arpeggio {
    /// Steps actually used by the preset (`length + repeat`, at most 14).
    pub fn active_steps(&self) -> &[i8] {
        let n = (self.length as usize + self.repeat as usize).min(ARPEGGIO_STEPS);
        &self.steps[..n]
    }

    pub fn is_empty(&self) -> bool {
        self.active_steps().is_empty()
    }
}

/// An instrument: either a sampled sound or a synthetic waveform.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instrument {
    /// Non-zero selects the synth waveform table instead of a sample.
    pub synth_mode: u16,
    /// Sample or synth wave index, depending on `synth_mode`.
    pub wave_index: u16,
    /// One-shot length in words.
    pub length: u16,
    /// Loop length in words. 0 loops the whole sound, 1 disables looping.
    pub repeat: u16,
    pub reserved_a: [u8; 8],
    /// 0-64.
    pub volume: u16,
    pub fine_tuning: i16,
    /// Glide speed in period units per tick, 0 = off.
    pub portamento: u16,
    pub vibrato: Vibrato,
    pub amf: Envelope,
    pub adsr: Envelope,
    /// ADSR position at which the envelope holds.
    pub sustain_point: u16,
    /// Ticks the envelope holds at the sustain point.
    pub sustain_value: u16,
    pub reserved_b: [u8; 16],
    pub effect: SynthEffect,
    /// Effect specific parameters. Most effects use them as start/stop
    /// positions inside the 128-byte wave.
    pub effect_args: [u16; 3],
    pub effect_delay: u16,
    pub arpeggios: [Arpeggio; ARPEGGIO_COUNT],
    pub name: [u8; INSTRUMENT_NAME_LEN],
}

impl Instrument {
    pub fn is_synth(&self) -> bool {
        self.synth_mode != 0
    }

    pub fn name(&self) -> ArrayString<INSTRUMENT_NAME_LEN> {
        crate::display_name(&self.name)
    }

    /// Clamped 0-64 playback volume.
    pub fn volume(&self) -> u8 {
        self.volume.min(64) as u8
    }

    /// Arpeggio preset for a note selector, `None` for empty presets.
    pub fn arpeggio(&self, selector: usize) -> Option<&Arpeggio> {
        self.arpeggios.get(selector).filter(|a| !a.is_empty())
    }
}
