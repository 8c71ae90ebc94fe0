//! Voices and notes: the pattern data of a module.

/// Size of one encoded voice record in bytes.
pub const VOICE_SIZE: usize = 4;
/// Size of one encoded note record in bytes.
pub const NOTE_SIZE: usize = 4;
/// Hardware channels, and so voices, per pattern step.
pub const VOICES_PER_STEP: usize = 4;

/// One channel's entry in a pattern step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Voice {
    /// Index of the first note of this voice in the note table.
    pub note_address: u16,
    /// Added to the instrument number of each note.
    pub sound_transpose: i8,
    /// Added to the pitch of each note.
    pub note_transpose: i8,
}

/// Row command carried in the low nibble of a note's flag byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NoteCommand {
    None = 0x0,
    SlideUp = 0x1,
    SetAdsrWave = 0x2,
    Unused3 = 0x3,
    ResetVibrato = 0x4,
    SetVibrato = 0x5,
    SetMasterVolume = 0x6,
    SetPortamento = 0x7,
    ClearPortamento = 0x8,
    Unused9 = 0x9,
    VolumeSlide = 0xA,
    PositionJump = 0xB,
    SetVolume = 0xC,
    PatternBreak = 0xD,
    DisableFilter = 0xE,
    SetSpeed = 0xF,
}

impl NoteCommand {
    /// Decode a command nibble. Only the low 4 bits are looked at.
    pub fn from_nibble(n: u8) -> Self {
        match n & 0x0F {
            0x0 => Self::None,
            0x1 => Self::SlideUp,
            0x2 => Self::SetAdsrWave,
            0x3 => Self::Unused3,
            0x4 => Self::ResetVibrato,
            0x5 => Self::SetVibrato,
            0x6 => Self::SetMasterVolume,
            0x7 => Self::SetPortamento,
            0x8 => Self::ClearPortamento,
            0x9 => Self::Unused9,
            0xA => Self::VolumeSlide,
            0xB => Self::PositionJump,
            0xC => Self::SetVolume,
            0xD => Self::PatternBreak,
            0xE => Self::DisableFilter,
            _ => Self::SetSpeed,
        }
    }
}

/// One row of a voice.
///
/// The flag byte is stored as read so that unknown bit patterns survive
/// re-encoding; accessors decode the individual fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Note {
    /// Pitch, 1-based into the period table. 0 means no new note.
    pub value: u8,
    /// 1-based instrument number. 0 keeps the current instrument.
    pub instrument: u8,
    /// Transpose suppression bits, arpeggio selector and command.
    pub flags: u8,
    /// Command argument.
    pub info: u8,
}

impl Note {
    const NO_SOUND_TRANSPOSE: u8 = 0x80;
    const NO_NOTE_TRANSPOSE: u8 = 0x40;

    pub fn command(&self) -> NoteCommand {
        NoteCommand::from_nibble(self.flags)
    }

    /// Arpeggio preset selected by this note, or `None` for selector 3.
    pub fn arpeggio(&self) -> Option<usize> {
        match (self.flags >> 4) & 0x03 {
            3 => None,
            n => Some(n as usize),
        }
    }

    pub fn disables_sound_transpose(&self) -> bool {
        self.flags & Self::NO_SOUND_TRANSPOSE != 0
    }

    pub fn disables_note_transpose(&self) -> bool {
        self.flags & Self::NO_NOTE_TRANSPOSE != 0
    }

    /// True if the row neither starts a note nor carries a command.
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.instrument == 0 && self.command() == NoteCommand::None
    }
}
