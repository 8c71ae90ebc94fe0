//! Sampled sound data.

use arrayvec::ArrayString;

use crate::display_name;

/// Length of the NUL padded sample name field.
pub const SAMPLE_NAME_LEN: usize = 30;
/// Size of one encoded sample info record in bytes.
pub const SAMPLE_INFO_SIZE: usize = 38;

/// Per-sample metadata carried by the editable encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleInfo {
    /// Length in words.
    pub length: u16,
    /// Loop length in words.
    pub repeat: u16,
    pub name: [u8; SAMPLE_NAME_LEN],
    pub reserved: [u8; 4],
}

/// An 8-bit signed PCM sample.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sample {
    pub info: SampleInfo,
    pub data: Vec<u8>,
}

impl Sample {
    /// Wrap raw bytes that came without metadata (legacy encoding).
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let info = SampleInfo {
            length: (data.len() / 2).min(u16::MAX as usize) as u16,
            repeat: 1,
            ..Default::default()
        };
        Self { info, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn name(&self) -> ArrayString<SAMPLE_NAME_LEN> {
        display_name(&self.info.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_samples_get_word_length() {
        let s = Sample::from_bytes(vec![0; 301]);
        assert_eq!(s.info.length, 150);
        assert_eq!(s.info.repeat, 1);
        assert_eq!(s.len(), 301);
        assert!(s.name().is_empty());
    }
}
