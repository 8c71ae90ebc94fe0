//! Stream configuration.

use crate::error::RangeError;
use crate::frequency::{NTSC_CLOCK, PAL_CLOCK};

pub const MIN_SAMPLE_RATE: u32 = 2_000;
pub const MAX_SAMPLE_RATE: u32 = 200_000;

/// Output channel layout. The discriminant is the number of interleaved
/// bytes per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelMode {
    /// All four hardware channels mixed down.
    #[default]
    Mono = 1,
    /// Channels 0+3 left, 1+2 right.
    Stereo = 2,
    /// Every hardware channel unmixed.
    Quad = 4,
}

impl ChannelMode {
    pub fn channels(self) -> usize {
        self as usize
    }
}

/// Video standard of the emulated machine. Selects the audio clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VideoStandard {
    #[default]
    Pal,
    Ntsc,
}

impl VideoStandard {
    pub fn clock(self) -> f64 {
        match self {
            VideoStandard::Pal => PAL_CLOCK,
            VideoStandard::Ntsc => NTSC_CLOCK,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub channel_mode: ChannelMode,
    /// Master switch for the hardware low-pass filter. Row commands can
    /// turn the filter off but never on when this is false.
    pub allow_filter: bool,
    pub video: VideoStandard,
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), RangeError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(RangeError::SampleRate(self.sample_rate));
        }
        Ok(())
    }

    /// Interleaved bytes produced per frame.
    pub fn bytes_per_frame(&self) -> usize {
        self.channel_mode.channels()
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channel_mode: ChannelMode::Mono,
            allow_filter: true,
            video: VideoStandard::Pal,
        }
    }
}
