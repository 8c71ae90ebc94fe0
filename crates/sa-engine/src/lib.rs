//! Playback engine for the Sonic Arranger player.
//!
//! Emulates the four Amiga sample channels, sequences note rows onto them
//! and renders the result as 8-bit PCM through a buffered [`Stream`].

mod config;
mod envelope;
mod error;
mod filter;
mod frame;
mod frequency;
mod paula;
pub mod scheduler;
mod stream;
mod synth_fx;
mod track;

pub use config::{ChannelMode, StreamConfig, VideoStandard, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
pub use envelope::{ArpeggioState, VibratoState, WaveEnvelope};
pub use error::{RangeError, StreamError};
pub use filter::LowPassFilter;
pub use frame::{quantize, Frame};
pub use frequency::{
    clamp_period, fine_tune, note_to_period, period_to_rate, NTSC_CLOCK, PAL_CLOCK,
};
pub use paula::{DataKey, Paula, PaulaChannel, NUM_CHANNELS};
pub use scheduler::Scheduler;
pub use stream::{Stream, MAX_LOOPS, MAX_READ_MS};
pub use synth_fx::{FxOutcome, SynthFx};
pub use track::{RowOutcome, Track};
