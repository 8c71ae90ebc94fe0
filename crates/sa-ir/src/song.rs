//! Song table entries and their timing helpers.

use core::ops::RangeInclusive;

/// Size of one encoded song record in bytes.
pub const SONG_SIZE: usize = 12;

/// One entry of the song table.
///
/// A module can hold several songs sharing the same pattern data; each one
/// selects a range of pattern steps and its own tempo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Song {
    /// Initial number of primary ticks per row (1-16).
    pub speed: u16,
    /// Rows per pattern step.
    pub pattern_length: u16,
    /// First pattern step played.
    pub start_pos: u16,
    /// Last pattern step played before looping or ending.
    pub stop_pos: u16,
    /// Step to continue from when looping.
    pub repeat_pos: u16,
    /// Primary interrupts per second (1-200).
    pub irqps: u16,
}

impl Song {
    /// Seconds between two primary interrupts.
    pub fn interrupt_delay(&self) -> f64 {
        1.0 / self.irqps as f64
    }

    /// Seconds one row lasts at the given speed.
    pub fn note_duration(&self, speed: u16) -> f64 {
        speed as f64 / self.irqps as f64
    }

    /// Rows played per second at the given speed.
    pub fn notes_per_second(&self, speed: u16) -> f64 {
        self.irqps as f64 / speed as f64
    }

    /// Pattern steps covered by one pass of the song.
    pub fn positions(&self) -> RangeInclusive<u16> {
        self.start_pos..=self.stop_pos
    }

    /// Step the sequencer returns to after passing `stop_pos` in loop mode.
    pub fn loop_target(&self) -> u16 {
        self.repeat_pos.min(self.stop_pos)
    }

    /// Rough length of one pass at the initial speed, ignoring jumps.
    pub fn pass_duration(&self) -> f64 {
        let steps = self.positions().count() as f64;
        steps * self.pattern_length as f64 * self.note_duration(self.speed)
    }
}
