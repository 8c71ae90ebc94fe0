//! Amiga periods and audio clocks.
//!
//! A channel reads `clock / (2 * period)` bytes per second, so a lower
//! period plays faster and higher.

/// PAL audio clock in Hz.
pub const PAL_CLOCK: f64 = 7_093_789.2;
/// NTSC audio clock in Hz.
pub const NTSC_CLOCK: f64 = 7_159_090.5;

/// Highest note number with a table entry.
pub const MAX_NOTE: i16 = 108;

/// Lowest period reachable through the table (highest pitch).
pub const PERIOD_MIN: u16 = 28;

/// Highest period reachable through the table (lowest pitch).
pub const PERIOD_MAX: u16 = 13696;

/// Period per note. Entry 0 is unused ("no note"); each following row is
/// one octave, highest period first.
#[rustfmt::skip]
const PERIODS: [u16; 109] = [
    0,
    13696, 12928, 12192, 11520, 10848, 10240, 9664, 9120, 8608, 8128, 7680, 7248,
    6848, 6464, 6096, 5760, 5424, 5120, 4832, 4560, 4304, 4064, 3840, 3624,
    3424, 3232, 3048, 2880, 2712, 2560, 2416, 2280, 2152, 2032, 1920, 1812,
    1712, 1616, 1524, 1440, 1356, 1280, 1208, 1140, 1076, 1016, 960, 906,
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453,
    428, 404, 381, 360, 339, 320, 302, 285, 269, 254, 240, 226,
    214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120, 113,
    107, 101, 95, 90, 85, 80, 75, 71, 67, 63, 60, 56,
    53, 50, 47, 45, 42, 40, 37, 35, 33, 31, 30, 28,
];

/// Period for a note number. Notes below 1 return 0; notes above the table
/// clamp to the highest note.
pub fn note_to_period(note: i16) -> u16 {
    if note < 1 {
        return 0;
    }
    PERIODS[note.min(MAX_NOTE) as usize]
}

/// Apply an instrument's fine tuning, in 1/16 semitone steps.
pub fn fine_tune(period: u16, fine: i16) -> u16 {
    if period == 0 || fine == 0 {
        return period;
    }
    let factor = 2f64.powf(-(fine as f64) / (12.0 * 16.0));
    clamp_period((period as f64 * factor).round() as i32)
}

/// Clamp a modulated period to the playable range.
pub fn clamp_period(period: i32) -> u16 {
    period.clamp(PERIOD_MIN as i32, PERIOD_MAX as i32) as u16
}

/// Bytes per second a channel consumes at `period`.
pub fn period_to_rate(period: u16, clock: f64) -> f64 {
    if period == 0 {
        return 0.0;
    }
    clock / (2.0 * period as f64)
}
