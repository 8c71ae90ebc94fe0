//! Emulation of the four hardware sample channels and the output stage.
//!
//! A channel plays a private copy of a byte range, stepping through it at
//! `clock / (2 * period)` bytes per second with linear interpolation
//! between neighbouring bytes. Running past the end of the copy is reported
//! back to the caller, who decides whether to reload, loop or stop.

use crate::config::{ChannelMode, VideoStandard};
use crate::error::RangeError;
use crate::filter::LowPassFilter;
use crate::frame::Frame;
use crate::frequency::period_to_rate;

/// Number of hardware channels.
pub const NUM_CHANNELS: usize = 4;

/// Identifies the bytes a channel was loaded from.
///
/// Whoever owns the source bumps `epoch` whenever those bytes change.
/// A reload with an unchanged key keeps the existing copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataKey {
    pub epoch: u64,
    pub offset: usize,
    pub len: usize,
}

/// State of one hardware channel.
#[derive(Clone, Debug, Default)]
pub struct PaulaChannel {
    buffer: Vec<i8>,
    loaded: Option<DataKey>,
    active: bool,
    period: u16,
    volume: u8,
    start_time: f64,
    index: usize,
    gamma: f64,
    restarted: bool,
}

impl PaulaChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start playback at time `t` from `key.offset` of `source`.
    ///
    /// The bytes are copied only when `key` differs from the last load.
    pub fn start(&mut self, source: &[u8], key: DataKey, t: f64) {
        if self.loaded != Some(key) {
            let end = key.offset.saturating_add(key.len).min(source.len());
            let begin = key.offset.min(end);
            self.buffer.clear();
            self.buffer.extend(source[begin..end].iter().map(|&b| b as i8));
            self.loaded = Some(key);
        }
        self.active = !self.buffer.is_empty();
        self.start_time = t;
        self.index = 0;
        self.gamma = 0.0;
        self.restarted = true;
    }

    /// Silence the channel until the next [`start`](Self::start).
    pub fn stop(&mut self) {
        self.active = false;
        self.index = 0;
        self.gamma = 0.0;
    }

    pub fn set_period(&mut self, period: u16) {
        self.period = period;
    }

    pub fn period(&self) -> u16 {
        self.period
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(64);
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn loaded_key(&self) -> Option<DataKey> {
        self.loaded
    }

    /// Length of the working copy in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Integer playback position and interpolation weight.
    pub fn position(&self) -> (usize, f64) {
        (self.index, self.gamma)
    }

    /// Refresh the playback position for time `t`.
    ///
    /// Returns `true` when the position ran past the end of the buffer. The
    /// caller then gets a chance to reload before [`settle`](Self::settle).
    pub fn update(&mut self, t: f64, clock: f64) -> bool {
        self.restarted = false;
        if !self.active || self.period < 1 || t < self.start_time {
            self.index = 0;
            self.gamma = 0.0;
            return false;
        }
        let pos = period_to_rate(self.period, clock) * (t - self.start_time);
        let whole = pos.floor();
        self.gamma = (pos - whole).clamp(0.0, 1.0);
        self.index = whole as usize;
        self.index >= self.buffer.len()
    }

    /// Resolve a finished pass. A channel restarted since [`update`](Self::update)
    /// keeps its new state; an active one wraps around and rebases its
    /// start time; a stopped one stays silent.
    pub fn settle(&mut self, t: f64, clock: f64) {
        if self.restarted {
            return;
        }
        if !self.active || self.buffer.is_empty() {
            self.stop();
            return;
        }
        self.index %= self.buffer.len();
        let rate = period_to_rate(self.period, clock);
        self.start_time = if rate > 0.0 {
            t - (self.index as f64 + self.gamma) / rate
        } else {
            t
        };
    }

    /// Current output, `volume * sample / 64` in `[-volume/64, volume/64]`.
    pub fn output(&self) -> f64 {
        if !self.active || self.period < 1 || self.buffer.is_empty() {
            return 0.0;
        }
        let len = self.buffer.len();
        let i = self.index.min(len - 1);
        let left = self.buffer[i] as f64 / 128.0;
        let right = self.buffer[(i + 1) % len] as f64 / 128.0;
        self.volume as f64 * (left + self.gamma * (right - left)) / 64.0
    }
}

/// The four channels, the output filters and global output state.
#[derive(Clone, Debug)]
pub struct Paula {
    channels: [PaulaChannel; NUM_CHANNELS],
    filters: [LowPassFilter; NUM_CHANNELS],
    clock: f64,
    allow_filter: bool,
    use_filter: bool,
    master_volume: u8,
}

impl Paula {
    pub fn new(video: VideoStandard, allow_filter: bool) -> Self {
        Self {
            channels: Default::default(),
            filters: Default::default(),
            clock: video.clock(),
            allow_filter,
            use_filter: true,
            master_volume: 64,
        }
    }

    pub fn reset(&mut self) {
        self.channels = Default::default();
        for f in &mut self.filters {
            f.reset();
        }
        self.use_filter = true;
        self.master_volume = 64;
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn channel(&self, index: usize) -> Result<&PaulaChannel, RangeError> {
        self.channels.get(index).ok_or(RangeError::TrackIndex(index))
    }

    pub fn channel_mut(&mut self, index: usize) -> Result<&mut PaulaChannel, RangeError> {
        self.channels.get_mut(index).ok_or(RangeError::TrackIndex(index))
    }

    /// Per-stream filter toggle; only effective when the filter is allowed.
    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.use_filter = enabled;
    }

    pub fn filtering(&self) -> bool {
        self.allow_filter && self.use_filter
    }

    pub fn set_master_volume(&mut self, volume: u8) {
        self.master_volume = volume.min(64);
    }

    pub fn master_volume(&self) -> u8 {
        self.master_volume
    }

    /// Refresh every channel's position for time `t`. The returned flags
    /// mark channels that ran past their buffer; each must be [`settle`](Self::settle)d.
    pub fn update(&mut self, t: f64) -> [bool; NUM_CHANNELS] {
        let clock = self.clock;
        let mut finished = [false; NUM_CHANNELS];
        for (flag, ch) in finished.iter_mut().zip(self.channels.iter_mut()) {
            *flag = ch.update(t, clock);
        }
        finished
    }

    pub fn settle(&mut self, index: usize, t: f64) {
        let clock = self.clock;
        if let Some(ch) = self.channels.get_mut(index) {
            ch.settle(t, clock);
        }
    }

    /// Mix the current channel outputs into one frame.
    pub fn render(&mut self, mode: ChannelMode) -> Frame {
        let master = self.master_volume as f64 / 64.0;
        let out: [f64; NUM_CHANNELS] = core::array::from_fn(|i| self.channels[i].output() * master);
        let mut frame = Frame::new();
        match mode {
            ChannelMode::Mono => {
                let mixed = out.iter().map(|v| 0.25 * v).sum();
                frame.push(self.filtered(0, mixed));
            }
            ChannelMode::Stereo => {
                let left = 0.5 * (out[0] + out[3]);
                let right = 0.5 * (out[1] + out[2]);
                frame.push(self.filtered(0, left));
                frame.push(self.filtered(1, right));
            }
            ChannelMode::Quad => {
                for (i, v) in out.into_iter().enumerate() {
                    frame.push(self.filtered(i, v));
                }
            }
        }
        frame
    }

    fn filtered(&mut self, filter: usize, value: f64) -> f64 {
        if self.filtering() {
            self.filters[filter].process(value)
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::PAL_CLOCK;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const KEY: DataKey = DataKey { epoch: 1, offset: 0, len: usize::MAX };

    /// Period at which a channel reads exactly `rate` bytes per second.
    fn period_for(rate: f64) -> u16 {
        (PAL_CLOCK / (2.0 * rate)).round() as u16
    }

    fn playing(bytes: &[u8], period: u16, volume: u8) -> PaulaChannel {
        let mut ch = PaulaChannel::new();
        ch.start(bytes, KEY, 0.0);
        ch.set_period(period);
        ch.set_volume(volume);
        ch
    }

    #[test]
    fn silent_without_data_or_period() {
        let mut ch = PaulaChannel::new();
        ch.set_period(428);
        ch.set_volume(64);
        assert!(!ch.update(0.5, PAL_CLOCK));
        assert_eq!(ch.output(), 0.0);

        let mut ch = playing(&[100, 100], 0, 64);
        assert!(!ch.update(0.5, PAL_CLOCK));
        assert_eq!(ch.output(), 0.0);
    }

    #[test]
    fn output_scales_by_volume() {
        let ch = playing(&[64, 64], 428, 32);
        // 64/128 * 32/64
        assert_abs_diff_eq!(ch.output(), 0.25);
    }

    #[test]
    fn interpolates_between_neighbours() {
        let mut ch = playing(&[0, 100, 0, 0], 428, 64);
        let rate = period_to_rate(428, PAL_CLOCK);
        ch.update(0.5 / rate, PAL_CLOCK);
        let (index, gamma) = ch.position();
        assert_eq!(index, 0);
        assert_abs_diff_eq!(gamma, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(ch.output(), 50.0 / 128.0, epsilon = 1e-9);
    }

    #[test]
    fn last_byte_interpolates_toward_first() {
        let mut ch = playing(&[100, 0, 0, 20], 428, 64);
        let rate = period_to_rate(428, PAL_CLOCK);
        ch.update(3.5 / rate, PAL_CLOCK);
        assert_eq!(ch.position().0, 3);
        assert_abs_diff_eq!(ch.output(), 60.0 / 128.0, epsilon = 1e-9);
    }

    #[test]
    fn magnitude_never_exceeds_volume() {
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
        for _ in 0..200 {
            let period = rng.gen_range(1..=u16::MAX);
            let volume = rng.gen_range(0..=64u8);
            let mut ch = playing(&data, period, volume);
            for step in 0..50 {
                let t = step as f64 * 0.0007;
                if ch.update(t, PAL_CLOCK) {
                    ch.settle(t, PAL_CLOCK);
                }
                let out = ch.output();
                assert!(
                    out.abs() <= volume as f64 / 64.0 + 1e-12,
                    "period {} volume {} gave {}",
                    period,
                    volume,
                    out
                );
            }
        }
    }

    #[test]
    fn finish_wraps_when_not_restarted() {
        let period = period_for(1000.0);
        let mut ch = playing(&[1, 2, 3, 4], period, 64);
        let rate = period_to_rate(period, PAL_CLOCK);
        let t = 5.25 / rate;
        assert!(ch.update(t, PAL_CLOCK));
        ch.settle(t, PAL_CLOCK);
        assert_eq!(ch.position().0, 1);
        assert!(ch.is_active());
        // continues from the rebased position
        assert!(!ch.update(t + 1.0 / rate, PAL_CLOCK));
        assert_eq!(ch.position().0, 2);
    }

    #[test]
    fn finish_after_stop_is_silent() {
        let mut ch = playing(&[50, 50], 428, 64);
        assert!(ch.update(1.0, PAL_CLOCK));
        ch.stop();
        ch.settle(1.0, PAL_CLOCK);
        assert!(!ch.is_active());
        assert_eq!(ch.output(), 0.0);
    }

    #[test]
    fn restart_in_finish_handler_wins() {
        let mut ch = playing(&[50, 50], 428, 64);
        assert!(ch.update(1.0, PAL_CLOCK));
        let key = DataKey { epoch: 2, offset: 1, len: 1 };
        ch.start(&[0, 9], key, 1.0);
        ch.settle(1.0, PAL_CLOCK);
        assert_eq!(ch.position(), (0, 0.0));
        assert_eq!(ch.len(), 1);
    }

    #[test]
    fn reload_with_same_key_keeps_copy() {
        let mut ch = playing(&[10, 20, 30], 428, 64);
        ch.start(&[99, 99, 99], KEY, 0.1);
        assert_abs_diff_eq!(ch.output(), 10.0 / 128.0);
        let fresh = DataKey { epoch: 2, ..KEY };
        ch.start(&[99, 99, 99], fresh, 0.2);
        assert_abs_diff_eq!(ch.output(), 99.0 / 128.0);
    }

    #[test]
    fn reload_copies_from_offset() {
        let mut ch = PaulaChannel::new();
        ch.start(&[1, 2, 3, 4, 5], DataKey { epoch: 0, offset: 3, len: 10 }, 0.0);
        assert_eq!(ch.len(), 2);
        ch.start(&[1, 2], DataKey { epoch: 1, offset: 5, len: 10 }, 0.0);
        assert!(ch.is_empty());
        assert!(!ch.is_active());
    }

    fn paula_with(values: [u8; 4], allow_filter: bool) -> Paula {
        let mut p = Paula::new(VideoStandard::Pal, allow_filter);
        for (i, v) in values.into_iter().enumerate() {
            let ch = p.channel_mut(i).unwrap();
            ch.start(&[v, v], KEY, 0.0);
            ch.set_period(428);
            ch.set_volume(64);
        }
        p
    }

    #[test]
    fn stereo_routes_lrrl() {
        let mut p = paula_with([64, 0, 32, 0], false);
        let frame = p.render(ChannelMode::Stereo);
        assert_abs_diff_eq!(frame.samples()[0], 0.25);
        assert_abs_diff_eq!(frame.samples()[1], 0.125);
    }

    #[test]
    fn mono_weights_each_channel_a_quarter() {
        let mut p = paula_with([64, 64, 64, 64], false);
        let frame = p.render(ChannelMode::Mono);
        assert_eq!(frame.samples().len(), 1);
        assert_abs_diff_eq!(frame.samples()[0], 0.5);
    }

    #[test]
    fn quad_keeps_channels_apart() {
        let mut p = paula_with([64, 0, 32, 16], false);
        let frame = p.render(ChannelMode::Quad);
        assert_eq!(frame.samples(), &[0.5, 0.0, 0.25, 0.125]);
    }

    #[test]
    fn master_volume_scales_output() {
        let mut p = paula_with([64, 64, 64, 64], false);
        p.set_master_volume(32);
        assert_abs_diff_eq!(p.render(ChannelMode::Mono).samples()[0], 0.25);
        p.set_master_volume(200);
        assert_eq!(p.master_volume(), 64);
    }

    #[test]
    fn filter_needs_both_switches() {
        let mut p = paula_with([127, 127, 127, 127], true);
        assert!(p.filtering());
        // first filtered sample of a step is far below the input
        assert!(p.render(ChannelMode::Mono).samples()[0] < 0.1);
        p.set_filter_enabled(false);
        assert!(!p.filtering());

        let mut p = paula_with([127, 127, 127, 127], false);
        p.set_filter_enabled(true);
        assert!(!p.filtering());
        assert!(p.render(ChannelMode::Mono).samples()[0] > 0.9);
    }

    #[test]
    fn track_index_is_checked() {
        let mut p = Paula::new(VideoStandard::Ntsc, true);
        assert!(p.channel(3).is_ok());
        assert_eq!(p.channel(4).unwrap_err(), RangeError::TrackIndex(4));
        assert!(p.channel_mut(9).is_err());
    }
}
