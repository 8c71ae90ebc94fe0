//! Row and interrupt scheduling.
//!
//! The scheduler owns the playback clock. Every output frame advances time
//! by `1 / sample_rate`; interrupts fire every `1 / irqps` seconds and a
//! new row is processed on every `speed`-th interrupt. Position overrides
//! from row commands are reconciled here, as are song loops and the
//! end-of-song boundary.

use std::sync::Arc;

use arrayvec::ArrayVec;
use sa_ir::{Module, Note, Song, Voice};
use tracing::debug;

use crate::config::StreamConfig;
use crate::error::RangeError;
use crate::frame::Frame;
use crate::paula::{Paula, NUM_CHANNELS};
use crate::track::Track;

/// Accepted interrupts per second.
pub const IRQPS_RANGE: core::ops::RangeInclusive<u16> = 1..=200;
/// Accepted song speeds.
pub const SPEED_RANGE: core::ops::RangeInclusive<u16> = 1..=16;

pub struct Scheduler {
    module: Arc<Module>,
    song: Song,
    config: StreamConfig,
    paula: Paula,
    tracks: ArrayVec<Track, NUM_CHANNELS>,
    frames: u64,
    interrupts: u64,
    speed: u16,
    pattern: usize,
    note_index: usize,
    division_tick: u64,
    /// Frame count at which output stops, once known.
    end_frame: Option<u64>,
    loop_counter: u32,
    loop_limit: Option<u32>,
}

impl Scheduler {
    pub fn new(module: Arc<Module>, song_index: usize, config: StreamConfig) -> Result<Self, RangeError> {
        config.validate()?;
        let song = *module.songs.get(song_index).ok_or(RangeError::SongIndex {
            index: song_index,
            count: module.songs.len(),
        })?;
        if !IRQPS_RANGE.contains(&song.irqps) {
            return Err(RangeError::InterruptRate(song.irqps));
        }
        let mut scheduler = Self {
            paula: Paula::new(config.video, config.allow_filter),
            tracks: ArrayVec::new(),
            module,
            song,
            config,
            frames: 0,
            interrupts: 0,
            speed: song.speed,
            pattern: song.start_pos as usize,
            note_index: 0,
            division_tick: 0,
            end_frame: None,
            loop_counter: 0,
            loop_limit: None,
        };
        scheduler.reset()?;
        Ok(scheduler)
    }

    /// Rewind to the start of the song. The loop limit is kept.
    pub fn reset(&mut self) -> Result<(), RangeError> {
        if !SPEED_RANGE.contains(&self.song.speed) {
            return Err(RangeError::SongSpeed(self.song.speed));
        }
        self.paula.reset();
        self.tracks.clear();
        for i in 0..NUM_CHANNELS {
            self.tracks.push(Track::new(i, Arc::clone(&self.module))?);
        }
        self.frames = 0;
        self.interrupts = 0;
        self.speed = self.song.speed;
        self.pattern = self.song.start_pos as usize;
        self.note_index = 0;
        self.division_tick = 0;
        self.end_frame = None;
        self.loop_counter = 0;
        Ok(())
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn paula(&self) -> &Paula {
        &self.paula
    }

    /// Frames rendered since the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn end_frame(&self) -> Option<u64> {
        self.end_frame
    }

    pub fn is_finished(&self) -> bool {
        self.end_frame.is_some_and(|end| self.frames >= end)
    }

    pub fn loop_counter(&self) -> u32 {
        self.loop_counter
    }

    /// Cap the number of loops taken while looping is requested.
    pub fn set_loop_limit(&mut self, limit: Option<u32>) {
        self.loop_limit = limit;
    }

    pub fn speed(&self) -> u16 {
        self.speed
    }

    /// Current pattern step and row.
    pub fn position(&self) -> (usize, usize) {
        (self.pattern, self.note_index)
    }

    fn play_time(&self) -> f64 {
        self.frames as f64 / self.config.sample_rate as f64
    }

    fn next_interrupt_time(&self) -> f64 {
        self.interrupts as f64 / self.song.irqps as f64
    }

    /// Produce the next frame, or `None` once the end boundary is reached.
    pub fn render_frame(&mut self, looping: bool) -> Option<Frame> {
        if self.is_finished() {
            return None;
        }
        let t = self.play_time();
        let process_tick = self.next_interrupt_time() <= t;

        if process_tick && self.end_frame.is_none() {
            let due = self.division_tick % self.speed as u64 == 0;
            self.division_tick += 1;
            if due {
                self.process_row(t, looping);
            }
        }

        let finished = self.paula.update(t);
        for (i, done) in finished.into_iter().enumerate() {
            if done {
                self.tracks[i].on_finished(&mut self.paula, t);
                self.paula.settle(i, t);
            }
        }

        if process_tick {
            for track in &mut self.tracks {
                track.tick(self.speed, &mut self.paula);
            }
            self.interrupts += 1;
        }

        let frame = self.paula.render(self.config.channel_mode);
        self.frames += 1;
        Some(frame)
    }

    fn process_row(&mut self, t: f64, looping: bool) {
        let row = (self.pattern, self.note_index);
        let mut next_note = None;
        let mut next_pattern = None;

        for (ch, track) in self.tracks.iter_mut().enumerate() {
            let (note, voice): (Note, Voice) = self
                .module
                .voice(self.pattern, ch)
                .map(|v| (self.module.note(v, self.note_index).copied().unwrap_or_default(), *v))
                .unwrap_or_default();
            track.play(&note, &voice, t, &mut self.paula);
            let outcome = track.command(&note, self.pattern, &mut self.speed, &mut self.paula);
            if outcome.next_note.is_some() {
                next_note = outcome.next_note;
            }
            if outcome.next_pattern.is_some() {
                next_pattern = outcome.next_pattern;
            }
        }

        match next_note {
            Some(n) => {
                self.note_index = n;
                if let Some(p) = next_pattern {
                    self.pattern = p;
                }
            }
            None => self.note_index += 1,
        }
        if self.note_index >= self.song.pattern_length as usize {
            self.note_index = 0;
            self.pattern = next_pattern.unwrap_or(self.pattern + 1);
        }

        let past_stop = self.pattern > self.song.stop_pos as usize;
        // a jump back to a row already played starts another pass
        let jumped_back = (next_note.is_some() || next_pattern.is_some()) && (self.pattern, self.note_index) <= row;
        if past_stop || jumped_back {
            if looping && self.loop_limit.map_or(true, |limit| self.loop_counter < limit) {
                self.loop_counter += 1;
                if past_stop {
                    self.pattern = self.song.loop_target() as usize;
                }
                debug!(loop_counter = self.loop_counter, pattern = self.pattern, "song looped");
            } else {
                let remaining = (self.song.note_duration(self.speed) * self.config.sample_rate as f64).floor() as u64;
                self.end_frame = Some(self.frames + remaining);
                debug!(frame = self.frames, remaining, "song ended");
            }
        }
    }
}
