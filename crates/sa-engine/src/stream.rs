//! Buffered 8-bit PCM stream over one song.
//!
//! Rendering runs ahead of the reader into a ring buffer holding two
//! seconds of audio. The buffer is topped up whenever more than one second
//! of it has been consumed, using the loop flag of the read that triggered
//! the top-up. Reads and whole-song writes are serialised.

use std::io::Write;
use std::sync::Arc;

use arrayvec::ArrayVec;
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;
use sa_ir::Module;
use tracing::{debug, trace};

use crate::config::StreamConfig;
use crate::error::{RangeError, StreamError};
use crate::paula::NUM_CHANNELS;
use crate::scheduler::Scheduler;

/// Longest single read in milliseconds.
pub const MAX_READ_MS: u32 = 1_000;
/// Largest loop count accepted by the whole-song writers.
pub const MAX_LOOPS: u32 = 100;
/// Seconds of audio the ring buffer holds.
const BUFFER_SECONDS: usize = 2;

struct StreamState {
    scheduler: Scheduler,
    buffer: HeapRb<u8>,
    /// Bytes handed out since the last reset.
    consumed: u64,
    /// Whether anything has been rendered since the last reset.
    primed: bool,
}

impl StreamState {
    fn end_bytes(&self, bytes_per_frame: usize) -> Option<u64> {
        self.scheduler.end_frame().map(|f| f * bytes_per_frame as u64)
    }

    /// Render until the buffer is full or the song ends.
    ///
    /// The capacity and every read are whole frames, so a frame always fits
    /// once there is room for one.
    fn fill(&mut self, looping: bool) {
        let bytes_per_frame = self.scheduler.config().bytes_per_frame();
        let mut rendered = 0usize;
        while self.buffer.vacant_len() >= bytes_per_frame {
            let Some(frame) = self.scheduler.render_frame(looping) else {
                break;
            };
            let bytes: ArrayVec<u8, NUM_CHANNELS> = frame.to_signed().map(|s| s as u8).collect();
            let pushed = self.buffer.push_slice(&bytes);
            debug_assert_eq!(pushed, bytes.len(), "partial frame in stream buffer");
            rendered += 1;
        }
        self.primed = true;
        trace!(frames = rendered, buffered = self.buffer.occupied_len(), "filled stream buffer");
    }
}

/// A readable PCM stream for one song of a module.
pub struct Stream {
    module: Arc<Module>,
    song: usize,
    config: StreamConfig,
    state: Mutex<StreamState>,
    /// Held for the whole of a `write_*_to` call.
    write_lock: Mutex<()>,
}

impl Stream {
    /// Validates the song index, sample rate, interrupt rate and song speed.
    pub fn new(module: Arc<Module>, song: usize, config: StreamConfig) -> Result<Self, RangeError> {
        let scheduler = Scheduler::new(Arc::clone(&module), song, config)?;
        let capacity = BUFFER_SECONDS * config.sample_rate as usize * config.bytes_per_frame();
        debug!(song, rate = config.sample_rate, mode = ?config.channel_mode, "opened stream");
        Ok(Self {
            module,
            song,
            config,
            state: Mutex::new(StreamState {
                scheduler,
                buffer: HeapRb::new(capacity),
                consumed: 0,
                primed: false,
            }),
            write_lock: Mutex::new(()),
        })
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn song_index(&self) -> usize {
        self.song
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Rewind to the start of the song and drop buffered audio.
    pub fn reset(&self) -> Result<(), RangeError> {
        Self::reset_state(&mut self.state.lock())
    }

    fn reset_state(state: &mut StreamState) -> Result<(), RangeError> {
        state.scheduler.reset()?;
        state.buffer.clear();
        state.consumed = 0;
        state.primed = false;
        Ok(())
    }

    /// Number of times the song has looped since the last reset.
    pub fn loop_counter(&self) -> u32 {
        self.state.lock().scheduler.loop_counter()
    }

    /// Whether every byte up to the end boundary has been read.
    pub fn is_end_of_stream(&self) -> bool {
        let state = self.state.lock();
        Self::at_end(&state, self.config.bytes_per_frame())
    }

    /// Total bytes the stream yields, once the end boundary is known.
    pub fn end_of_stream_bytes(&self) -> Option<u64> {
        self.state.lock().end_bytes(self.config.bytes_per_frame())
    }

    fn at_end(state: &StreamState, bytes_per_frame: usize) -> bool {
        state.end_bytes(bytes_per_frame) == Some(state.consumed)
    }

    /// Read the next `ms` milliseconds of signed 8-bit PCM.
    ///
    /// Near the end of a non-looping song the result may be shorter than
    /// requested. Once every byte has been read, further reads fail with
    /// [`StreamError::EndOfStream`] until [`reset`](Self::reset).
    pub fn read_signed(&self, ms: u32, looping: bool) -> Result<Vec<u8>, StreamError> {
        let mut state = self.state.lock();
        self.read_locked(&mut state, ms, looping)
    }

    /// Like [`read_signed`](Self::read_signed) with silence at 128.
    pub fn read_unsigned(&self, ms: u32, looping: bool) -> Result<Vec<u8>, StreamError> {
        let mut data = self.read_signed(ms, looping)?;
        to_unsigned(&mut data);
        Ok(data)
    }

    fn read_locked(&self, state: &mut StreamState, ms: u32, looping: bool) -> Result<Vec<u8>, StreamError> {
        let bytes_per_frame = self.config.bytes_per_frame();
        if Self::at_end(state, bytes_per_frame) {
            return Err(StreamError::EndOfStream);
        }
        if ms > MAX_READ_MS {
            return Err(RangeError::ReadTooLong(ms).into());
        }
        if ms == 0 {
            return Ok(Vec::new());
        }

        let rate = self.config.sample_rate as usize;
        let frames = (rate * ms as usize + 999) / 1000;
        let wanted = frames * bytes_per_frame;
        let one_second = rate * bytes_per_frame;
        if !state.primed || state.buffer.vacant_len() > one_second || state.buffer.occupied_len() < wanted {
            state.fill(looping);
        }

        let mut data = vec![0u8; wanted.min(state.buffer.occupied_len())];
        let read = state.buffer.pop_slice(&mut data);
        data.truncate(read);
        state.consumed += read as u64;
        Ok(data)
    }

    /// Render the whole song as signed PCM into `sink`, looping at most
    /// `max_loops` times. With `reset` the stream is rewound first.
    pub fn write_signed_to<W: Write>(&self, sink: &mut W, max_loops: u32, reset: bool) -> Result<(), StreamError> {
        self.write_to(sink, max_loops, reset, false)
    }

    /// Like [`write_signed_to`](Self::write_signed_to) with silence at 128.
    pub fn write_unsigned_to<W: Write>(&self, sink: &mut W, max_loops: u32, reset: bool) -> Result<(), StreamError> {
        self.write_to(sink, max_loops, reset, true)
    }

    fn write_to<W: Write>(&self, sink: &mut W, max_loops: u32, reset: bool, unsigned: bool) -> Result<(), StreamError> {
        if max_loops > MAX_LOOPS {
            return Err(RangeError::LoopLimit(max_loops).into());
        }
        let _writer = self.write_lock.lock();
        let mut state = self.state.lock();
        if reset {
            Self::reset_state(&mut state)?;
        }
        state.scheduler.set_loop_limit(Some(max_loops));
        let result = self.drain(&mut state, sink, unsigned);
        state.scheduler.set_loop_limit(None);
        result
    }

    fn drain<W: Write>(&self, state: &mut StreamState, sink: &mut W, unsigned: bool) -> Result<(), StreamError> {
        let bytes_per_frame = self.config.bytes_per_frame();
        let mut written = 0u64;
        while !Self::at_end(state, bytes_per_frame) {
            let mut data = self.read_locked(state, MAX_READ_MS, true)?;
            if unsigned {
                to_unsigned(&mut data);
            }
            sink.write_all(&data)?;
            written += data.len() as u64;
        }
        debug!(bytes = written, loops = state.scheduler.loop_counter(), "wrote song");
        Ok(())
    }

    /// The whole song as signed PCM.
    pub fn to_signed_vec(&self, max_loops: u32, reset: bool) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        self.write_signed_to(&mut out, max_loops, reset)?;
        Ok(out)
    }

    /// The whole song as unsigned PCM.
    pub fn to_unsigned_vec(&self, max_loops: u32, reset: bool) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        self.write_unsigned_to(&mut out, max_loops, reset)?;
        Ok(out)
    }
}

fn to_unsigned(data: &mut [u8]) {
    for b in data {
        *b = b.wrapping_add(128);
    }
}
