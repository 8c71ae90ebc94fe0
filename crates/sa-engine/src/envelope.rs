//! Runtime state for the per-instrument modulators: ADSR and AMF wave
//! envelopes, vibrato and arpeggio.

use arrayvec::ArrayVec;
use sa_ir::{Arpeggio, Envelope, Vibrato, WaveTable, ARPEGGIO_STEPS, WAVE_SIZE};

/// Walks a 128-byte wave table as an envelope.
///
/// After `delay` ticks at the first entry the position advances once per
/// tick through `length + repeat` entries. Past the end it loops back to `length` when
/// `repeat` is non-zero, otherwise it holds the last entry.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveEnvelope {
    wave: usize,
    delay: u16,
    length: usize,
    total: usize,
    pos: usize,
    /// Ticks left before the first step.
    countdown: u16,
    /// Entry to pause on and the number of ticks left to pause there.
    sustain: Option<(usize, u16)>,
}

impl WaveEnvelope {
    /// `None` when the envelope covers no entries.
    pub fn new(env: &Envelope) -> Option<Self> {
        let total = (env.length as usize + env.repeat as usize).min(WAVE_SIZE);
        if total == 0 {
            return None;
        }
        Some(Self {
            wave: env.wave as usize,
            delay: env.delay,
            length: (env.length as usize).min(total),
            total,
            pos: 0,
            countdown: env.delay,
            sustain: None,
        })
    }

    /// Pause at entry `point` for `ticks` ticks the first time it is reached.
    pub fn with_sustain(mut self, point: u16, ticks: u16) -> Self {
        let point = point as usize;
        if ticks > 0 && point < self.total {
            self.sustain = Some((point, ticks));
        }
        self
    }

    pub fn wave(&self) -> usize {
        self.wave
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Switch to another table and start over.
    pub fn set_wave(&mut self, wave: usize) {
        self.wave = wave;
        self.pos = 0;
        self.countdown = self.delay;
    }

    pub fn advance(&mut self) {
        if let Some((point, ticks)) = self.sustain {
            if self.pos == point {
                self.sustain = (ticks > 1).then(|| (point, ticks - 1));
                return;
            }
        }
        if self.countdown > 0 {
            self.countdown -= 1;
            return;
        }
        self.pos += 1;
        if self.pos >= self.total {
            self.pos = if self.total > self.length {
                self.length
            } else {
                self.total - 1
            };
        }
    }

    /// Volume factor in `0..=64` read from `tables`. A missing table reads 64.
    pub fn volume(&self, tables: &[WaveTable]) -> u8 {
        tables
            .get(self.wave)
            .map_or(64, |t| t.unsigned(self.pos).min(64))
    }

    /// Signed period offset read from `tables`. A missing table reads 0.
    pub fn period_offset(&self, tables: &[WaveTable]) -> i32 {
        tables.get(self.wave).map_or(0, |t| t.signed(self.pos) as i32)
    }
}

/// Sine vibrato with an optional start delay.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VibratoState {
    /// Ticks left before the vibrato starts. `None` is off.
    delay: Option<u16>,
    speed: u16,
    level: u16,
    phase: u8,
}

impl VibratoState {
    pub fn new(vibrato: &Vibrato) -> Self {
        Self {
            delay: vibrato.start_delay(),
            speed: vibrato.speed,
            level: vibrato.level,
            phase: 0,
        }
    }

    /// Enable immediately with new parameters.
    pub fn set(&mut self, speed: u16, level: u16) {
        self.delay = Some(0);
        self.speed = speed;
        self.level = level;
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0;
    }

    pub fn is_enabled(&self) -> bool {
        self.delay.is_some()
    }

    /// Step one tick and return the period offset.
    pub fn advance(&mut self) -> i32 {
        match self.delay {
            None => 0,
            Some(d) if d > 0 => {
                self.delay = Some(d - 1);
                0
            }
            Some(_) => {
                // 256 phase steps per cycle
                self.phase = self.phase.wrapping_add(self.speed as u8);
                let angle = self.phase as f64 * core::f64::consts::TAU / 256.0;
                (angle.sin() * self.level as f64 / 16.0).round() as i32
            }
        }
    }
}

/// Steps through the semitone offsets of one arpeggio preset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArpeggioState {
    steps: ArrayVec<i8, ARPEGGIO_STEPS>,
    length: usize,
    pos: usize,
}

impl ArpeggioState {
    pub fn new(arp: Option<&Arpeggio>) -> Self {
        let Some(arp) = arp else {
            return Self::default();
        };
        let mut steps = ArrayVec::new();
        steps.extend(arp.active_steps().iter().copied());
        Self {
            length: (arp.length as usize).min(steps.len()),
            steps,
            pos: 0,
        }
    }

    /// Semitone offset for the current tick.
    pub fn current(&self) -> i8 {
        self.steps.get(self.pos).copied().unwrap_or(0)
    }

    pub fn advance(&mut self) {
        if self.steps.is_empty() {
            return;
        }
        self.pos += 1;
        if self.pos >= self.steps.len() {
            self.pos = if self.length < self.steps.len() { self.length } else { 0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> WaveTable {
        let mut data = [0u8; WAVE_SIZE];
        for (i, b) in data.iter_mut().enumerate() {
            *b = i as u8;
        }
        WaveTable::new(data)
    }

    fn env(delay: u16, length: u16, repeat: u16) -> Envelope {
        Envelope { wave: 0, delay, length, repeat }
    }

    fn positions(e: &mut WaveEnvelope, ticks: usize) -> Vec<usize> {
        (0..ticks)
            .map(|_| {
                e.advance();
                e.position()
            })
            .collect()
    }

    #[test]
    fn empty_envelope_is_off() {
        assert!(WaveEnvelope::new(&env(0, 0, 0)).is_none());
    }

    #[test]
    fn holds_last_entry_without_repeat() {
        let mut e = WaveEnvelope::new(&env(0, 3, 0)).unwrap();
        assert_eq!(positions(&mut e, 5), vec![1, 2, 2, 2, 2]);
    }

    #[test]
    fn loops_repeat_section() {
        let mut e = WaveEnvelope::new(&env(0, 2, 2)).unwrap();
        assert_eq!(positions(&mut e, 7), vec![1, 2, 3, 2, 3, 2, 3]);
    }

    #[test]
    fn delay_holds_start_once() {
        let mut e = WaveEnvelope::new(&env(2, 8, 0)).unwrap();
        assert_eq!(positions(&mut e, 8), vec![0, 0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn set_wave_rearms_delay() {
        let mut e = WaveEnvelope::new(&env(1, 8, 0)).unwrap();
        assert_eq!(positions(&mut e, 4), vec![0, 1, 2, 3]);
        e.set_wave(1);
        assert_eq!(positions(&mut e, 3), vec![0, 1, 2]);
    }

    #[test]
    fn sustain_pauses_once() {
        let mut e = WaveEnvelope::new(&env(0, 2, 3)).unwrap().with_sustain(1, 2);
        assert_eq!(positions(&mut e, 8), vec![1, 1, 1, 2, 3, 4, 2, 3]);
    }

    #[test]
    fn set_wave_restarts() {
        let mut e = WaveEnvelope::new(&env(0, 8, 0)).unwrap();
        positions(&mut e, 3);
        e.set_wave(2);
        assert_eq!(e.position(), 0);
        assert_eq!(e.wave(), 2);
    }

    #[test]
    fn reads_volume_and_offset() {
        let tables = [ramp()];
        let mut e = WaveEnvelope::new(&env(0, 128, 0)).unwrap();
        positions(&mut e, 100);
        assert_eq!(e.volume(&tables), 64);
        assert_eq!(e.period_offset(&tables), 100);
        e.set_wave(5);
        assert_eq!(e.volume(&tables), 64);
        assert_eq!(e.period_offset(&tables), 0);
    }

    #[test]
    fn vibrato_waits_for_delay() {
        let mut v = VibratoState::new(&Vibrato { delay: 2, speed: 64, level: 32 });
        assert_eq!(v.advance(), 0);
        assert_eq!(v.advance(), 0);
        // quarter cycle: sin = 1
        assert_eq!(v.advance(), 2);
        assert_eq!(v.advance(), 0);
        assert_eq!(v.advance(), -2);
    }

    #[test]
    fn disabled_vibrato_can_be_enabled() {
        let mut v = VibratoState::new(&Vibrato { delay: 255, speed: 64, level: 32 });
        assert!(!v.is_enabled());
        assert_eq!(v.advance(), 0);
        v.set(64, 160);
        assert_eq!(v.advance(), 10);
        v.reset_phase();
        assert_eq!(v.advance(), 10);
    }

    #[test]
    fn arpeggio_cycles_without_repeat() {
        let mut steps = [0i8; ARPEGGIO_STEPS];
        steps[..3].copy_from_slice(&[0, 4, 7]);
        let arp = Arpeggio { length: 3, repeat: 0, steps };
        let mut a = ArpeggioState::new(Some(&arp));
        let seen: Vec<i8> = (0..6)
            .map(|_| {
                let v = a.current();
                a.advance();
                v
            })
            .collect();
        assert_eq!(seen, vec![0, 4, 7, 0, 4, 7]);
    }

    #[test]
    fn arpeggio_loops_repeat_section() {
        let mut steps = [0i8; ARPEGGIO_STEPS];
        steps[..4].copy_from_slice(&[12, 0, 3, 5]);
        let arp = Arpeggio { length: 2, repeat: 2, steps };
        let mut a = ArpeggioState::new(Some(&arp));
        let seen: Vec<i8> = (0..7)
            .map(|_| {
                let v = a.current();
                a.advance();
                v
            })
            .collect();
        assert_eq!(seen, vec![12, 0, 3, 5, 3, 5, 3]);
    }

    #[test]
    fn no_arpeggio_is_flat() {
        let mut a = ArpeggioState::new(None);
        a.advance();
        assert_eq!(a.current(), 0);
    }
}
