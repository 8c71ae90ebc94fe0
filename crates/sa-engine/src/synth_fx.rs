//! Synth-instrument wave effects.
//!
//! Each synth voice owns a private copy of its 128-byte waveform. Every
//! `effect_delay + 1` ticks the instrument's effect rewrites a window of
//! that copy, or nudges the channel period, using the three effect
//! parameters. The window is `args[1]..=args[2]`; `args[0]` is the effect
//! amount or a wave table index, depending on the effect.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sa_ir::{Instrument, SynthEffect, WaveTable, WAVE_SIZE};
use tracing::warn;

/// What one effect step changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FxOutcome {
    /// The working wave was rewritten and must be reloaded.
    pub wave_changed: bool,
    /// Accumulated period offset to add to the channel period.
    pub period_offset: i32,
}

#[derive(Clone, Debug)]
pub struct SynthFx {
    effect: SynthEffect,
    amount: u16,
    steps_limit: u16,
    delay: u16,
    countdown: u16,
    start: usize,
    stop: usize,
    pos: usize,
    original: [u8; WAVE_SIZE],
    wave: [u8; WAVE_SIZE],
    period_offset: i32,
    steps: u16,
    toggled: bool,
    warned: bool,
    rng: StdRng,
}

impl SynthFx {
    pub fn new(inst: &Instrument, wave: [u8; WAVE_SIZE], seed: u64) -> Self {
        let last = WAVE_SIZE - 1;
        let a = (inst.effect_args[1] as usize).min(last);
        let b = (inst.effect_args[2] as usize).min(last);
        let (start, stop) = if a <= b { (a, b) } else { (b, a) };
        Self {
            effect: inst.effect,
            amount: inst.effect_args[0],
            steps_limit: inst.effect_args[2],
            delay: inst.effect_delay,
            countdown: 0,
            start,
            stop,
            pos: start,
            original: wave,
            wave,
            period_offset: 0,
            steps: 0,
            toggled: false,
            warned: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn effect(&self) -> SynthEffect {
        self.effect
    }

    /// The working wave.
    pub fn wave(&self) -> &[u8; WAVE_SIZE] {
        &self.wave
    }

    pub fn period_offset(&self) -> i32 {
        self.period_offset
    }

    /// Run one tick. `waves` is the module's synth wave table, used by
    /// the effects that mix in a second waveform.
    pub fn advance(&mut self, waves: &[WaveTable]) -> FxOutcome {
        if self.effect == SynthEffect::NoEffect {
            return self.outcome(false);
        }
        if self.countdown > 0 {
            self.countdown -= 1;
            return self.outcome(false);
        }
        self.countdown = self.delay;
        let changed = self.apply(waves);
        self.outcome(changed)
    }

    fn outcome(&self, wave_changed: bool) -> FxOutcome {
        FxOutcome { wave_changed, period_offset: self.period_offset }
    }

    fn window(&mut self) -> &mut [u8] {
        &mut self.wave[self.start..=self.stop]
    }

    fn step_pos(&mut self) {
        self.pos = if self.pos >= self.stop { self.start } else { self.pos + 1 };
    }

    fn other_wave(&self, waves: &[WaveTable]) -> WaveTable {
        waves.get(self.amount as usize).copied().unwrap_or_default()
    }

    fn apply(&mut self, waves: &[WaveTable]) -> bool {
        let pos = self.pos;
        match self.effect {
            SynthEffect::NoEffect => false,
            SynthEffect::WaveNegator => {
                self.wave[pos] = neg(self.wave[pos]);
                self.step_pos();
                true
            }
            SynthEffect::FreeNegator => {
                for i in self.start..=self.stop {
                    self.wave[i] = if i <= pos { neg(self.original[i]) } else { self.original[i] };
                }
                self.step_pos();
                true
            }
            SynthEffect::RotateVertical => {
                let delta = self.amount as u8;
                for b in self.window() {
                    *b = b.wrapping_add(delta);
                }
                true
            }
            SynthEffect::RotateHorizontal => {
                self.window().rotate_left(1);
                true
            }
            SynthEffect::AlienVoice => {
                let other = self.other_wave(waves);
                for i in self.start..=self.stop {
                    self.wave[i] = self.wave[i].wrapping_add(other.data[i]);
                }
                true
            }
            SynthEffect::PolyNegator => {
                self.poly_negate(pos);
                self.step_pos();
                true
            }
            SynthEffect::ShackWave1 => {
                self.shack(waves, pos);
                self.step_pos();
                true
            }
            SynthEffect::ShackWave2 => {
                self.shack(waves, pos);
                self.poly_negate(pos);
                self.step_pos();
                true
            }
            SynthEffect::Metawdrpk => {
                let other = self.other_wave(waves);
                let mut changed = false;
                for i in self.start..=self.stop {
                    let (cur, target) = (self.wave[i] as i8 as i16, other.data[i] as i8 as i16);
                    let next = cur + (target - cur).signum();
                    changed |= next != cur;
                    self.wave[i] = next as i8 as u8;
                }
                changed
            }
            SynthEffect::LaserAmf => {
                if self.steps < self.steps_limit {
                    self.steps += 1;
                    self.period_offset += self.amount as i16 as i32;
                }
                false
            }
            SynthEffect::WaveAlias => {
                for pair in self.window().chunks_exact_mut(2) {
                    pair.swap(0, 1);
                }
                true
            }
            SynthEffect::NoiseGenerator => {
                self.wave[pos] = self.rng.gen();
                self.step_pos();
                true
            }
            SynthEffect::LowPassFilter1 => {
                for i in self.start..self.stop {
                    let (a, b) = (self.wave[i] as i8 as i16, self.wave[i + 1] as i8 as i16);
                    self.wave[i] = ((a + b) / 2) as i8 as u8;
                }
                true
            }
            SynthEffect::LowPassFilter2 => {
                let prev = self.wave;
                for i in self.start + 1..self.stop {
                    let a = prev[i - 1] as i8 as i16;
                    let b = prev[i] as i8 as i16;
                    let c = prev[i + 1] as i8 as i16;
                    self.wave[i] = ((a + 2 * b + c) / 4) as i8 as u8;
                }
                true
            }
            SynthEffect::Oscillator1 => {
                self.toggled = !self.toggled;
                for i in self.start..=self.stop {
                    self.wave[i] = if self.toggled { neg(self.original[i]) } else { self.original[i] };
                }
                true
            }
            SynthEffect::NoiseGenerator2 => {
                let mut noise = [0u8; WAVE_SIZE];
                self.rng.fill(&mut noise[..]);
                let (start, stop) = (self.start, self.stop);
                self.wave[start..=stop].copy_from_slice(&noise[start..=stop]);
                true
            }
            SynthEffect::FmDrum => {
                self.period_offset += self.amount as i16 as i32;
                false
            }
            SynthEffect::Unknown(n) => {
                if !self.warned {
                    warn!(effect = n, "unknown synth effect, ignoring");
                    self.warned = true;
                }
                false
            }
        }
    }

    /// Restore the byte before `pos` and negate the one at `pos`.
    fn poly_negate(&mut self, pos: usize) {
        let prev = if pos > self.start { pos - 1 } else { self.stop };
        self.wave[prev] = self.original[prev];
        self.wave[pos] = neg(self.original[pos]);
    }

    fn shack(&mut self, waves: &[WaveTable], pos: usize) {
        let delta = self.other_wave(waves).data[pos];
        for b in self.window() {
            *b = b.wrapping_add(delta);
        }
    }
}

fn neg(b: u8) -> u8 {
    (b as i8).wrapping_neg() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth(effect: SynthEffect, args: [u16; 3], delay: u16) -> Instrument {
        Instrument {
            synth_mode: 1,
            effect,
            effect_args: args,
            effect_delay: delay,
            ..Default::default()
        }
    }

    fn ramp() -> [u8; WAVE_SIZE] {
        let mut w = [0u8; WAVE_SIZE];
        for (i, b) in w.iter_mut().enumerate() {
            *b = i as u8;
        }
        w
    }

    #[test]
    fn no_effect_leaves_wave_alone() {
        let mut fx = SynthFx::new(&synth(SynthEffect::NoEffect, [0, 0, 127], 0), ramp(), 1);
        let out = fx.advance(&[]);
        assert!(!out.wave_changed);
        assert_eq!(fx.wave(), &ramp());
    }

    #[test]
    fn delay_spaces_out_steps() {
        let mut fx = SynthFx::new(&synth(SynthEffect::RotateVertical, [1, 0, 0], 2), [0; WAVE_SIZE], 1);
        let changed: Vec<bool> = (0..6).map(|_| fx.advance(&[]).wave_changed).collect();
        assert_eq!(changed, vec![true, false, false, true, false, false]);
        assert_eq!(fx.wave()[0], 2);
        assert_eq!(fx.wave()[1], 0);
    }

    #[test]
    fn wave_negator_walks_the_window() {
        let mut fx = SynthFx::new(&synth(SynthEffect::WaveNegator, [0, 2, 3], 0), ramp(), 1);
        fx.advance(&[]);
        fx.advance(&[]);
        assert_eq!(&fx.wave()[..5], &[0, 1, 254, 253, 4]);
        // wraps back to the window start
        fx.advance(&[]);
        assert_eq!(fx.wave()[2], 2);
    }

    #[test]
    fn reversed_window_is_swapped() {
        let mut fx = SynthFx::new(&synth(SynthEffect::RotateHorizontal, [0, 3, 1], 0), ramp(), 1);
        fx.advance(&[]);
        assert_eq!(&fx.wave()[..5], &[0, 2, 3, 1, 4]);
    }

    #[test]
    fn poly_negator_restores_previous() {
        let mut fx = SynthFx::new(&synth(SynthEffect::PolyNegator, [0, 1, 3], 0), ramp(), 1);
        fx.advance(&[]);
        fx.advance(&[]);
        assert_eq!(&fx.wave()[..4], &[0, 1, 254, 3]);
    }

    #[test]
    fn alien_voice_mixes_other_wave() {
        let waves = [WaveTable::new([0; WAVE_SIZE]), WaveTable::new([10; WAVE_SIZE])];
        let mut fx = SynthFx::new(&synth(SynthEffect::AlienVoice, [1, 0, 1], 0), ramp(), 1);
        fx.advance(&waves);
        assert_eq!(&fx.wave()[..3], &[10, 11, 2]);
    }

    #[test]
    fn metawdrpk_converges() {
        let waves = [WaveTable::new([3; WAVE_SIZE])];
        let mut fx = SynthFx::new(&synth(SynthEffect::Metawdrpk, [0, 0, 127], 0), [0; WAVE_SIZE], 1);
        for _ in 0..3 {
            assert!(fx.advance(&waves).wave_changed);
        }
        assert!(!fx.advance(&waves).wave_changed);
        assert_eq!(fx.wave(), &[3; WAVE_SIZE]);
    }

    #[test]
    fn laser_amf_is_bounded() {
        let mut fx = SynthFx::new(&synth(SynthEffect::LaserAmf, [0xFFFE, 0, 3], 0), ramp(), 1);
        let mut last = FxOutcome::default();
        for _ in 0..10 {
            last = fx.advance(&[]);
            assert!(!last.wave_changed);
        }
        assert_eq!(last.period_offset, -6);
    }

    #[test]
    fn fm_drum_keeps_bending() {
        let mut fx = SynthFx::new(&synth(SynthEffect::FmDrum, [5, 0, 0], 1), ramp(), 1);
        for _ in 0..4 {
            fx.advance(&[]);
        }
        assert_eq!(fx.period_offset(), 10);
    }

    #[test]
    fn filters_smooth_a_spike() {
        let mut wave = [0u8; WAVE_SIZE];
        wave[4] = 100;
        let mut fx = SynthFx::new(&synth(SynthEffect::LowPassFilter2, [0, 0, 127], 0), wave, 1);
        fx.advance(&[]);
        assert_eq!(&fx.wave()[3..6], &[25, 50, 25]);

        let mut fx = SynthFx::new(&synth(SynthEffect::LowPassFilter1, [0, 0, 127], 0), wave, 1);
        fx.advance(&[]);
        assert_eq!(&fx.wave()[3..6], &[50, 50, 0]);
    }

    #[test]
    fn oscillator_alternates() {
        let mut fx = SynthFx::new(&synth(SynthEffect::Oscillator1, [0, 0, 127], 0), ramp(), 1);
        fx.advance(&[]);
        assert_eq!(fx.wave()[5], neg(5));
        fx.advance(&[]);
        assert_eq!(fx.wave(), &ramp());
    }

    #[test]
    fn noise_is_seeded_and_windowed() {
        let inst = synth(SynthEffect::NoiseGenerator2, [0, 10, 20], 0);
        let mut a = SynthFx::new(&inst, [0; WAVE_SIZE], 42);
        let mut b = SynthFx::new(&inst, [0; WAVE_SIZE], 42);
        a.advance(&[]);
        b.advance(&[]);
        assert_eq!(a.wave(), b.wave());
        assert!(a.wave()[..10].iter().all(|&x| x == 0));
        assert!(a.wave()[21..].iter().all(|&x| x == 0));
    }

    #[test]
    fn unknown_effect_is_inert() {
        let mut fx = SynthFx::new(&synth(SynthEffect::Unknown(77), [1, 0, 127], 0), ramp(), 1);
        for _ in 0..3 {
            assert_eq!(fx.advance(&[]), FxOutcome::default());
        }
        assert_eq!(fx.wave(), &ramp());
    }
}
