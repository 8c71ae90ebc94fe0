//! Per-channel note sequencer.
//!
//! A [`Track`] turns the note rows of one channel into register writes on
//! its [`PaulaChannel`](crate::paula::PaulaChannel): which bytes to play,
//! at what period and volume. Rows arrive through [`Track::play`] and
//! [`Track::command`]; [`Track::tick`] runs once per interrupt to advance
//! envelopes, slides and effects.

use std::sync::Arc;

use sa_ir::{Instrument, Module, Note, NoteCommand, Voice, WAVE_SIZE};
use tracing::{debug, warn};

use crate::envelope::{ArpeggioState, VibratoState, WaveEnvelope};
use crate::error::RangeError;
use crate::frequency::{clamp_period, fine_tune, note_to_period, MAX_NOTE, PERIOD_MAX, PERIOD_MIN};
use crate::paula::{DataKey, Paula, NUM_CHANNELS};
use crate::synth_fx::SynthFx;

/// Position overrides requested by a row command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowOutcome {
    pub next_note: Option<usize>,
    pub next_pattern: Option<usize>,
}

/// What the channel is fed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Silent,
    Sample {
        index: usize,
        repeat: u16,
        loop_offset: usize,
        loop_len: usize,
    },
    Synth {
        len: usize,
    },
}

#[derive(Clone, Debug)]
pub struct Track {
    index: usize,
    module: Arc<Module>,
    /// 0-based instrument kept across rows without an instrument number.
    instrument: Option<usize>,
    source: Source,
    fx: Option<SynthFx>,
    /// Bumped whenever the bytes behind `source` change.
    epoch: u64,
    pitch: i16,
    fine: i16,
    /// Base period before arpeggio, vibrato and AMF. 0 until the first note.
    period: i32,
    target: Option<i32>,
    portamento: u16,
    command_portamento: Option<u16>,
    volume: i32,
    adsr: Option<WaveEnvelope>,
    amf: Option<WaveEnvelope>,
    vibrato: VibratoState,
    arpeggio: ArpeggioState,
    slide: i32,
    volume_slide: i32,
    row_tick: u16,
}

impl Track {
    pub fn new(index: usize, module: Arc<Module>) -> Result<Self, RangeError> {
        if index >= NUM_CHANNELS {
            return Err(RangeError::TrackIndex(index));
        }
        Ok(Self {
            index,
            module,
            instrument: None,
            source: Source::Silent,
            fx: None,
            epoch: 0,
            pitch: 0,
            fine: 0,
            period: 0,
            target: None,
            portamento: 0,
            command_portamento: None,
            volume: 0,
            adsr: None,
            amf: None,
            vibrato: VibratoState::default(),
            arpeggio: ArpeggioState::default(),
            slide: 0,
            volume_slide: 0,
            row_tick: 0,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Current 0-based instrument.
    pub fn instrument(&self) -> Option<usize> {
        self.instrument
    }

    pub fn volume(&self) -> u8 {
        self.volume.clamp(0, 64) as u8
    }

    pub fn period(&self) -> i32 {
        self.period
    }

    /// Start a new row. A note value of 0 keeps the current sound playing.
    pub fn play(&mut self, note: &Note, voice: &Voice, t: f64, paula: &mut Paula) {
        self.slide = 0;
        self.volume_slide = 0;
        self.row_tick = 0;
        if note.value == 0 {
            return;
        }

        if note.instrument != 0 {
            let mut number = note.instrument as i32;
            if !note.disables_sound_transpose() {
                number += voice.sound_transpose as i32;
            }
            self.instrument = usize::try_from(number - 1).ok();
        }
        let module = Arc::clone(&self.module);
        let Some(inst) = self.instrument.and_then(|i| module.instrument(i)) else {
            debug!(track = self.index, instrument = ?self.instrument, "note without instrument");
            self.silence(paula);
            return;
        };

        let mut pitch = note.value as i16;
        if !note.disables_note_transpose() {
            pitch += voice.note_transpose as i16;
        }
        self.pitch = pitch.clamp(1, MAX_NOTE);
        self.fine = inst.fine_tuning;
        self.portamento = inst.portamento;
        let period = fine_tune(note_to_period(self.pitch), self.fine) as i32;
        if self.portamento_speed() > 0 && self.period > 0 {
            self.target = Some(period);
        } else {
            self.period = period;
            self.target = None;
        }

        self.volume = inst.volume() as i32;
        self.adsr = WaveEnvelope::new(&inst.adsr)
            .map(|e| e.with_sustain(inst.sustain_point, inst.sustain_value));
        self.amf = WaveEnvelope::new(&inst.amf);
        self.vibrato = VibratoState::new(&inst.vibrato);
        self.arpeggio = ArpeggioState::new(note.arpeggio().and_then(|s| inst.arpeggio(s)));
        self.trigger(&module, inst, t, paula);
    }

    fn trigger(&mut self, module: &Module, inst: &Instrument, t: f64, paula: &mut Paula) {
        let Ok(channel) = paula.channel_mut(self.index) else {
            return;
        };
        let wave_index = inst.wave_index as usize;

        if inst.is_synth() {
            let wave = module.waves.get(wave_index).map_or([0; WAVE_SIZE], |w| w.data);
            let len = match (inst.length as usize * 2).min(WAVE_SIZE) {
                0 => WAVE_SIZE,
                n => n,
            };
            self.epoch += 1;
            let fx = SynthFx::new(inst, wave, self.epoch ^ self.index as u64);
            channel.start(fx.wave(), DataKey { epoch: self.epoch, offset: 0, len }, t);
            self.fx = Some(fx);
            self.source = Source::Synth { len };
            return;
        }

        self.fx = None;
        let Some(sample) = module.samples.get(wave_index) else {
            debug!(track = self.index, sample = wave_index, "instrument points at a missing sample");
            channel.stop();
            self.source = Source::Silent;
            return;
        };
        let len = inst.length as usize * 2;
        let loop_len = inst.repeat as usize * 2;
        let first = match len + loop_len {
            0 => sample.data.len(),
            n => n,
        };
        if !matches!(self.source, Source::Sample { index, .. } if index == wave_index) {
            self.epoch += 1;
        }
        channel.start(&sample.data, DataKey { epoch: self.epoch, offset: 0, len: first }, t);
        self.source = Source::Sample {
            index: wave_index,
            repeat: inst.repeat,
            loop_offset: len,
            loop_len,
        };
    }

    fn silence(&mut self, paula: &mut Paula) {
        if let Ok(channel) = paula.channel_mut(self.index) {
            channel.stop();
        }
        self.source = Source::Silent;
        self.fx = None;
    }

    /// Apply the row command of `note`. `pattern` is the current pattern
    /// index; `speed` is the song speed and may be changed.
    pub fn command(&mut self, note: &Note, pattern: usize, speed: &mut u16, paula: &mut Paula) -> RowOutcome {
        let info = note.info;
        let mut outcome = RowOutcome::default();
        match note.command() {
            NoteCommand::None | NoteCommand::Unused3 | NoteCommand::Unused9 => {}
            NoteCommand::SlideUp => self.slide = info as i32,
            NoteCommand::SetAdsrWave => {
                if let Some(adsr) = &mut self.adsr {
                    adsr.set_wave(info as usize);
                }
            }
            NoteCommand::ResetVibrato => self.vibrato.reset_phase(),
            NoteCommand::SetVibrato => self.vibrato.set((info >> 4) as u16, (info & 0x0F) as u16 * 16),
            NoteCommand::SetMasterVolume => paula.set_master_volume(info),
            NoteCommand::SetPortamento => self.command_portamento = Some(info as u16),
            NoteCommand::ClearPortamento => {
                self.command_portamento = None;
                if let Some(target) = self.target.take() {
                    self.period = target;
                }
            }
            NoteCommand::VolumeSlide => self.volume_slide = info as i8 as i32,
            NoteCommand::PositionJump => {
                outcome.next_note = Some(0);
                outcome.next_pattern = Some(info as usize);
            }
            NoteCommand::SetVolume => self.volume = info.min(64) as i32,
            NoteCommand::PatternBreak => {
                outcome.next_note = Some(info as usize);
                outcome.next_pattern = Some(pattern + 1);
            }
            NoteCommand::DisableFilter => paula.set_filter_enabled(false),
            NoteCommand::SetSpeed => {
                if (1..=16).contains(&info) {
                    *speed = info as u16;
                } else {
                    warn!(track = self.index, speed = info, "ignoring out-of-range speed");
                }
            }
        }
        outcome
    }

    fn portamento_speed(&self) -> u16 {
        self.command_portamento.unwrap_or(self.portamento)
    }

    fn glide(&mut self) {
        let Some(target) = self.target else {
            return;
        };
        let step = self.portamento_speed() as i32;
        self.period = if step == 0 {
            target
        } else if self.period < target {
            (self.period + step).min(target)
        } else {
            (self.period - step).max(target)
        };
        if self.period == target {
            self.target = None;
        }
    }

    /// Advance one interrupt and write period and volume to the channel.
    pub fn tick(&mut self, speed: u16, paula: &mut Paula) {
        let first = self.row_tick % speed.max(1) == 0;
        self.row_tick = self.row_tick.wrapping_add(1);
        if self.period == 0 {
            return;
        }
        let module = Arc::clone(&self.module);

        let mut fx_offset = 0;
        if let Some(fx) = &mut self.fx {
            let out = fx.advance(&module.waves);
            if out.wave_changed {
                self.epoch += 1;
            }
            fx_offset = out.period_offset;
        }

        if !first {
            self.period = (self.period - self.slide).clamp(PERIOD_MIN as i32, PERIOD_MAX as i32);
            self.volume = (self.volume + self.volume_slide).clamp(0, 64);
        }
        self.glide();

        let base = fine_tune(note_to_period(self.pitch), self.fine) as i32;
        let arp_pitch = (self.pitch + self.arpeggio.current() as i16).clamp(1, MAX_NOTE);
        let arp_delta = fine_tune(note_to_period(arp_pitch), self.fine) as i32 - base;
        let amf = self.amf.as_ref().map_or(0, |e| e.period_offset(&module.amf_waves));
        let adsr = self.adsr.as_ref().map_or(64, |e| e.volume(&module.adsr_waves) as i32);
        let vibrato = self.vibrato.advance();

        self.arpeggio.advance();
        if let Some(e) = &mut self.adsr {
            e.advance();
        }
        if let Some(e) = &mut self.amf {
            e.advance();
        }

        if let Ok(channel) = paula.channel_mut(self.index) {
            channel.set_period(clamp_period(self.period + arp_delta + vibrato + amf + fx_offset));
            channel.set_volume((self.volume.clamp(0, 64) * adsr / 64) as u8);
        }
    }

    /// Handle the channel running past its buffer at time `t`.
    pub fn on_finished(&mut self, paula: &mut Paula, t: f64) {
        let Ok(channel) = paula.channel_mut(self.index) else {
            return;
        };
        match self.source {
            Source::Silent => channel.stop(),
            Source::Sample { repeat: 0, .. } => {}
            Source::Sample { repeat: 1, .. } => channel.stop(),
            Source::Sample { index, loop_offset, loop_len, .. } => {
                let Some(sample) = self.module.samples.get(index) else {
                    channel.stop();
                    return;
                };
                let key = DataKey { epoch: self.epoch, offset: loop_offset, len: loop_len };
                if channel.loaded_key() != Some(key) {
                    channel.start(&sample.data, key, t);
                }
            }
            Source::Synth { len } => {
                let Some(fx) = &self.fx else {
                    channel.stop();
                    return;
                };
                let key = DataKey { epoch: self.epoch, offset: 0, len };
                if channel.loaded_key() != Some(key) {
                    channel.start(fx.wave(), key, t);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VideoStandard;
    use sa_ir::{Envelope, Sample, SynthEffect, WaveTable};

    fn module() -> Arc<Module> {
        let mut m = Module::new();
        // 1: looping sample, 2: one-shot with loop section, 3: one-shot, 4: synth,
        // 5: one-shot over part of a sample
        m.instruments.push(Instrument { wave_index: 0, length: 4, repeat: 0, volume: 40, ..Default::default() });
        m.instruments.push(Instrument { wave_index: 0, length: 2, repeat: 2, volume: 64, ..Default::default() });
        m.instruments.push(Instrument { wave_index: 1, length: 1, repeat: 1, volume: 64, ..Default::default() });
        m.instruments.push(Instrument {
            synth_mode: 1,
            wave_index: 0,
            length: 8,
            volume: 64,
            effect: SynthEffect::WaveNegator,
            effect_args: [0, 0, 15],
            ..Default::default()
        });
        m.instruments.push(Instrument { wave_index: 0, length: 2, repeat: 1, volume: 64, ..Default::default() });
        m.samples.push(Sample::from_bytes((0..8u8).map(|i| i * 10).collect()));
        m.samples.push(Sample::from_bytes(vec![50, 60]));
        m.waves.push(WaveTable::new([20; WAVE_SIZE]));
        Arc::new(m)
    }

    fn note(value: u8, instrument: u8, flags: u8, info: u8) -> Note {
        Note { value, instrument, flags, info }
    }

    fn setup() -> (Track, Paula) {
        (Track::new(0, module()).unwrap(), Paula::new(VideoStandard::Pal, false))
    }

    #[test]
    fn rejects_bad_index() {
        assert_eq!(Track::new(4, module()).unwrap_err(), RangeError::TrackIndex(4));
    }

    #[test]
    fn note_starts_sample() {
        let (mut track, mut paula) = setup();
        track.play(&note(37, 1, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.tick(6, &mut paula);
        let ch = paula.channel(0).unwrap();
        assert!(ch.is_active());
        assert_eq!(ch.len(), 8);
        assert_eq!(ch.period(), note_to_period(37));
        assert_eq!(ch.volume(), 40);
    }

    #[test]
    fn transposes_apply_unless_disabled() {
        let (mut track, mut paula) = setup();
        let voice = Voice { note_address: 0, sound_transpose: 1, note_transpose: 12 };
        track.play(&note(13, 1, 0, 0), &voice, 0.0, &mut paula);
        assert_eq!(track.instrument(), Some(1));
        assert_eq!(track.period(), note_to_period(25) as i32);

        track.play(&note(13, 1, 0x80 | 0x40, 0), &voice, 0.0, &mut paula);
        assert_eq!(track.instrument(), Some(0));
        assert_eq!(track.period(), note_to_period(13) as i32);
    }

    #[test]
    fn empty_note_keeps_playing() {
        let (mut track, mut paula) = setup();
        track.play(&note(37, 1, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.play(&note(0, 3, 0, 0), &Voice::default(), 0.1, &mut paula);
        assert_eq!(track.instrument(), Some(0));
        assert!(paula.channel(0).unwrap().is_active());
    }

    #[test]
    fn missing_instrument_silences() {
        let (mut track, mut paula) = setup();
        track.play(&note(37, 1, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.play(&note(37, 9, 0, 0), &Voice::default(), 0.1, &mut paula);
        assert!(!paula.channel(0).unwrap().is_active());
    }

    #[test]
    fn one_shot_stops_after_pass() {
        let (mut track, mut paula) = setup();
        track.play(&note(37, 3, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.tick(6, &mut paula);
        let finished = paula.update(1.0);
        assert!(finished[0]);
        track.on_finished(&mut paula, 1.0);
        paula.settle(0, 1.0);
        assert!(!paula.channel(0).unwrap().is_active());
    }

    #[test]
    fn one_shot_first_pass_covers_repeat_words() {
        let (mut track, mut paula) = setup();
        track.play(&note(37, 5, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.tick(6, &mut paula);
        // (length + repeat) words
        assert_eq!(paula.channel(0).unwrap().len(), 6);
        assert!(paula.update(1.0)[0]);
        track.on_finished(&mut paula, 1.0);
        paula.settle(0, 1.0);
        assert!(!paula.channel(0).unwrap().is_active());
    }

    #[test]
    fn loop_section_follows_first_pass() {
        let (mut track, mut paula) = setup();
        track.play(&note(37, 2, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.tick(6, &mut paula);
        assert_eq!(paula.channel(0).unwrap().len(), 8);
        assert!(paula.update(1.0)[0]);
        track.on_finished(&mut paula, 1.0);
        paula.settle(0, 1.0);
        let ch = paula.channel(0).unwrap();
        assert!(ch.is_active());
        assert_eq!(ch.len(), 4);
        assert_eq!(ch.loaded_key().map(|k| k.offset), Some(4));
    }

    #[test]
    fn whole_buffer_loop_wraps() {
        let (mut track, mut paula) = setup();
        track.play(&note(37, 1, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.tick(6, &mut paula);
        let key = paula.channel(0).unwrap().loaded_key();
        assert!(paula.update(1.0)[0]);
        track.on_finished(&mut paula, 1.0);
        paula.settle(0, 1.0);
        let ch = paula.channel(0).unwrap();
        assert!(ch.is_active());
        assert_eq!(ch.loaded_key(), key);
        assert!(ch.position().0 < 8);
    }

    #[test]
    fn synth_reloads_changed_wave() {
        let (mut track, mut paula) = setup();
        track.play(&note(37, 4, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.tick(6, &mut paula);
        assert_eq!(paula.channel(0).unwrap().len(), 16);
        let before = paula.channel(0).unwrap().loaded_key();
        assert!(paula.update(1.0)[0]);
        track.on_finished(&mut paula, 1.0);
        paula.settle(0, 1.0);
        let after = paula.channel(0).unwrap().loaded_key();
        assert_ne!(before, after);
        // negated first byte
        assert!(paula.channel(0).unwrap().output() < 0.0);
    }

    #[test]
    fn row_commands() {
        let (mut track, mut paula) = setup();
        let mut speed = 6;
        assert_eq!(
            track.command(&note(0, 0, 0x0B, 7), 2, &mut speed, &mut paula),
            RowOutcome { next_note: Some(0), next_pattern: Some(7) }
        );
        assert_eq!(
            track.command(&note(0, 0, 0x0D, 5), 2, &mut speed, &mut paula),
            RowOutcome { next_note: Some(5), next_pattern: Some(3) }
        );
        track.command(&note(0, 0, 0x0F, 3), 0, &mut speed, &mut paula);
        assert_eq!(speed, 3);
        track.command(&note(0, 0, 0x0F, 0), 0, &mut speed, &mut paula);
        track.command(&note(0, 0, 0x0F, 17), 0, &mut speed, &mut paula);
        assert_eq!(speed, 3);
        track.command(&note(0, 0, 0x0C, 90), 0, &mut speed, &mut paula);
        assert_eq!(track.volume(), 64);
        track.command(&note(0, 0, 0x06, 20), 0, &mut speed, &mut paula);
        assert_eq!(paula.master_volume(), 20);
    }

    #[test]
    fn disable_filter_command() {
        let mut paula = Paula::new(VideoStandard::Pal, true);
        let mut track = Track::new(1, module()).unwrap();
        let mut speed = 6;
        assert!(paula.filtering());
        track.command(&note(0, 0, 0x0E, 0), 0, &mut speed, &mut paula);
        assert!(!paula.filtering());
    }

    #[test]
    fn slide_up_skips_first_tick() {
        let (mut track, mut paula) = setup();
        let n = note(37, 1, 0x01, 4);
        track.play(&n, &Voice::default(), 0.0, &mut paula);
        let mut speed = 6;
        track.command(&n, 0, &mut speed, &mut paula);
        let start = track.period();
        track.tick(6, &mut paula);
        assert_eq!(track.period(), start);
        track.tick(6, &mut paula);
        track.tick(6, &mut paula);
        assert_eq!(track.period(), start - 8);
        assert_eq!(paula.channel(0).unwrap().period() as i32, start - 8);
    }

    #[test]
    fn volume_slide_clamps() {
        let (mut track, mut paula) = setup();
        let n = note(37, 1, 0x0A, (-30i8) as u8);
        track.play(&n, &Voice::default(), 0.0, &mut paula);
        let mut speed = 6;
        track.command(&n, 0, &mut speed, &mut paula);
        for _ in 0..4 {
            track.tick(6, &mut paula);
        }
        assert_eq!(track.volume(), 0);
        assert_eq!(paula.channel(0).unwrap().volume(), 0);
    }

    #[test]
    fn portamento_glides_to_new_note() {
        let (mut track, mut paula) = setup();
        let mut speed = 6;
        track.play(&note(37, 1, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.command(&note(0, 0, 0x07, 10), 0, &mut speed, &mut paula);
        let from = track.period();
        track.play(&note(38, 1, 0, 0), &Voice::default(), 0.1, &mut paula);
        let to = note_to_period(38) as i32;
        assert_eq!(track.period(), from);
        track.tick(6, &mut paula);
        assert_eq!(track.period(), (from - 10).max(to));
        for _ in 0..50 {
            track.tick(6, &mut paula);
        }
        assert_eq!(track.period(), to);
    }

    #[test]
    fn adsr_scales_volume() {
        let mut m = (*module()).clone();
        m.instruments[0].adsr = Envelope { wave: 0, delay: 0, length: 2, repeat: 0 };
        let mut table = [0u8; WAVE_SIZE];
        table[0] = 32;
        table[1] = 16;
        m.adsr_waves.push(WaveTable::new(table));
        let mut track = Track::new(0, Arc::new(m)).unwrap();
        let mut paula = Paula::new(VideoStandard::Pal, false);
        track.play(&note(37, 1, 0, 0), &Voice::default(), 0.0, &mut paula);
        track.tick(6, &mut paula);
        assert_eq!(paula.channel(0).unwrap().volume(), 20);
        track.tick(6, &mut paula);
        assert_eq!(paula.channel(0).unwrap().volume(), 10);
    }
}
