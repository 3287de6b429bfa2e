//! Web Audio voice chain and look-ahead note scheduler.
//!
//! Graph: pulse oscillator + envelope (per note) -> master gain -> low-pass
//! filter -> feedback delay -> convolution reverb -> destination.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use web_sys::{
    AudioBuffer, AudioContext, AudioContextState, AudioNode, BiquadFilterType, GainNode,
    PeriodicWave,
};

use super::arp::{self, Arpeggiator, StepClock, Tempo};
use super::{AudioBackend, AudioError, BPM};
use crate::callbacks::Interval;

const MASTER_DB: f64 = -18.0;
const VELOCITY: f32 = 0.6;
const PULSE_DUTY: f64 = 0.2;
const PULSE_HARMONICS: usize = 32;

const ATTACK: f64 = 0.005;
const DECAY: f64 = 0.1;
const SUSTAIN: f32 = 0.3;
const RELEASE: f64 = 0.25;

const FILTER_HZ: f32 = 3000.0;
const DELAY_FEEDBACK: f32 = 0.3;
const REVERB_DECAY: f64 = 2.5;
const REVERB_PRE_DELAY: f64 = 0.02;
const REVERB_WET: f32 = 0.4;

const TICK_MS: f64 = 25.0;
const LOOKAHEAD_SECS: f64 = 0.1;
const START_OFFSET_SECS: f64 = 0.05;

pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Cosine series of a pulse wave with the given duty cycle, in the
/// `(real, imag)` layout `createPeriodicWave` expects.
pub fn pulse_coefficients(duty: f64, harmonics: usize) -> (Vec<f32>, Vec<f32>) {
    let mut real = vec![0.0f32; harmonics + 1];
    let imag = vec![0.0f32; harmonics + 1];
    for (n, slot) in real.iter_mut().enumerate().skip(1) {
        let n = n as f64;
        *slot = (2.0 / (n * std::f64::consts::PI) * (n * std::f64::consts::PI * duty).sin()) as f32;
    }
    (real, imag)
}

/// Noise burst with quadratic decay, silent for the pre-delay.
fn impulse_response(sample_rate: f32, rng: &mut SmallRng) -> Vec<f32> {
    let sr = sample_rate as f64;
    let pre = (REVERB_PRE_DELAY * sr) as usize;
    let tail = (REVERB_DECAY * sr) as usize;
    let mut out = vec![0.0f32; pre + tail];
    for (i, s) in out[pre..].iter_mut().enumerate() {
        let env = 1.0 - i as f64 / tail as f64;
        *s = (rng.gen_range(-1.0..1.0) * env * env) as f32;
    }
    out
}

/// Everything a scheduled note needs; cheap to clone into the ticker.
#[derive(Clone)]
struct Voicing {
    ctx: AudioContext,
    bus: GainNode,
    wave: PeriodicWave,
}

impl Voicing {
    fn play(&self, note: &str, at: f64, length: f64) -> Result<(), AudioError> {
        let Some(freq) = arp::frequency(note) else {
            return Err(AudioError::Schedule(format!("unknown note {note}")));
        };
        let osc = self.ctx.create_oscillator().map_err(AudioError::graph)?;
        osc.set_periodic_wave(&self.wave);
        osc.frequency().set_value(freq as f32);

        let env = self.ctx.create_gain().map_err(AudioError::graph)?;
        let gain = env.gain();
        gain.set_value_at_time(0.0, at).map_err(AudioError::graph)?;
        gain.linear_ramp_to_value_at_time(VELOCITY, at + ATTACK)
            .map_err(AudioError::graph)?;
        gain.set_target_at_time(VELOCITY * SUSTAIN, at + ATTACK, DECAY / 3.0)
            .map_err(AudioError::graph)?;
        gain.set_target_at_time(0.0, at + length, RELEASE / 3.0)
            .map_err(AudioError::graph)?;

        osc.connect_with_audio_node(&env).map_err(AudioError::graph)?;
        env.connect_with_audio_node(&self.bus).map_err(AudioError::graph)?;
        osc.start_with_when(at).map_err(AudioError::graph)?;
        osc.stop_with_when(at + length + RELEASE * 2.0)
            .map_err(AudioError::graph)?;
        Ok(())
    }
}

pub struct WebSynth {
    voicing: Voicing,
    tempo: Tempo,
    arp: Rc<RefCell<Arpeggiator>>,
    ticker: Option<Interval>,
}

impl WebSynth {
    pub fn new() -> Result<Self, AudioError> {
        let ctx = AudioContext::new().map_err(AudioError::context)?;
        let mut rng = SmallRng::from_entropy();

        let (mut real, mut imag) = pulse_coefficients(PULSE_DUTY, PULSE_HARMONICS);
        let wave = ctx
            .create_periodic_wave(&mut real, &mut imag)
            .map_err(AudioError::graph)?;

        let bus = ctx.create_gain().map_err(AudioError::graph)?;
        bus.gain().set_value(db_to_gain(MASTER_DB) as f32);

        let filter = ctx.create_biquad_filter().map_err(AudioError::graph)?;
        filter.set_type(BiquadFilterType::Lowpass);
        filter.frequency().set_value(FILTER_HZ);

        let tempo = Tempo { bpm: BPM };
        let delay = ctx
            .create_delay_with_max_delay_time(1.0)
            .map_err(AudioError::graph)?;
        delay.delay_time().set_value(tempo.sixteenth_secs() as f32);
        let feedback = ctx.create_gain().map_err(AudioError::graph)?;
        feedback.gain().set_value(DELAY_FEEDBACK);
        let post_delay = ctx.create_gain().map_err(AudioError::graph)?;

        let reverb = ctx.create_convolver().map_err(AudioError::graph)?;
        reverb.set_buffer(Some(&Self::reverb_buffer(&ctx, &mut rng)?));
        let dry = ctx.create_gain().map_err(AudioError::graph)?;
        dry.gain().set_value(1.0 - REVERB_WET);
        let wet = ctx.create_gain().map_err(AudioError::graph)?;
        wet.gain().set_value(REVERB_WET);

        let dest: AudioNode = ctx.destination().into();
        let links: [(&AudioNode, &AudioNode); 10] = [
            (&bus, &filter),
            (&filter, &post_delay),
            (&filter, &delay),
            (&delay, &feedback),
            (&feedback, &delay),
            (&delay, &post_delay),
            (&post_delay, &dry),
            (&post_delay, &reverb),
            (&reverb, &wet),
            (&dry, &dest),
        ];
        for (from, to) in links {
            from.connect_with_audio_node(to).map_err(AudioError::graph)?;
        }
        wet.connect_with_audio_node(&dest).map_err(AudioError::graph)?;

        log::info!("web synth ready ({} Hz)", ctx.sample_rate());
        Ok(Self {
            voicing: Voicing { ctx, bus, wave },
            tempo,
            arp: Rc::new(RefCell::new(Arpeggiator::new())),
            ticker: None,
        })
    }

    fn reverb_buffer(ctx: &AudioContext, rng: &mut SmallRng) -> Result<AudioBuffer, AudioError> {
        let sr = ctx.sample_rate();
        let len = (((REVERB_PRE_DELAY + REVERB_DECAY) * sr as f64) as u32).max(1);
        let buffer = ctx.create_buffer(2, len, sr).map_err(AudioError::graph)?;
        for channel in 0..2 {
            let mut data = impulse_response(sr, rng);
            buffer
                .copy_to_channel(&mut data, channel)
                .map_err(AudioError::graph)?;
        }
        Ok(buffer)
    }
}

impl AudioBackend for WebSynth {
    fn resume(&mut self) -> Result<(), AudioError> {
        let ctx = &self.voicing.ctx;
        if ctx.state() != AudioContextState::Running {
            // Settles once the user gesture is honoured; nothing waits on it.
            let _settling = ctx.resume().map_err(AudioError::context)?;
        }
        Ok(())
    }

    fn set_tempo(&mut self, bpm: f64) {
        self.tempo = Tempo { bpm };
    }

    fn start_loop(&mut self) -> Result<(), AudioError> {
        let voicing = self.voicing.clone();
        let arp = self.arp.clone();
        let note_len = self.tempo.sixteenth_secs();
        let mut clock = StepClock::new(
            voicing.ctx.current_time() + START_OFFSET_SECS,
            self.tempo.eighth_secs(),
        );
        let ticker = Interval::new(TICK_MS, move || {
            let now = voicing.ctx.current_time();
            for at in clock.due(now, LOOKAHEAD_SECS) {
                let note = arp.borrow_mut().advance();
                if let Err(e) = voicing.play(note, at, note_len) {
                    log::warn!("dropped note {note}: {e}");
                }
            }
        })
        .map_err(|e| AudioError::Schedule(format!("{e:?}")))?;
        self.ticker = Some(ticker);
        Ok(())
    }

    fn stop_loop(&mut self) {
        self.ticker = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_volume() {
        assert!((db_to_gain(-18.0) - 0.125_89).abs() < 1e-4);
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pulse_series_shape() {
        let (real, imag) = pulse_coefficients(0.2, 8);
        assert_eq!(real.len(), 9);
        assert_eq!(real[0], 0.0);
        assert!(imag.iter().all(|v| *v == 0.0));
        // sin(5 * pi * 0.2) == 0: fifth harmonic vanishes for a 20 % pulse.
        assert!(real[5].abs() < 1e-6);
        assert!(real[1] > real[2]);
    }

    #[test]
    fn impulse_has_silent_pre_delay() {
        let mut rng = SmallRng::seed_from_u64(3);
        let ir = impulse_response(1000.0, &mut rng);
        assert_eq!(ir.len(), 20 + 2500);
        assert!(ir[..20].iter().all(|s| *s == 0.0));
        assert!(ir[20..].iter().any(|s| *s != 0.0));
        assert!(ir.iter().all(|s| s.abs() <= 1.0));
    }
}
