//! Building blocks (nodes) for seed voices.
//!
//! The granular engine only replays what is in its feedback buffer, so a scene
//! needs some input to get the loop going. These are zero-allocation, per-sample
//! components for that input; everything here is `Copy`, no locks, no heap.
//!
//! Contents:
//! - `Wave`, `Osc` : basic oscillators (Sine/Tri/Saw) with stable phase wrap
//! - `Lfo`         : low-frequency oscillator (same core as `Osc`), for modulation
//! - `NoiseMod`    : ultra-low-rate random modulator with slewed steps
//! - `Noise`       : white noise for breathy seeds
//!
//! Frequency is **Hz**; methods expect the current **sample rate** when stepping.

use granulor_core::dsp::TAU;
use granulor_core::filters::OnePoleLP;
use granulor_core::random::{Lcg, RandomSource};

/// Oscillator waveform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Wave { Sine, Tri, Saw }

#[inline]
fn osc_sample(phase01: f32, wave: Wave) -> f32 {
    match wave {
        Wave::Sine => (TAU * phase01).sin(),
        Wave::Tri  => 4.0 * (phase01 - 0.5).abs() - 1.0,
        Wave::Saw  => 2.0 * phase01 - 1.0,
    }
}

/// Free-running oscillator. Not anti-aliased; fine for drones and LFO duties.
#[derive(Copy, Clone, Debug)]
pub struct Osc {
    phase: f32,   // [0,1)
    freq:  f32,   // Hz
    wave:  Wave,
}

impl Osc {
    #[inline] pub fn new(freq_hz: f32, wave: Wave) -> Self { Self { phase: 0.0, freq: freq_hz, wave } }
    #[inline] pub fn set_freq(&mut self, hz: f32) { self.freq = hz.max(0.0); }

    /// Advance one sample and return the oscillator sample.
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        self.phase = (self.phase + self.freq / sr) % 1.0;
        osc_sample(self.phase, self.wave)
    }
}

/// Low-frequency oscillator; identical to `Osc` but with convenience constructors.
#[derive(Copy, Clone, Debug)]
pub struct Lfo(Osc);

impl Lfo {
    #[inline] pub fn sine(rate_hz: f32) -> Self { Self(Osc::new(rate_hz, Wave::Sine)) }
    #[inline] pub fn tri(rate_hz: f32)  -> Self { Self(Osc::new(rate_hz, Wave::Tri))  }

    /// Next LFO value in **[-1,1]**.
    #[inline] pub fn next_norm(&mut self, sr: f32) -> f32 { self.0.next(sr) }

    /// Next LFO value remapped to **[0,1]**.
    #[inline] pub fn next01(&mut self, sr: f32) -> f32 { 0.5 * (self.0.next(sr) + 1.0) }
}

/// Slowly changing random modulator.
///
/// Every `period_s` seconds a new random target in [low, high] is picked and
/// approached through a one-pole low-pass.
#[derive(Copy, Clone, Debug)]
pub struct NoiseMod {
    low: f32,
    high: f32,
    period_s: f32,
    t: f32,
    target: f32,
    rng: Lcg,
    lp: OnePoleLP,
}

impl NoiseMod {
    /// `period_s`: how often to pick a new target
    /// `cut_hz`  : slew cutoff for the interpolator (smaller = slower)
    #[inline]
    pub fn new(low: f32, high: f32, period_s: f32, cut_hz: f32, sr: f32, seed: u32) -> Self {
        let mut s = Self {
            low, high, period_s: period_s.max(0.1),
            t: 0.0,
            target: 0.0,
            rng: Lcg::new(seed),
            lp: OnePoleLP::new(cut_hz.max(0.01), sr),
        };
        s.pick_target();
        s
    }

    #[inline] pub fn reset_sr(&mut self, sr: f32) { self.lp.set_sample_rate(sr); }

    #[inline]
    fn pick_target(&mut self) {
        self.target = self.rng.range(self.low, self.high);
        self.t = 0.0;
    }

    /// Next value, updated once per sample. Returns a smoothed value in [low, high].
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        self.t += 1.0 / sr;
        if self.t >= self.period_s {
            self.pick_target();
        }
        self.lp.process(self.target)
    }
}

/// White noise in [-1, 1).
#[derive(Copy, Clone, Debug)]
pub struct Noise(Lcg);

impl Noise {
    #[inline] pub fn new(seed: u32) -> Self { Self(Lcg::new(seed)) }
    #[inline] pub fn next(&mut self) -> f32 { self.0.bipolar() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oscillators_stay_in_range() {
        for wave in [Wave::Sine, Wave::Tri, Wave::Saw] {
            let mut o = Osc::new(441.0, wave);
            for _ in 0..48_000 {
                let s = o.next(48_000.0);
                assert!((-1.0..=1.0).contains(&s), "{wave:?} {s}");
            }
        }
    }

    #[test]
    fn lfo01_is_unipolar() {
        let mut l = Lfo::tri(3.0);
        for _ in 0..48_000 {
            assert!((0.0..=1.0).contains(&l.next01(48_000.0)));
        }
    }

    #[test]
    fn noise_mod_wanders_within_bounds() {
        let sr = 1_000.0;
        let mut m = NoiseMod::new(-6.0, 6.0, 0.5, 2.0, sr, 9);
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for _ in 0..20_000 {
            let v = m.next(sr);
            min = min.min(v);
            max = max.max(v);
        }
        assert!(min >= -6.0 && max <= 6.0);
        assert!(max - min > 1.0, "modulator never moved: {min}..{max}");
    }
}
