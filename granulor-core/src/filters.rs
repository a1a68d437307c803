//! Filters: lightweight one-poles for seed voices and input conditioning.
//!
//! Contents
//! - `OnePoleLP`  : “RC-style” one-pole low-pass (cheap smoother/tilt)
//! - `OnePoleHP`  : leaky-integrator high-pass, keeps DC out of the feedback buffer
//!
//! Both use `exp(-2π fc / sr)` coefficients. They are not bilinear/TPT matched;
//! they’re meant for parameter smoothing and gentle tonal shaping.

use crate::dsp::{kill_denormals, one_pole_coeff_hz};

/// One-pole low-pass `y += a * (x - y)`.
///
/// `a` is derived from cutoff (Hz) and sample rate:
/// `a = 1 - exp(-2π * fc / sr)`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleLP {
    a: f32,
    y: f32,
    sr: f32,
    fc: f32,
}

impl OnePoleLP {
    /// Create a low-pass with cutoff `cut_hz` and sample rate `sr`.
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        let mut s = Self {
            a: 0.0,
            y: 0.0,
            sr: sr.max(1.0),
            fc: cut_hz.max(0.0),
        };
        s.update_coeffs();
        s
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.update_coeffs();
    }

    #[inline]
    pub fn set_cutoff_hz(&mut self, cut_hz: f32) {
        self.fc = cut_hz.max(0.0);
        self.update_coeffs();
    }

    #[inline]
    fn update_coeffs(&mut self) {
        self.a = 1.0 - one_pole_coeff_hz(self.fc, self.sr);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += self.a * (x - self.y);
        self.y = kill_denormals(self.y);
        self.y
    }
}

/// One-pole high-pass: `y[n] = x[n] - x[n-1] + b * y[n-1]`, `b = exp(-2π fc / sr)`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleHP {
    b: f32,
    x1: f32,
    y1: f32,
    sr: f32,
    fc: f32,
}

impl OnePoleHP {
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        let mut s = Self { b: 0.0, x1: 0.0, y1: 0.0, sr: sr.max(1.0), fc: cut_hz.max(0.0) };
        s.update_coeffs();
        s
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.sr = sr.max(1.0); self.update_coeffs(); }
    #[inline] pub fn set_cutoff_hz(&mut self, cut_hz: f32) { self.fc = cut_hz.max(0.0); self.update_coeffs(); }

    #[inline]
    fn update_coeffs(&mut self) {
        self.b = one_pole_coeff_hz(self.fc, self.sr);
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.b * self.y1;
        self.x1 = x;
        self.y1 = kill_denormals(y);
        self.y1
    }
}
