//! Grain envelopes and parameter slewing primitives.
//!
//! Provided:
//! - `grain_envelope` : piecewise-linear attack / sustain / decay window evaluated
//!                      from a grain's normalized progress
//! - `fit_ramps`      : ramp-length policy applied when a grain is spawned
//! - `SlewLimiter`    : one-pole slew/smoother for arbitrary control signals
//!
//! All of this is `no_std` friendly and avoids heap allocations.

use crate::dsp::{one_pole_coeff_ms, clamp};

// -------------------------------- Grain window ----------------------------------

/// Attack / sustain / decay window.
///
/// `progress` is `position / duration` in `[0, 1)`, `attack` and `decay` are
/// fractions of the grain length. Returns a gain in `[0, 1]`.
///
/// Ramps of length zero are skipped: the attack branch needs `progress < attack`
/// and the decay branch needs `progress > 1 - decay`, neither of which can hold
/// for a zero ramp, so there is never a division by zero. Callers are expected to
/// pass ramps shaped by [`fit_ramps`]; overlapping ramps still return a bounded
/// value but the shape is the attack ramp until it ends.
#[inline]
pub fn grain_envelope(progress: f32, attack: f32, decay: f32) -> f32 {
    if progress < attack {
        return progress / attack;
    }
    let decay_start = 1.0 - decay;
    if progress > decay_start {
        return clamp(1.0 - (progress - decay_start) / decay, 0.0, 1.0);
    }
    1.0
}

/// Clamp both ramps into `[0, 1]` and, if they overlap (`attack + decay > 1`),
/// rescale them proportionally so they meet exactly with no sustain segment.
///
/// Non-finite values collapse to `0.0`.
#[inline]
pub fn fit_ramps(attack: f32, decay: f32) -> (f32, f32) {
    let a = if attack.is_finite() { clamp(attack, 0.0, 1.0) } else { 0.0 };
    let d = if decay.is_finite() { clamp(decay, 0.0, 1.0) } else { 0.0 };
    let sum = a + d;
    if sum > 1.0 {
        (a / sum, d / sum)
    } else {
        (a, d)
    }
}

// -------------------------------- Slew limiter ----------------------------------

/// One-pole slew limiter for control signals: `y += (x - y) * (1 - alpha)`.
#[derive(Copy, Clone, Debug)]
pub struct SlewLimiter {
    alpha: f32,
    y:     f32,
}

impl SlewLimiter {
    #[inline]
    pub fn new(t_ms: f32, sr: f32) -> Self {
        Self { alpha: one_pole_coeff_ms(t_ms, sr), y: 0.0 }
    }

    #[inline]
    pub fn set_time_ms(&mut self, t_ms: f32, sr: f32) {
        self.alpha = one_pole_coeff_ms(t_ms, sr);
    }

    #[inline]
    pub fn reset(&mut self, y0: f32) { self.y = y0; }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += (x - self.y) * (1.0 - self.alpha);
        self.y
    }

    #[inline]
    pub fn value(&self) -> f32 { self.y }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn at(position: u32, duration: u32, attack: f32, decay: f32) -> f32 {
        grain_envelope(position as f32 / duration as f32, attack, decay)
    }

    #[test]
    fn starts_at_zero() {
        assert_eq!(at(0, 1000, 0.1, 0.4), 0.0);
    }

    #[test]
    fn last_sample_approaches_zero_with_length() {
        let short = at(99, 100, 0.1, 0.4);
        let long = at(99_999, 100_000, 0.1, 0.4);
        assert!(short < 0.03, "short={short}");
        assert!(long < short && long < 1e-3, "long={long}");
    }

    #[test]
    fn sustain_is_unity_and_everything_is_bounded() {
        assert_eq!(at(500, 1000, 0.1, 0.4), 1.0);
        for p in 0..1000 {
            let v = at(p, 1000, 0.2, 0.3);
            assert!((0.0..=1.0).contains(&v), "p={p} v={v}");
        }
    }

    #[test]
    fn ramps_are_monotonic() {
        let mut prev = -1.0;
        for p in 0..100 {
            let v = at(p, 1000, 0.1, 0.3);
            assert!(v >= prev);
            prev = v;
        }
        prev = 2.0;
        for p in 700..1000 {
            let v = at(p, 1000, 0.1, 0.3);
            assert!(v <= prev);
            prev = v;
        }
    }

    #[test]
    fn zero_ramps_do_not_divide() {
        assert_eq!(grain_envelope(0.0, 0.0, 0.0), 1.0);
        assert_eq!(grain_envelope(0.999, 0.0, 0.0), 1.0);
        assert!(grain_envelope(0.5, 0.0, 0.5).is_finite());
    }

    #[test]
    fn overlapping_ramps_are_rescaled() {
        let (a, d) = fit_ramps(0.8, 0.6);
        assert!((a + d - 1.0).abs() < 1e-6);
        assert!((a / d - 0.8 / 0.6).abs() < 1e-5);

        assert_eq!(fit_ramps(0.2, 0.3), (0.2, 0.3));
        assert_eq!(fit_ramps(-1.0, 2.0), (0.0, 1.0));
        assert_eq!(fit_ramps(f32::NAN, 0.5), (0.0, 0.5));
    }

    #[test]
    fn fitted_overlap_peaks_where_ramps_meet() {
        let (a, d) = fit_ramps(0.8, 0.6);
        let peak = grain_envelope(a, a, d);
        assert!(peak > 0.99, "peak={peak}");
        for p in 0..1000 {
            let v = at(p, 1000, a, d);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn slew_moves_towards_target() {
        let sr = 48000.0;
        let mut s = SlewLimiter::new(50.0, sr);
        for _ in 0..(sr as usize) { s.process(1.0); }
        assert!(s.value() > 0.9);
    }
}
