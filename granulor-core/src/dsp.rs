//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for hot paths
//! - Clean, side-effect free helpers that are easy to test
//!
//! Features used by this file:
//! - `fast-math` : rational tanh approximation in [`soft_clip`]
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_tanh(x: f32) -> f32 { x.tanh() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] fn m_tanh(x: f32) -> f32 { libm::tanhf(x) }
    // std backend
    } else {
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_tanh(x: f32) -> f32 { x.tanh() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x > -EPS_SMALL && x < EPS_SMALL { 0.0 } else { x }
}

/// Replace NaN/inf with silence. Everything else passes through untouched.
#[inline]
pub fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

/// Convert a duration in seconds to a whole number of samples (at least 1).
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn seconds_to_samples(seconds: f32, sr: f32) -> usize {
    let n = seconds * sr + 0.5;
    if n < 1.0 { 1 } else { n as usize }
}

// --------------------------------- Nonlinearities --------------------------------

/// Soft clip via tanh. If `fast-math` is enabled, uses a stable rational approximation.
///
/// Approximation used when `fast-math`:
/// `tanh(x) ≈ x * (27 + x^2) / (27 + 9 x^2)`, with `x` limited to `[-3, 3]`
/// where the rational form reaches exactly ±1.
///
/// The result is always within `[-1, 1]` for finite input.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let x = clamp(x, -3.0, 3.0);
            let x2 = x * x;
            let num = x * (27.0 + x2);
            let den = 27.0 + 9.0 * x2;
            num / den
        } else {
            m_tanh(x)
        }
    }
}

// --------------------------------- Exponentials / smoothing ----------------------

/// One-pole smoothing coefficient for a time constant `t_ms` (milliseconds).
///
/// The discrete one-pole form: `y[n] += a * (x[n] - y[n])`
/// where `a = exp(-1/(tau * sr))` for first-order lag with time constant `tau`.
#[inline]
pub fn one_pole_coeff_ms(t_ms: f32, sr: f32) -> f32 {
    if t_ms <= 0.0 { return 1.0; }
    let tau = t_ms * 0.001;
    m_exp(-1.0 / (tau * sr))
}

/// Convert cutoff in Hz to a simple one-pole (non-TPT) coefficient `exp(-2π fc / sr)`.
#[inline]
pub fn one_pole_coeff_hz(cut_hz: f32, sr: f32) -> f32 {
    let fc = clamp(cut_hz, 0.0, 0.499 * sr);
    m_exp(-2.0 * PI * fc / sr)
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_clip_is_bounded() {
        for x in [-1.0e6, -10.0, -2.0, -1.0, 0.0, 1.0, 2.0, 10.0, 1.0e6] {
            let y = soft_clip(x);
            assert!((-1.0..=1.0).contains(&y), "x={x} y={y}");
        }
    }

    #[test]
    fn soft_clip_is_odd_and_monotonic() {
        let mut prev = soft_clip(-5.0);
        let mut x = -5.0;
        while x <= 5.0 {
            let y = soft_clip(x);
            assert!(y >= prev);
            assert!((y + soft_clip(-x)).abs() < 1e-6);
            prev = y;
            x += 0.01;
        }
    }

    #[test]
    fn clamp_respects_both_bounds() {
        assert_eq!(clamp(-2.0, -1.0, 1.0), -1.0);
        assert_eq!(clamp(2.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp(0.25, -1.0, 1.0), 0.25);
    }

    #[test]
    fn seconds_to_samples_rounds_and_floors_at_one() {
        assert_eq!(seconds_to_samples(2.0, 48_000.0), 96_000);
        assert_eq!(seconds_to_samples(0.5, 44_100.0), 22_050);
        assert_eq!(seconds_to_samples(0.0, 48_000.0), 1);
    }

    #[test]
    fn non_finite_becomes_silence() {
        assert_eq!(finite_or_zero(f32::NAN), 0.0);
        assert_eq!(finite_or_zero(f32::INFINITY), 0.0);
        assert_eq!(finite_or_zero(0.5), 0.5);
        assert_eq!(kill_denormals(1.0e-30), 0.0);
    }
}
