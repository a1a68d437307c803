#![cfg_attr(not(feature = "std"), no_std)]
//! Granulor Core: no_std-ready primitives for the feedback granular engine.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: rational tanh approximation in the output soft clipper
//!
//! Modules
//! - [`dsp`]       : math backend, soft clip, denormal/NaN guards, time conversion
//! - [`envelopes`] : grain attack/sustain/decay window, ramp fitting, slew limiter
//! - [`filters`]   : one-pole LP/HP for seed voices
//! - [`random`]    : seedable jitter source used by the grain pool
//!
//! Design
//! - No heap allocations; everything here is safe to call from the audio thread
//! - Friendly to embedded / real-time targets

pub mod dsp;
pub mod envelopes;
pub mod filters;
pub mod random;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{
        clamp, finite_or_zero, kill_denormals, one_pole_coeff_hz, one_pole_coeff_ms,
        seconds_to_samples, soft_clip, TAU,
    };
    pub use crate::envelopes::{fit_ramps, grain_envelope, SlewLimiter};
    pub use crate::filters::{OnePoleHP, OnePoleLP};
    pub use crate::random::{Lcg, RandomSource};
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let mut rng = Lcg::new(1);
        let (a, d) = fit_ramps(0.1, 0.4);
        let _ = grain_envelope(rng.next_f32(), a, d);
        let mut lp = OnePoleLP::new(1000.0, 48000.0);
        let _ = soft_clip(lp.process(0.1));
    }
}
