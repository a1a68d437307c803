//! Seedable pseudo-random sources for per-grain jitter.
//!
//! The audio thread must not touch the OS entropy pool or allocate, so grain
//! jitter comes from a tiny deterministic generator. Engines are generic over
//! [`RandomSource`], which lets tests inject a fixed seed.

/// Uniform source of `f32` values in `[0, 1)`.
pub trait RandomSource {
    /// Next value in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    /// Uniform value in `[lo, hi)`.
    #[inline]
    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Uniform value in `[-1, 1)`.
    #[inline]
    fn bipolar(&mut self) -> f32 {
        2.0 * self.next_f32() - 1.0
    }
}

/// 32-bit linear congruential generator (Numerical Recipes constants).
///
/// Not suitable for anything but audio jitter. O(1), `Copy`, no allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    const A: u32 = 1_664_525;
    const C: u32 = 1_013_904_223;
    const SCALE: f32 = 1.0 / 16_777_216.0; // 2^-24

    #[inline]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Current internal state; feeding it back into [`Lcg::new`] resumes the sequence.
    #[inline]
    pub const fn state(&self) -> u32 {
        self.state
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(Self::A).wrapping_add(Self::C);
        self.state
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(0x2545_F491)
    }
}

impl RandomSource for Lcg {
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    fn next_f32(&mut self) -> f32 {
        // top 24 bits fit an f32 mantissa exactly, so the result never rounds up to 1.0
        (self.next_u32() >> 8) as f32 * Self::SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Lcg::new(42);
        let mut b = Lcg::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Lcg::new(1);
        let mut b = Lcg::new(2);
        let same = (0..100).filter(|_| a.next_u32() == b.next_u32()).count();
        assert!(same < 5);
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let mut r = Lcg::new(0xFFFF_FFFF);
        for _ in 0..100_000 {
            let v = r.next_f32();
            assert!((0.0..1.0).contains(&v), "v={v}");
        }
    }

    #[test]
    fn mean_is_roughly_half() {
        let mut r = Lcg::new(7);
        let n = 100_000;
        let sum: f64 = (0..n).map(|_| f64::from(r.next_f32())).sum();
        let mean = sum / f64::from(n);
        assert!((mean - 0.5).abs() < 0.01, "mean={mean}");
    }

    #[test]
    fn range_and_bipolar_helpers() {
        let mut r = Lcg::new(3);
        for _ in 0..10_000 {
            let x = r.range(0.3, 0.5);
            assert!((0.3..=0.5).contains(&x));
            let b = r.bipolar();
            assert!((-1.0..1.0).contains(&b));
        }
    }

    #[test]
    fn state_resumes_sequence() {
        let mut a = Lcg::new(99);
        a.next_u32();
        let mut b = Lcg::new(a.state());
        assert_eq!(a.next_u32(), b.next_u32());
    }
}
