//! Peak / grain-count meter shared between the audio callback and the main thread.
//!
//! The callback only does relaxed atomic stores; the main thread takes and
//! logs the readings once per second.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Meter {
    /// f32 bits of the running peak. Non-negative floats order like their bits.
    peak: AtomicU32,
    active: AtomicUsize,
}

impl Meter {
    /// Called from the audio callback.
    #[inline]
    pub fn record(&self, peak: f32, active: usize) {
        let peak = if peak.is_finite() { peak.abs() } else { 0.0 };
        self.peak.fetch_max(peak.to_bits(), Ordering::Relaxed);
        self.active.store(active, Ordering::Relaxed);
    }

    /// Peak since the last call, and the latest active-grain count.
    pub fn take(&self) -> (f32, usize) {
        let peak = f32::from_bits(self.peak.swap(0, Ordering::Relaxed));
        (peak, self.active.load(Ordering::Relaxed))
    }
}
