//! Feedback ring buffer: the engine's memory of its own recent output.
//!
//! Fixed length (allocated once, two seconds at the operating sample rate),
//! overwritten continuously, silent at start. Grains read it with linear
//! interpolation at fractional, pitch-scaled positions.

use granulor_core::dsp::seconds_to_samples;
use granulor_core::random::RandomSource;

/// Seconds of audio held by the buffer.
pub const BUFFER_SECONDS: f32 = 2.0;
/// Distance behind the write head of the freeze window.
pub const FREEZE_OFFSET_SECONDS: f32 = 0.5;
/// Span behind the write head from which non-frozen grains pick their start.
pub const RECENT_WINDOW_SECONDS: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct FeedbackRingBuffer {
    buf: Box<[f32]>,
    write_head: usize,
    freeze_offset: usize,
    recent_window: usize,
}

impl FeedbackRingBuffer {
    /// Buffer of `len` samples (at least one) with offsets derived from `sr`.
    pub fn new(len: usize, sr: f32) -> Self {
        let len = len.max(1);
        Self {
            buf: vec![0.0; len].into_boxed_slice(),
            write_head: 0,
            freeze_offset: seconds_to_samples(FREEZE_OFFSET_SECONDS, sr).min(len),
            recent_window: seconds_to_samples(RECENT_WINDOW_SECONDS, sr).min(len),
        }
    }

    /// Two seconds of audio at `sr`.
    pub fn for_sample_rate(sr: f32) -> Self {
        Self::new(seconds_to_samples(BUFFER_SECONDS, sr), sr)
    }

    #[inline] pub fn len(&self) -> usize { self.buf.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.buf.is_empty() }
    #[inline] pub fn write_head(&self) -> usize { self.write_head }
    #[inline] pub fn as_slice(&self) -> &[f32] { &self.buf }

    /// Back to silence, head at zero.
    pub fn clear(&mut self) {
        self.buf.fill(0.0);
        self.write_head = 0;
    }

    /// Store `sample` at the write head and advance it.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buf[self.write_head] = sample;
        self.write_head += 1;
        if self.write_head == self.buf.len() {
            self.write_head = 0;
        }
    }

    /// Linear interpolation at a fractional index. Both neighbours wrap, so any
    /// finite position (negative or past the end) is valid.
    #[inline]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn read_interpolated(&self, position: f64) -> f32 {
        let len = self.buf.len();
        let base = position.floor();
        let frac = (position - base) as f32;
        let i0 = (base as i64).rem_euclid(len as i64) as usize;
        let i1 = if i0 + 1 == len { 0 } else { i0 + 1 };
        let a = self.buf[i0];
        a + (self.buf[i1] - a) * frac
    }

    /// Index half a second behind the write head.
    #[inline]
    pub fn freeze_window_start(&self) -> usize {
        self.behind_head(self.freeze_offset)
    }

    /// Random index within the last second behind the write head.
    #[inline]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn recent_window_start<R: RandomSource>(&self, rng: &mut R) -> usize {
        let offset = 1 + (rng.next_f32() * self.recent_window as f32) as usize;
        self.behind_head(offset.min(self.recent_window))
    }

    #[inline]
    fn behind_head(&self, offset: usize) -> usize {
        let len = self.buf.len();
        (self.write_head + len - offset % len) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use granulor_core::random::Lcg;

    #[test]
    fn sized_for_two_seconds_and_silent() {
        let ring = FeedbackRingBuffer::for_sample_rate(48_000.0);
        assert_eq!(ring.len(), 96_000);
        assert!(ring.as_slice().iter().all(|&s| s == 0.0));
        assert_eq!(ring.write_head(), 0);
    }

    #[test]
    fn write_wraps_head() {
        let mut ring = FeedbackRingBuffer::new(4, 4.0);
        for i in 0..6 {
            ring.write(i as f32);
            assert!(ring.write_head() < ring.len());
        }
        assert_eq!(ring.write_head(), 2);
        assert_eq!(ring.as_slice(), &[4.0, 5.0, 2.0, 3.0]);
    }

    #[test]
    fn interpolates_between_slots_and_across_the_seam() {
        let mut ring = FeedbackRingBuffer::new(4, 4.0);
        for s in [0.0, 1.0, 2.0, 3.0] {
            ring.write(s);
        }
        assert_eq!(ring.read_interpolated(1.0), 1.0);
        assert!((ring.read_interpolated(1.25) - 1.25).abs() < 1e-6);
        // between slot 3 and slot 0
        assert!((ring.read_interpolated(3.5) - 1.5).abs() < 1e-6);
        // positions outside [0, len) wrap
        assert!((ring.read_interpolated(5.5) - 1.5).abs() < 1e-6);
        assert!((ring.read_interpolated(-0.5) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn freeze_window_is_half_a_second_behind() {
        let sr = 1_000.0;
        let mut ring = FeedbackRingBuffer::for_sample_rate(sr);
        assert_eq!(ring.freeze_window_start(), 2_000 - 500);
        for _ in 0..700 {
            ring.write(0.0);
        }
        assert_eq!(ring.freeze_window_start(), 200);
    }

    #[test]
    fn recent_window_stays_within_last_second() {
        let sr = 1_000.0;
        let mut ring = FeedbackRingBuffer::for_sample_rate(sr);
        let mut rng = Lcg::new(11);
        for step in 0..5_000 {
            ring.write(0.0);
            let start = ring.recent_window_start(&mut rng);
            assert!(start < ring.len());
            let behind = (ring.write_head() + ring.len() - start) % ring.len();
            assert!((1..=1_000).contains(&behind), "step={step} behind={behind}");
        }
    }
}
