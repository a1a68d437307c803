//! Realtime host glue.
//!
//! Two seams live here:
//! - [`Generator`] : anything that produces one mono sample at a time (seed voices)
//! - [`Processor`] : anything that renders fixed-size blocks (the granular engine)
//!
//! Audio devices rarely call back with the block size an engine wants, so
//! [`BlockRunner`] collects per-sample input into [`RENDER_QUANTUM`] blocks and
//! plays back the rendered block one sample at a time, at the cost of one
//! quantum of latency.
//!
//! Design goals
//! - No dynamic allocations in the audio thread
//! - Generic over the processor, so hosts don't go through trait objects

use granulor_core::random::RandomSource;

use crate::granular::GranularEngine;

/// Samples per processing block.
pub const RENDER_QUANTUM: usize = 128;

/// Anything that can generate one sample at a time.
pub trait Generator {
    /// Called when the host is (re)initialized or when the sample rate changes.
    fn reset(&mut self, sr: f32);

    /// Generate the next mono sample.
    fn next(&mut self) -> f32;
}

/// A block processor driven by a host audio graph.
pub trait Processor {
    /// Reconfigure for a new sample rate. May allocate; never called per block.
    fn reset(&mut self, sr: f32);

    /// Render `output` from optional `input`. Returns `false` once the processor
    /// no longer needs to be called.
    fn process(&mut self, input: Option<&[f32]>, output: &mut [f32]) -> bool;
}

impl<R: RandomSource> Processor for GranularEngine<R> {
    #[inline]
    fn reset(&mut self, sr: f32) {
        GranularEngine::reset(self, sr);
    }

    #[inline]
    fn process(&mut self, input: Option<&[f32]>, output: &mut [f32]) -> bool {
        GranularEngine::process(self, input, output)
    }
}

/// Adapts a block [`Processor`] to a per-sample host callback.
pub struct BlockRunner<P: Processor> {
    sr: f32,
    inner: P,
    input: [f32; RENDER_QUANTUM],
    output: [f32; RENDER_QUANTUM],
    pos: usize,
    alive: bool,
}

impl<P: Processor> BlockRunner<P> {
    /// Wrap a processor already configured for `sr`.
    pub fn new(inner: P, sr: f32) -> Self {
        Self {
            sr,
            inner,
            input: [0.0; RENDER_QUANTUM],
            output: [0.0; RENDER_QUANTUM],
            pos: 0,
            alive: true,
        }
    }

    /// Feed one input sample, get one output sample back.
    ///
    /// Output lags input by [`RENDER_QUANTUM`] samples. Once the processor
    /// reports it is done, output is silence.
    #[inline]
    pub fn next(&mut self, x: f32) -> f32 {
        let y = self.output[self.pos];
        self.input[self.pos] = x;
        self.pos += 1;
        if self.pos == RENDER_QUANTUM {
            self.pos = 0;
            if self.alive {
                self.alive = self.inner.process(Some(&self.input[..]), &mut self.output);
            }
            if !self.alive {
                self.output.fill(0.0);
            }
        }
        y
    }

    /// Fill `out` using `source` as the input signal.
    #[inline]
    pub fn fill<G: Generator>(&mut self, source: &mut G, out: &mut [f32]) {
        for y in out.iter_mut() {
            *y = self.next(source.next());
        }
    }

    /// Switch sample rate; resets the processor when it actually changes.
    /// Not realtime safe.
    pub fn set_sample_rate(&mut self, sr: f32) {
        if sr != self.sr {
            self.sr = sr;
            self.inner.reset(sr);
            self.input.fill(0.0);
            self.output.fill(0.0);
            self.pos = 0;
        }
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }
    #[inline] pub fn is_alive(&self) -> bool { self.alive }
    #[inline] pub fn latency(&self) -> usize { RENDER_QUANTUM }

    /// Access the processor for live tweaks.
    #[inline] pub fn processor(&self) -> &P { &self.inner }
    #[inline] pub fn processor_mut(&mut self) -> &mut P { &mut self.inner }

    pub fn into_inner(self) -> P { self.inner }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes its input and counts blocks.
    struct Echo {
        blocks: usize,
        stop_after: usize,
        resets: usize,
    }

    impl Processor for Echo {
        fn reset(&mut self, _sr: f32) {
            self.resets += 1;
        }

        fn process(&mut self, input: Option<&[f32]>, output: &mut [f32]) -> bool {
            assert_eq!(output.len(), RENDER_QUANTUM);
            output.copy_from_slice(input.unwrap());
            self.blocks += 1;
            self.blocks < self.stop_after
        }
    }

    struct Ramp(f32);

    impl Generator for Ramp {
        fn reset(&mut self, _sr: f32) {
            self.0 = 0.0;
        }

        fn next(&mut self) -> f32 {
            self.0 += 1.0;
            self.0
        }
    }

    #[test]
    fn output_lags_by_one_quantum() {
        let mut runner = BlockRunner::new(Echo { blocks: 0, stop_after: usize::MAX, resets: 0 }, 48_000.0);
        let mut out = vec![0.0; RENDER_QUANTUM * 3 + 17];
        runner.fill(&mut Ramp(0.0), &mut out);
        assert!(out[..RENDER_QUANTUM].iter().all(|&s| s == 0.0));
        for (i, &s) in out.iter().enumerate().skip(RENDER_QUANTUM) {
            assert_eq!(s, (i - RENDER_QUANTUM + 1) as f32);
        }
        assert_eq!(runner.processor().blocks, 3);
        assert_eq!(runner.latency(), RENDER_QUANTUM);
    }

    #[test]
    fn stops_calling_a_finished_processor() {
        let mut runner = BlockRunner::new(Echo { blocks: 0, stop_after: 2, resets: 0 }, 48_000.0);
        let mut out = vec![0.0; RENDER_QUANTUM * 6];
        runner.fill(&mut Ramp(0.0), &mut out);
        assert!(!runner.is_alive());
        assert_eq!(runner.processor().blocks, 2);
        assert!(out[RENDER_QUANTUM * 2..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sample_rate_change_resets_once() {
        let mut runner = BlockRunner::new(Echo { blocks: 0, stop_after: usize::MAX, resets: 0 }, 48_000.0);
        runner.set_sample_rate(48_000.0);
        runner.set_sample_rate(44_100.0);
        runner.set_sample_rate(44_100.0);
        assert_eq!(runner.processor_mut().resets, 1);
        assert_eq!(runner.sample_rate(), 44_100.0);
    }

    #[test]
    fn drives_the_granular_engine() {
        let engine = GranularEngine::with_seed(48_000.0, 1);
        let mut runner = BlockRunner::new(engine, 48_000.0);
        let mut out = vec![0.0; 48_000];
        runner.fill(&mut Ramp(0.0), &mut out);
        assert!(runner.is_alive());
        assert_eq!(runner.processor().stats().blocks, 48_000 / RENDER_QUANTUM as u64);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }
}
