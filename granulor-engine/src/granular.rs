//! The feedback granular engine.
//!
//! Every call to [`GranularEngine::process`] runs the same fixed sequence:
//!
//! 1. merge pending parameter updates (and latch the freeze window)
//! 2. tick the scheduler, spawn grains if `active`
//! 3. zero the output block
//! 4. render every active grain into the block, retiring finished ones
//! 5. write `input * 0.8 + output * 0.2` back into the ring buffer
//! 6. soft clip the block
//!
//! The block path never allocates, locks or blocks. Pool saturation is the
//! only degraded mode and it is silent: the spawn is dropped and counted.

use granulor_core::dsp::{finite_or_zero, kill_denormals, soft_clip};
use granulor_core::random::{Lcg, RandomSource};

use crate::error::ParamError;
use crate::params::{
    EngineParameters, ParameterInbox, ParameterSender, ParameterUpdate, PARAM_QUEUE_CAPACITY,
};
use crate::pool::{GrainPool, MAX_GRAINS};
use crate::ring::FeedbackRingBuffer;
use crate::scheduler::GrainScheduler;

/// Gain applied to every grain sample before accumulation. Leaves headroom for
/// dozens of overlapping grains ahead of the soft clipper.
pub const MIX_GAIN: f32 = 0.15;
/// Share of the live input written into the ring buffer.
pub const INPUT_MIX: f32 = 0.8;
/// Share of the engine's own output written back into the ring buffer.
pub const FEEDBACK_MIX: f32 = 0.2;
/// Sample rates outside this range are clamped into it; NaN falls back to 48 kHz.
pub const MIN_SAMPLE_RATE: f32 = 1.0;
pub const MAX_SAMPLE_RATE: f32 = 768_000.0;

#[inline]
fn sane_sample_rate(sr: f32) -> f32 {
    if sr.is_nan() { 48_000.0 } else { sr.clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE) }
}

/// Counters updated once per block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Grains spawned since construction.
    pub spawned: u64,
    /// Spawns dropped because the pool was full.
    pub dropped: u64,
    /// Grains active at the end of the last block.
    pub active: usize,
    /// Blocks processed.
    pub blocks: u64,
}

/// Feedback granular engine: owns the ring buffer, grain pool, scheduler and jitter source.
pub struct GranularEngine<R: RandomSource = Lcg> {
    sr: f32,
    params: EngineParameters,
    inbox: ParameterInbox,
    pool: GrainPool,
    ring: FeedbackRingBuffer,
    scheduler: GrainScheduler,
    rng: R,
    frozen_start: Option<usize>,
    stats: EngineStats,
}

impl GranularEngine<Lcg> {
    /// Engine seeded once from OS entropy.
    pub fn new(sr: f32) -> Self {
        Self::with_seed(sr, rand::random())
    }

    /// Deterministic engine; the same seed and input give the same output.
    pub fn with_seed(sr: f32, seed: u32) -> Self {
        Self::with_rng(sr, Lcg::new(seed))
    }
}

impl<R: RandomSource> GranularEngine<R> {
    /// Engine drawing its jitter from `rng`.
    pub fn with_rng(sr: f32, rng: R) -> Self {
        let sr = sane_sample_rate(sr);
        let (inbox, _) = ParameterInbox::new(PARAM_QUEUE_CAPACITY);
        let ring = FeedbackRingBuffer::for_sample_rate(sr);
        log::debug!(
            "granular engine at {sr} Hz: {} sample feedback buffer, {} grain slots",
            ring.len(),
            MAX_GRAINS
        );
        Self {
            sr,
            params: EngineParameters::for_sample_rate(sr),
            inbox,
            pool: GrainPool::new(),
            ring,
            scheduler: GrainScheduler::new(),
            rng,
            frozen_start: None,
            stats: EngineStats::default(),
        }
    }

    /// Starting parameters, validated like any other update.
    pub fn with_parameters(mut self, update: ParameterUpdate) -> Result<Self, ParamError> {
        self.apply(update)?;
        Ok(self)
    }

    /// Control handle for another thread.
    pub fn sender(&self) -> ParameterSender {
        self.inbox.sender()
    }

    /// Validate and merge `update` right away, for callers that own the engine.
    pub fn apply(&mut self, update: ParameterUpdate) -> Result<(), ParamError> {
        let update = update.validated()?;
        self.params.apply(&update);
        Ok(())
    }

    #[inline] pub fn parameters(&self) -> &EngineParameters { &self.params }
    #[inline] pub fn stats(&self) -> EngineStats { self.stats }
    #[inline] pub fn feedback(&self) -> &FeedbackRingBuffer { &self.ring }
    #[inline] pub fn pool(&self) -> &GrainPool { &self.pool }
    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }

    /// Ring-buffer index every frozen grain starts from, while frozen.
    #[inline] pub fn frozen_start(&self) -> Option<usize> { self.frozen_start }

    /// Reconfigure for a new sample rate. Reallocates the ring buffer, so call
    /// it from the control side, never from inside the audio callback.
    /// Parameters are kept; grains, buffer contents and the freeze latch are not.
    pub fn reset(&mut self, sr: f32) {
        self.sr = sane_sample_rate(sr);
        self.ring = FeedbackRingBuffer::for_sample_rate(self.sr);
        self.pool.clear();
        self.scheduler.reset();
        self.frozen_start = None;
        self.stats.active = 0;
        log::debug!("granular engine reset to {} Hz", self.sr);
    }

    /// Render one block. `input` may be absent or shorter than `output`; missing
    /// samples are silence. Always returns `true` (keep running).
    pub fn process(&mut self, input: Option<&[f32]>, output: &mut [f32]) -> bool {
        self.inbox.drain_into(&mut self.params);
        if self.params.freeze {
            if self.frozen_start.is_none() {
                self.frozen_start = Some(self.ring.freeze_window_start());
            }
        } else {
            self.frozen_start = None;
        }

        let spawns = self.scheduler.tick(self.params.density, self.sr, output.len());
        if self.params.active {
            for _ in 0..spawns {
                let start = match self.frozen_start {
                    Some(start) => start,
                    None => self.ring.recent_window_start(&mut self.rng),
                };
                if self.pool.spawn(&self.params, start, &mut self.rng) {
                    self.stats.spawned += 1;
                } else {
                    self.stats.dropped += 1;
                }
            }
        }

        output.fill(0.0);

        let ring = &self.ring;
        self.pool.for_each_active(|grain| {
            for out in output.iter_mut() {
                let sample = ring.read_interpolated(grain.read_position());
                *out += sample * grain.envelope() * MIX_GAIN;
                if !grain.advance() {
                    return false;
                }
            }
            true
        });

        let input = input.unwrap_or(&[]);
        for (i, &y) in output.iter().enumerate() {
            let x = input.get(i).map_or(0.0, |&x| finite_or_zero(x));
            self.ring.write(kill_denormals(x * INPUT_MIX + y * FEEDBACK_MIX));
        }

        for y in output.iter_mut() {
            *y = soft_clip(*y);
        }

        self.stats.active = self.pool.active_count();
        self.stats.blocks += 1;
        true
    }
}

impl<R: RandomSource> core::fmt::Debug for GranularEngine<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GranularEngine")
            .field("sr", &self.sr)
            .field("params", &self.params)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
