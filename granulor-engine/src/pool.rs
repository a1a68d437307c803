//! Fixed pool of reusable grain slots.
//!
//! Nothing is allocated after construction: a grain is "spawned" by filling a
//! free slot and "retired" by clearing its `active` flag. Free slots sit on an
//! index stack, so spawning is O(1); rendering walks the slot array once and
//! retires finished grains inline.

use granulor_core::envelopes::{fit_ramps, grain_envelope};
use granulor_core::random::RandomSource;

use crate::params::{EngineParameters, MIN_PITCH};

/// Pool capacity.
pub const MAX_GRAINS: usize = 200;
/// Per-grain pitch jitter (±10 %).
pub const PITCH_JITTER: f32 = 0.1;
/// Per-grain duration jitter (±20 %).
pub const DURATION_JITTER: f32 = 0.2;
/// Decay fraction is drawn from `[DECAY_MIN, DECAY_MAX)`.
pub const DECAY_MIN: f32 = 0.3;
pub const DECAY_MAX: f32 = 0.5;

/// One grain slot. Its only identity is its index in the pool.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Grain {
    pub active: bool,
    /// Samples rendered so far; `position < duration` while active.
    pub position: u32,
    /// Total length in samples, at least 1.
    pub duration: u32,
    /// Read-head advance per output sample.
    pub pitch: f32,
    /// Fraction of the duration spent ramping in.
    pub attack: f32,
    /// Fraction of the duration spent ramping out.
    pub decay: f32,
    /// Ring-buffer index the grain starts reading from.
    pub buffer_start: usize,
}

impl Grain {
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f32 {
        self.position as f32 / self.duration as f32
    }

    /// Window gain at the current position.
    #[inline]
    pub fn envelope(&self) -> f32 {
        grain_envelope(self.progress(), self.attack, self.decay)
    }

    /// Fractional ring-buffer position for the current sample.
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    pub fn read_position(&self) -> f64 {
        self.buffer_start as f64 + f64::from(self.position) * f64::from(self.pitch)
    }

    /// Step one sample. Returns false once the grain has played out.
    #[inline]
    pub fn advance(&mut self) -> bool {
        self.position += 1;
        self.position < self.duration
    }
}

/// `MAX_GRAINS` grain slots plus a stack of free slot indices.
#[derive(Clone, Debug)]
pub struct GrainPool {
    grains: [Grain; MAX_GRAINS],
    free: [u16; MAX_GRAINS],
    free_len: usize,
}

impl Default for GrainPool {
    fn default() -> Self {
        Self::new()
    }
}

impl GrainPool {
    #[allow(clippy::cast_possible_truncation)]
    pub fn new() -> Self {
        let mut free = [0u16; MAX_GRAINS];
        // lowest index on top of the stack
        for (slot, idx) in free.iter_mut().zip((0..MAX_GRAINS).rev()) {
            *slot = idx as u16;
        }
        Self { grains: [Grain::default(); MAX_GRAINS], free, free_len: MAX_GRAINS }
    }

    #[inline] pub fn capacity(&self) -> usize { MAX_GRAINS }
    #[inline] pub fn active_count(&self) -> usize { MAX_GRAINS - self.free_len }
    #[inline] pub fn is_saturated(&self) -> bool { self.free_len == 0 }

    /// Fill a free slot with a jittered grain starting at `buffer_start`.
    ///
    /// Returns `false` when every slot is busy; the spawn is simply dropped.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn spawn<R: RandomSource>(
        &mut self,
        params: &EngineParameters,
        buffer_start: usize,
        rng: &mut R,
    ) -> bool {
        if self.free_len == 0 {
            return false;
        }
        self.free_len -= 1;
        let idx = self.free[self.free_len] as usize;

        let pitch = (params.pitch * (1.0 + rng.bipolar() * PITCH_JITTER)).max(MIN_PITCH);
        let duration = params.grain_size as f32 * (1.0 + rng.bipolar() * DURATION_JITTER);
        let duration = (duration as u32).max(1);
        let (attack, decay) = fit_ramps(params.attack, rng.range(DECAY_MIN, DECAY_MAX));

        self.grains[idx] = Grain {
            active: true,
            position: 0,
            duration,
            pitch,
            attack,
            decay,
            buffer_start,
        };
        true
    }

    /// Visit every active grain. `f` returns whether the grain stays alive;
    /// grains it rejects are retired on the spot.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn for_each_active<F: FnMut(&mut Grain) -> bool>(&mut self, mut f: F) {
        for (idx, grain) in self.grains.iter_mut().enumerate() {
            if !grain.active {
                continue;
            }
            if !f(grain) {
                grain.active = false;
                self.free[self.free_len] = idx as u16;
                self.free_len += 1;
            }
        }
    }

    /// Read-only view of the active grains.
    pub fn active(&self) -> impl Iterator<Item = &Grain> + '_ {
        self.grains.iter().filter(|g| g.active)
    }

    /// Retire everything.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
