//! C ABI wrapper for the Granulor engine.
//!
//! Exposes a small set of functions to create/destroy an engine, process mono
//! blocks with the host's own input, render a scene's seed voice through the
//! engine as interleaved f32, and change parameters.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `GranulorEngine` (heap-allocated; you own/delete it).
//! - Null handles or buffers are rejected with `false` / `0`, never a crash.
//! - Render path produces **mono** internally and duplicates to N channels.
//!
//! Threading
//! - The object is NOT thread-safe; call all functions from the same audio thread.
//!   `granulor_create*`, `granulor_reset` and `granulor_destroy` allocate.

use std::ffi::{c_char, CStr};

use granulor_engine::{
    BlockRunner, Generator, GranularEngine, ParameterUpdate, Scene, SceneKind,
};

/// Opaque engine wrapper we hand to C.
pub struct GranulorEngine {
    sr: f32,
    gain: f32,
    runner: BlockRunner<GranularEngine>,
    scene: Scene,
}

impl GranulorEngine {
    fn new(sr: f32, seed: u32, kind: SceneKind) -> Self {
        let sr = if sr.is_finite() { sr.max(1.0) } else { 48_000.0 };
        let mut engine = if seed == 0 {
            GranularEngine::new(sr)
        } else {
            GranularEngine::with_seed(sr, seed)
        };
        if let Err(e) = engine.apply(kind.parameters(sr)) {
            log::warn!("scene parameters rejected: {e}");
        }
        Self {
            sr,
            gain: 1.0,
            runner: BlockRunner::new(engine, sr),
            scene: Scene::new(kind, sr),
        }
    }

    #[inline]
    fn engine(&mut self) -> &mut GranularEngine {
        self.runner.processor_mut()
    }

    fn apply(&mut self, update: ParameterUpdate) -> bool {
        match self.engine().apply(update) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("parameter rejected: {e}");
                false
            }
        }
    }
}

/// Borrow the handle behind `engine`, or `None` for null.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[inline]
unsafe fn handle<'a>(engine: *mut GranulorEngine) -> Option<&'a mut GranulorEngine> {
    engine.as_mut()
}

// --- Creation / destruction -------------------------------------------------------

/// Create a new engine running the "slow-drone" scene.
/// `seed == 0` seeds from OS entropy; any other value gives a reproducible engine.
#[no_mangle]
pub extern "C" fn granulor_create(sample_rate: f32, seed: u32) -> *mut GranulorEngine {
    Box::into_raw(Box::new(GranulorEngine::new(sample_rate, seed, SceneKind::SlowDrone)))
}

/// Create a new engine running the named scene. Returns null for an unknown
/// name or a null/non-UTF-8 string.
///
/// # Safety
/// `scene` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn granulor_create_scene(
    sample_rate: f32,
    seed: u32,
    scene: *const c_char,
) -> *mut GranulorEngine {
    if scene.is_null() {
        return std::ptr::null_mut();
    }
    let Ok(name) = CStr::from_ptr(scene).to_str() else {
        return std::ptr::null_mut();
    };
    match name.parse::<SceneKind>() {
        Ok(kind) => Box::into_raw(Box::new(GranulorEngine::new(sample_rate, seed, kind))),
        Err(e) => {
            log::warn!("{e}");
            std::ptr::null_mut()
        }
    }
}

/// Destroy an engine previously returned by `granulor_create*`.
///
/// # Safety
/// `engine` must be null or a pointer from `granulor_create*` not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn granulor_destroy(engine: *mut GranulorEngine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Reset the engine to a new sample rate (e.g., when host changes device config).
/// Clears grains and the feedback buffer; parameters are kept.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_reset(engine: *mut GranulorEngine, sample_rate: f32) -> bool {
    let Some(e) = handle(engine) else { return false };
    if !sample_rate.is_finite() || sample_rate < 1.0 {
        return false;
    }
    e.sr = sample_rate;
    e.runner.set_sample_rate(sample_rate);
    e.scene.reset(sample_rate);
    true
}

// --- Rendering -------------------------------------------------------------------

/// Process one mono block: `frames` samples of `input` (may be null for
/// silence) into `output`. Returns `true` while the engine wants to keep running.
///
/// # Safety
/// `input` must be null or valid for `frames` reads; `output` valid for `frames` writes.
#[no_mangle]
pub unsafe extern "C" fn granulor_process_block(
    engine: *mut GranulorEngine,
    input: *const f32,
    output: *mut f32,
    frames: u32,
) -> bool {
    let Some(e) = handle(engine) else { return false };
    if output.is_null() {
        return false;
    }
    let n = frames as usize;
    let out = std::slice::from_raw_parts_mut(output, n);
    let inp = if input.is_null() { None } else { Some(std::slice::from_raw_parts(input, n)) };
    e.engine().process(inp, out)
}

/// Render `frames` of the scene's seed voice through the engine into an
/// interleaved f32 buffer with `channels` channels.
///
/// Returns the number of frames rendered (0 on error).
///
/// # Safety
/// `out_interleaved` must be valid for `frames * channels` writes.
#[no_mangle]
pub unsafe extern "C" fn granulor_render_interleaved_f32(
    engine: *mut GranulorEngine,
    out_interleaved: *mut f32,
    frames: u32,
    channels: u32,
) -> u32 {
    let Some(e) = handle(engine) else { return 0 };
    if out_interleaved.is_null() || frames == 0 || channels == 0 {
        return 0;
    }
    let ch = channels as usize;
    let out = std::slice::from_raw_parts_mut(out_interleaved, frames as usize * ch);

    for frame in out.chunks_exact_mut(ch) {
        let s = (e.runner.next(e.scene.next()) * e.gain).clamp(-1.0, 1.0);
        frame.fill(s);
    }
    frames
}

// --- Parameters ------------------------------------------------------------------
//
// Each setter applies at the start of the next block. Out-of-range values are
// clamped; non-finite values are rejected with `false`.

/// Set output gain applied by `granulor_render_interleaved_f32`.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_set_gain(engine: *mut GranulorEngine, gain: f32) -> bool {
    let Some(e) = handle(engine) else { return false };
    if !gain.is_finite() {
        return false;
    }
    e.gain = gain.max(0.0);
    true
}

/// Grains spawned per second.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_set_density(engine: *mut GranulorEngine, density: f32) -> bool {
    handle(engine).is_some_and(|e| e.apply(ParameterUpdate::new().density(density)))
}

/// Playback-rate multiplier for new grains.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_set_pitch(engine: *mut GranulorEngine, pitch: f32) -> bool {
    handle(engine).is_some_and(|e| e.apply(ParameterUpdate::new().pitch(pitch)))
}

/// Grain length in samples.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_set_grain_size(engine: *mut GranulorEngine, samples: u32) -> bool {
    handle(engine).is_some_and(|e| e.apply(ParameterUpdate::new().grain_size(samples)))
}

/// Attack share of the grain envelope, 0..1.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_set_attack(engine: *mut GranulorEngine, attack: f32) -> bool {
    handle(engine).is_some_and(|e| e.apply(ParameterUpdate::new().attack(attack)))
}

/// Freeze new grains onto the window that was current when freezing started.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_set_freeze(engine: *mut GranulorEngine, freeze: bool) -> bool {
    handle(engine).is_some_and(|e| e.apply(ParameterUpdate::new().freeze(freeze)))
}

/// Enable or stop grain spawning. Grains already playing finish.
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_set_active(engine: *mut GranulorEngine, active: bool) -> bool {
    handle(engine).is_some_and(|e| e.apply(ParameterUpdate::new().active(active)))
}

/// Grains active at the end of the last block (0 for a null handle).
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_active_grains(engine: *mut GranulorEngine) -> u32 {
    handle(engine).map_or(0, |e| u32::try_from(e.engine().stats().active).unwrap_or(u32::MAX))
}

/// Sample rate the engine currently runs at (0 for a null handle).
///
/// # Safety
/// `engine` must be null or a live pointer from `granulor_create*`.
#[no_mangle]
pub unsafe extern "C" fn granulor_sample_rate(engine: *mut GranulorEngine) -> f32 {
    handle(engine).map_or(0.0, |e| e.sr)
}
