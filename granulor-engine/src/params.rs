//! Engine parameters and their lock-free delivery from a control thread.
//!
//! A control thread owns a [`ParameterSender`]; the audio thread owns the
//! matching [`ParameterInbox`] inside the engine. Updates travel through a
//! bounded `crossbeam_queue::ArrayQueue`, so neither side ever blocks or takes a
//! lock. The inbox is drained once at the start of every block and each message
//! is merged field by field: whatever a message leaves unset keeps its prior
//! value. Consistency across separate messages is eventual.

use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use serde::{Deserialize, Serialize};

use crate::error::ParamError;
use granulor_core::dsp::seconds_to_samples;

/// Lowest playback rate accepted at ingestion.
pub const MIN_PITCH: f32 = 0.001;
/// Highest playback rate accepted at ingestion.
pub const MAX_PITCH: f32 = 16.0;
/// Upper bound on the requested spawn rate (grains per second).
pub const MAX_DENSITY: f32 = 10_000.0;
/// Pending updates the queue holds before `send` reports `QueueFull`.
pub const PARAM_QUEUE_CAPACITY: usize = 64;

const DEFAULT_GRAIN_SECONDS: f32 = 0.1;

/// The control surface read by the audio thread once per block.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineParameters {
    /// Target grains per second.
    pub density: f32,
    /// Base playback rate.
    pub pitch: f32,
    /// Nominal grain length in samples.
    pub grain_size: u32,
    /// Nominal attack fraction of each grain.
    pub attack: f32,
    /// Read every new grain from one latched historical window.
    pub freeze: bool,
    /// Gates new spawns; running grains always finish.
    pub active: bool,
}

impl EngineParameters {
    /// Defaults for a given sample rate (grain size is 100 ms worth of samples).
    #[allow(clippy::cast_possible_truncation)]
    pub fn for_sample_rate(sr: f32) -> Self {
        let grain_size = seconds_to_samples(DEFAULT_GRAIN_SECONDS, sr).min(u32::MAX as usize) as u32;
        Self {
            density: 20.0,
            pitch: 1.0,
            grain_size,
            attack: 0.1,
            freeze: false,
            active: true,
        }
    }

    /// Merge `update` into `self`. Unset fields are left alone.
    #[inline]
    pub fn apply(&mut self, update: &ParameterUpdate) {
        if let Some(v) = update.density { self.density = v; }
        if let Some(v) = update.pitch { self.pitch = v; }
        if let Some(v) = update.grain_size { self.grain_size = v; }
        if let Some(v) = update.attack { self.attack = v; }
        if let Some(v) = update.freeze { self.freeze = v; }
        if let Some(v) = update.active { self.active = v; }
    }
}

/// A partial parameter message: `{ density?, pitch?, grainSize?, attack?, freeze?, active? }`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterUpdate {
    pub density: Option<f32>,
    pub pitch: Option<f32>,
    #[serde(alias = "grain_size")]
    pub grain_size: Option<u32>,
    pub attack: Option<f32>,
    pub freeze: Option<bool>,
    pub active: Option<bool>,
}

impl ParameterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn density(mut self, v: f32) -> Self { self.density = Some(v); self }
    pub fn pitch(mut self, v: f32) -> Self { self.pitch = Some(v); self }
    pub fn grain_size(mut self, v: u32) -> Self { self.grain_size = Some(v); self }
    pub fn attack(mut self, v: f32) -> Self { self.attack = Some(v); self }
    pub fn freeze(mut self, v: bool) -> Self { self.freeze = Some(v); self }
    pub fn active(mut self, v: bool) -> Self { self.active = Some(v); self }

    /// True when the message carries no fields at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold `later` on top of `self`; fields set in `later` win.
    pub fn merge(mut self, later: &ParameterUpdate) -> Self {
        if later.density.is_some() { self.density = later.density; }
        if later.pitch.is_some() { self.pitch = later.pitch; }
        if later.grain_size.is_some() { self.grain_size = later.grain_size; }
        if later.attack.is_some() { self.attack = later.attack; }
        if later.freeze.is_some() { self.freeze = later.freeze; }
        if later.active.is_some() { self.active = later.active; }
        self
    }

    /// Ingestion check, run on the control side so the audio loop stays branch-free.
    ///
    /// Non-finite numbers are refused. Out-of-range values are clamped:
    /// `density` to `[0, MAX_DENSITY]`, `pitch` to `[MIN_PITCH, MAX_PITCH]`,
    /// `grain_size` to at least one sample, `attack` to `[0, 1]`.
    pub fn validated(mut self) -> Result<Self, ParamError> {
        if let Some(v) = self.density {
            self.density = Some(clamp_field("density", v, 0.0, MAX_DENSITY)?);
        }
        if let Some(v) = self.pitch {
            self.pitch = Some(clamp_field("pitch", v, MIN_PITCH, MAX_PITCH)?);
        }
        if let Some(v) = self.attack {
            self.attack = Some(clamp_field("attack", v, 0.0, 1.0)?);
        }
        if self.grain_size == Some(0) {
            log::warn!("parameter `grainSize` of 0 samples clamped to 1");
            self.grain_size = Some(1);
        }
        Ok(self)
    }
}

fn clamp_field(field: &'static str, v: f32, lo: f32, hi: f32) -> Result<f32, ParamError> {
    if !v.is_finite() {
        log::warn!("rejected parameter `{field}`: {v}");
        return Err(ParamError::NonFinite { field });
    }
    let c = v.clamp(lo, hi);
    if c != v {
        log::warn!("parameter `{field}` = {v} clamped to {c}");
    }
    Ok(c)
}

// -------------------------------------------------------------------------------------------------

/// Control-thread handle for pushing parameter updates to an engine.
///
/// Cloneable; every clone feeds the same engine.
#[derive(Clone, Debug)]
pub struct ParameterSender {
    queue: Arc<ArrayQueue<ParameterUpdate>>,
}

impl ParameterSender {
    /// Validate `update` and queue it for the next block.
    pub fn send(&self, update: ParameterUpdate) -> Result<(), ParamError> {
        let update = update.validated()?;
        self.queue.push(update).map_err(|_| {
            log::warn!("parameter queue full, dropping update");
            ParamError::QueueFull { capacity: self.queue.capacity() }
        })
    }

    /// Number of updates waiting for the audio thread.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Audio-thread end of the parameter queue.
#[derive(Debug)]
pub struct ParameterInbox {
    queue: Arc<ArrayQueue<ParameterUpdate>>,
}

impl ParameterInbox {
    /// Create a connected inbox/sender pair.
    pub fn new(capacity: usize) -> (Self, ParameterSender) {
        let queue = Arc::new(ArrayQueue::new(capacity.max(1)));
        let sender = ParameterSender { queue: Arc::clone(&queue) };
        (Self { queue }, sender)
    }

    /// Another sender for this inbox.
    pub fn sender(&self) -> ParameterSender {
        ParameterSender { queue: Arc::clone(&self.queue) }
    }

    /// Merge every pending update into `params`. Returns the number applied.
    /// Lock free and allocation free.
    #[inline]
    pub fn drain_into(&self, params: &mut EngineParameters) -> usize {
        let mut n = 0;
        while let Some(update) = self.queue.pop() {
            params.apply(&update);
            n += 1;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scale_with_sample_rate() {
        assert_eq!(EngineParameters::for_sample_rate(48_000.0).grain_size, 4_800);
        assert_eq!(EngineParameters::for_sample_rate(44_100.0).grain_size, 4_410);
    }

    #[test]
    fn apply_merges_only_set_fields() {
        let mut p = EngineParameters::for_sample_rate(48_000.0);
        let before = p;
        p.apply(&ParameterUpdate::new().pitch(2.0).freeze(true));
        assert_eq!(p.pitch, 2.0);
        assert!(p.freeze);
        assert_eq!(p.density, before.density);
        assert_eq!(p.grain_size, before.grain_size);
        assert_eq!(p.attack, before.attack);
        assert_eq!(p.active, before.active);
    }

    #[test]
    fn validation_clamps_and_rejects() {
        let u = ParameterUpdate::new()
            .density(-3.0)
            .pitch(0.0)
            .grain_size(0)
            .attack(1.5)
            .validated()
            .unwrap();
        assert_eq!(u.density, Some(0.0));
        assert_eq!(u.pitch, Some(MIN_PITCH));
        assert_eq!(u.grain_size, Some(1));
        assert_eq!(u.attack, Some(1.0));

        let err = ParameterUpdate::new().pitch(f32::NAN).validated().unwrap_err();
        assert_eq!(err, ParamError::NonFinite { field: "pitch" });
    }

    #[test]
    fn later_updates_win_on_merge() {
        let a = ParameterUpdate::new().density(10.0).pitch(1.0);
        let b = ParameterUpdate::new().pitch(0.5);
        let m = a.merge(&b);
        assert_eq!(m.density, Some(10.0));
        assert_eq!(m.pitch, Some(0.5));
        assert!(ParameterUpdate::new().is_empty());
        assert!(!m.is_empty());
    }

    #[test]
    fn queue_delivers_in_order_and_reports_full() {
        let (inbox, tx) = ParameterInbox::new(2);
        tx.send(ParameterUpdate::new().density(5.0)).unwrap();
        tx.send(ParameterUpdate::new().density(7.0)).unwrap();
        assert_eq!(
            tx.send(ParameterUpdate::new().density(9.0)),
            Err(ParamError::QueueFull { capacity: 2 })
        );
        assert_eq!(tx.pending(), 2);

        let mut p = EngineParameters::for_sample_rate(48_000.0);
        assert_eq!(inbox.drain_into(&mut p), 2);
        assert_eq!(p.density, 7.0);
        assert_eq!(tx.pending(), 0);
    }

    #[test]
    fn sender_works_across_threads() {
        let (inbox, tx) = ParameterInbox::new(PARAM_QUEUE_CAPACITY);
        let handle = std::thread::spawn(move || {
            tx.send(ParameterUpdate::new().active(false)).unwrap();
        });
        handle.join().unwrap();
        let mut p = EngineParameters::for_sample_rate(48_000.0);
        inbox.drain_into(&mut p);
        assert!(!p.active);
    }

    #[test]
    fn message_deserializes_from_key_value_form() {
        let u: ParameterUpdate = toml::from_str("density = 40.0\ngrainSize = 2400\nfreeze = true").unwrap();
        assert_eq!(u, ParameterUpdate::new().density(40.0).grain_size(2400).freeze(true));

        let snake: ParameterUpdate = toml::from_str("grain_size = 100").unwrap();
        assert_eq!(snake.grain_size, Some(100));
    }
}
