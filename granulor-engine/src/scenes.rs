//! Scene presets: a seed voice that feeds the engine's input, the parameters
//! the engine starts from, and a few timed cues.
//!
//! Scenes are **mono** generators implementing [`Generator`](crate::graph::Generator);
//! keep them allocation-free and cheap per sample.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::graph::Generator;
use crate::nodes::{Lfo, Noise, NoiseMod, Osc, Wave};
use crate::params::ParameterUpdate;
use granulor_core::dsp::seconds_to_samples;
use granulor_core::envelopes::SlewLimiter;
use granulor_core::filters::{OnePoleHP, OnePoleLP};

/// Available presets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SceneKind {
    /// Tri + saw drone at A2, moderate density, unit pitch.
    SlowDrone,
    /// Dense, short, upward-shifted grains over a breathy sine.
    Swarm,
    /// Long, low grains that freeze into a static chord after a few seconds.
    FrozenChoir,
    /// A handful of long grains per second over filtered noise.
    Sparse,
}

impl SceneKind {
    pub const ALL: [SceneKind; 4] = [Self::SlowDrone, Self::Swarm, Self::FrozenChoir, Self::Sparse];

    pub fn name(self) -> &'static str {
        match self {
            Self::SlowDrone => "slow-drone",
            Self::Swarm => "swarm",
            Self::FrozenChoir => "frozen-choir",
            Self::Sparse => "sparse",
        }
    }

    /// Parameters the engine should start from at sample rate `sr`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn parameters(self, sr: f32) -> ParameterUpdate {
        let ms = |v: f32| seconds_to_samples(v * 0.001, sr).min(u32::MAX as usize) as u32;
        match self {
            Self::SlowDrone => ParameterUpdate::new()
                .density(20.0).pitch(1.0).grain_size(ms(120.0)).attack(0.2).freeze(false),
            Self::Swarm => ParameterUpdate::new()
                .density(150.0).pitch(1.5).grain_size(ms(40.0)).attack(0.05).freeze(false),
            Self::FrozenChoir => ParameterUpdate::new()
                .density(60.0).pitch(0.5).grain_size(ms(250.0)).attack(0.3).freeze(false),
            Self::Sparse => ParameterUpdate::new()
                .density(5.0).pitch(0.75).grain_size(ms(400.0)).attack(0.4).freeze(false),
        }
    }

    /// Timed parameter changes that belong to the preset.
    pub fn cues(self) -> Vec<Cue> {
        match self {
            Self::FrozenChoir => vec![Cue::new(4.0, ParameterUpdate::new().freeze(true))],
            Self::SlowDrone | Self::Swarm | Self::Sparse => Vec::new(),
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown scene name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scene `{0}` (expected one of: slow-drone, swarm, frozen-choir, sparse)")]
pub struct UnknownScene(pub String);

impl FromStr for SceneKind {
    type Err = UnknownScene;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| UnknownScene(s.to_string()))
    }
}

// -------------------------------------------------------------------------------------------------

/// A parameter update scheduled at `at` seconds from the start.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub at: f32,
    #[serde(flatten)]
    pub update: ParameterUpdate,
}

impl Cue {
    pub fn new(at: f32, update: ParameterUpdate) -> Self {
        Self { at, update }
    }
}

/// Cues sorted by time, handed out as the clock passes them.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    cues: Vec<Cue>,
    next: usize,
}

impl Timeline {
    pub fn new(mut cues: Vec<Cue>) -> Self {
        cues.retain(|c| c.at.is_finite());
        cues.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { cues, next: 0 }
    }

    /// Cues with `at <= now` that have not been returned yet, merged into one update.
    pub fn due(&mut self, now: f32) -> Option<ParameterUpdate> {
        let mut merged: Option<ParameterUpdate> = None;
        while let Some(cue) = self.cues.get(self.next) {
            if cue.at > now {
                break;
            }
            merged = Some(merged.unwrap_or_default().merge(&cue.update));
            self.next += 1;
        }
        merged
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.cues.len()
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

// -------------------------------------------------------------------------------------------------

/// Seed voice for a preset.
///
/// Two detuned oscillators with slow drift, a little noise, low-pass tone
/// control and a DC-blocking high-pass so the feedback buffer stays centered.
/// The level swells in over the first couple of seconds.
#[derive(Copy, Clone)]
pub struct Scene {
    kind: SceneKind,
    osc_a: Osc,
    osc_b: Osc,
    lfo_cut: Lfo,
    drift: NoiseMod,
    noise: Noise,
    lp: OnePoleLP,
    hp: OnePoleHP,
    swell: SlewLimiter,
    sr: f32,
    base_hz: f32,
    ratio_b: f32,
    base_cut: f32,
    cut_span: f32,
    noise_mix: f32,
    level: f32,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("kind", &self.kind)
            .field("sr", &self.sr)
            .finish_non_exhaustive()
    }
}

impl Scene {
    pub fn new(kind: SceneKind, sr: f32) -> Self {
        // (base Hz, wave a, wave b, ratio b, cutoff, cutoff span, noise, level)
        let (base_hz, wave_a, wave_b, ratio_b, base_cut, cut_span, noise_mix, level) = match kind {
            SceneKind::SlowDrone   => (110.0, Wave::Tri,  Wave::Saw,  0.498, 900.0,  600.0, 0.02, 0.5),
            SceneKind::Swarm       => (220.0, Wave::Sine, Wave::Tri,  1.5,   2400.0, 1200.0, 0.15, 0.4),
            SceneKind::FrozenChoir => (146.8, Wave::Saw,  Wave::Saw,  1.26,  1200.0, 500.0, 0.03, 0.45),
            SceneKind::Sparse      => (65.4,  Wave::Sine, Wave::Tri,  2.0,   600.0,  300.0, 0.35, 0.5),
        };
        let sr = sr.max(1.0);
        let mut swell = SlewLimiter::new(700.0, sr);
        swell.reset(0.0);
        Self {
            kind,
            osc_a: Osc::new(base_hz, wave_a),
            osc_b: Osc::new(base_hz * ratio_b, wave_b),
            lfo_cut: Lfo::sine(0.05),
            drift: NoiseMod::new(-6.0, 6.0, 7.5, 0.25, sr, 0x5EED),
            noise: Noise::new(0xB2EA7),
            lp: OnePoleLP::new(base_cut, sr),
            hp: OnePoleHP::new(20.0, sr),
            swell,
            sr,
            base_hz,
            ratio_b,
            base_cut,
            cut_span,
            noise_mix,
            level,
        }
    }

    /// Seed voice for a preset given by name (`"slow-drone"`, `"swarm"`, ...).
    pub fn from_name(name: &str, sr: f32) -> Result<Self, UnknownScene> {
        let kind = name.parse::<SceneKind>()?;
        log::info!("scene: {kind}");
        Ok(Self::new(kind, sr))
    }

    #[inline] pub fn kind(&self) -> SceneKind { self.kind }

    /// Output level of the seed voice, clamped to [0, 1].
    #[inline] pub fn set_level(&mut self, level: f32) { self.level = level.clamp(0.0, 1.0); }

    #[inline]
    fn cents_to_ratio(c: f32) -> f32 {
        (core::f32::consts::LN_2 * (c / 1200.0)).exp()
    }
}

impl Generator for Scene {
    #[inline]
    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.lp.set_sample_rate(self.sr);
        self.hp.set_sample_rate(self.sr);
        self.drift.reset_sr(self.sr);
        self.swell.set_time_ms(700.0, self.sr);
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let sr = self.sr;

        let lfo01 = self.lfo_cut.next01(sr);
        let cut = self.base_cut + (lfo01 - 0.5) * 2.0 * self.cut_span;
        self.lp.set_cutoff_hz(cut.max(80.0));

        let cents = self.drift.next(sr);
        self.osc_a.set_freq(self.base_hz * Self::cents_to_ratio(cents));
        self.osc_b.set_freq(self.base_hz * self.ratio_b * Self::cents_to_ratio(-cents));

        let tone = 0.5 * (self.osc_a.next(sr) + self.osc_b.next(sr));
        let x = tone * (1.0 - self.noise_mix) + self.noise.next() * self.noise_mix;
        let y = self.hp.process(self.lp.process(x));

        let g = self.swell.process(self.level);
        (y * g).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in SceneKind::ALL {
            assert_eq!(kind.name().parse::<SceneKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!("Frozen_Choir".parse::<SceneKind>(), Ok(SceneKind::FrozenChoir));
        assert!("polka".parse::<SceneKind>().is_err());
    }

    #[test]
    fn presets_pass_validation() {
        for kind in SceneKind::ALL {
            let p = kind.parameters(48_000.0);
            assert_eq!(p.validated(), Ok(p), "{kind}");
            assert!(p.grain_size.unwrap() > 0);
        }
    }

    #[test]
    fn seed_voices_are_bounded_and_audible() {
        for kind in SceneKind::ALL {
            let mut scene = Scene::new(kind, 48_000.0);
            let mut peak = 0.0_f32;
            for _ in 0..96_000 {
                let s = scene.next();
                assert!((-1.0..=1.0).contains(&s));
                peak = peak.max(s.abs());
            }
            assert!(peak > 0.01, "{kind} peak={peak}");
        }
    }

    #[test]
    fn timeline_hands_out_cues_once_in_order() {
        let mut tl = Timeline::new(vec![
            Cue::new(2.0, ParameterUpdate::new().density(50.0)),
            Cue::new(1.0, ParameterUpdate::new().density(10.0).pitch(2.0)),
            Cue::new(1.5, ParameterUpdate::new().density(30.0)),
            Cue::new(f32::NAN, ParameterUpdate::new().active(false)),
        ]);
        assert_eq!(tl.len(), 3);
        assert_eq!(tl.due(0.5), None);
        assert_eq!(tl.due(1.6), Some(ParameterUpdate::new().density(30.0).pitch(2.0)));
        assert_eq!(tl.due(1.7), None);
        assert!(!tl.is_finished());
        assert_eq!(tl.due(10.0), Some(ParameterUpdate::new().density(50.0)));
        assert!(tl.is_finished());
    }

    #[test]
    fn scene_from_name() {
        assert_eq!(Scene::from_name("sparse", 44_100.0).unwrap().kind(), SceneKind::Sparse);
        assert_eq!(
            Scene::from_name("organ", 44_100.0).unwrap_err(),
            UnknownScene("organ".to_string())
        );
    }

    #[test]
    fn frozen_choir_freezes_later() {
        let cues = SceneKind::FrozenChoir.cues();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].update.freeze, Some(true));
        assert!(SceneKind::SlowDrone.cues().is_empty());
    }
}
