//! Configuration file and the settings the player actually runs with.
//!
//! The file is optional. Precedence, lowest first: scene preset, file, command line.
//!
//! ```toml
//! scene = "slow-drone"
//! gain = 0.6
//! seed = 7
//!
//! [params]
//! density = 40
//! grainSize = 4800
//!
//! [[automation]]
//! at = 5.0
//! freeze = true
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use granulor_engine::{Cue, ParameterUpdate, SceneKind};
use serde::Deserialize;

pub(crate) const DEFAULT_GAIN: f32 = 0.35;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub scene: Option<SceneKind>,
    pub gain: Option<f32>,
    pub seed: Option<u32>,
    /// Base parameters, applied over the scene preset.
    pub params: ParameterUpdate,
    /// Timed parameter changes, seconds from start.
    pub automation: Vec<Cue>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// What to play, resolved from presets, the file and the command line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub scene: SceneKind,
    pub gain: f32,
    pub seed: Option<u32>,
    /// Merged starting parameters, except for `grain_ms` which needs the sample rate.
    pub params: ParameterUpdate,
    pub grain_ms: Option<f32>,
    pub cues: Vec<Cue>,
}

impl Settings {
    pub fn resolve(args: &crate::args::Args, config: Config) -> Result<Self> {
        let gain = args.gain.or(config.gain).unwrap_or(DEFAULT_GAIN);
        anyhow::ensure!(gain.is_finite() && gain >= 0.0, "gain must be a finite, non-negative number, got {gain}");
        if let Some(d) = args.duration {
            anyhow::ensure!(d.is_finite() && d >= 0.0, "duration must be a finite, non-negative number of seconds, got {d}");
        }

        let scene = args.scene.or(config.scene).unwrap_or(SceneKind::SlowDrone);

        let mut cli = ParameterUpdate::new();
        cli.density = args.density;
        cli.pitch = args.pitch;
        if args.freeze {
            cli.freeze = Some(true);
        }

        let mut cues = scene.cues();
        cues.extend(config.automation);

        Ok(Self {
            scene,
            gain,
            seed: args.seed.or(config.seed),
            params: config.params.merge(&cli),
            grain_ms: args.grain_ms,
            cues,
        })
    }

    /// Everything the engine should start with at sample rate `sr`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn initial_update(&self, sr: f32) -> ParameterUpdate {
        let mut update = self.scene.parameters(sr).merge(&self.params);
        if let Some(ms) = self.grain_ms.filter(|ms| ms.is_finite()) {
            update.grain_size = Some((ms * 0.001 * sr).round().max(1.0) as u32);
        }
        update
    }
}
