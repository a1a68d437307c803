//! Command-line arguments. Anything given here overrides the config file.

use std::path::PathBuf;

use clap::Parser;
use granulor_engine::SceneKind;

/// Granulor - realtime feedback granular player and offline renderer
#[derive(Parser, Debug, Default)]
#[command(name = "granulor")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// List scene presets and exit
    #[arg(long)]
    pub list_scenes: bool,

    /// Output device name (default: system default)
    #[arg(long)]
    pub device: Option<String>,

    /// Requested sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Requested channel count (the engine is mono, every channel gets the same signal)
    #[arg(long)]
    pub channels: Option<u16>,

    /// Stop after this many seconds (realtime), or the length of the render
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<f32>,

    /// Scene preset: slow-drone, swarm, frozen-choir, sparse
    #[arg(long)]
    pub scene: Option<SceneKind>,

    /// Output gain applied after the engine
    #[arg(long)]
    pub gain: Option<f32>,

    /// Seed for grain jitter (default: OS entropy)
    #[arg(long)]
    pub seed: Option<u32>,

    /// Grains per second
    #[arg(long)]
    pub density: Option<f32>,

    /// Playback-rate multiplier for new grains
    #[arg(long)]
    pub pitch: Option<f32>,

    /// Grain length in milliseconds
    #[arg(long, value_name = "MS")]
    pub grain_ms: Option<f32>,

    /// Start frozen
    #[arg(long)]
    pub freeze: bool,

    /// TOML file with scene, gain, seed, [params] and [[automation]]
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Render offline to a WAV file instead of opening a device
    #[arg(long, value_name = "WAV")]
    pub render: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_flags() {
        let a = Args::try_parse_from([
            "granulor", "--scene", "frozen-choir", "--gain=0.4", "--seed", "9",
            "--render", "out.wav", "--duration", "12.5", "--freeze",
        ])
        .unwrap();
        assert_eq!(a.scene, Some(SceneKind::FrozenChoir));
        assert_eq!(a.gain, Some(0.4));
        assert_eq!(a.seed, Some(9));
        assert_eq!(a.duration, Some(12.5));
        assert!(a.freeze);
        assert_eq!(a.render.as_deref(), Some(std::path::Path::new("out.wav")));
    }

    #[test]
    fn rejects_unknown_scene() {
        assert!(Args::try_parse_from(["granulor", "--scene", "polka"]).is_err());
    }
}
