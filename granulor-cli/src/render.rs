//! Offline rendering to a WAV file with `hound`.
//!
//! Same signal path as the realtime player: seed voice into the engine, cues
//! applied at block boundaries, gain and hard limit, mono copied to every channel.

use std::path::Path;

use anyhow::{Context, Result};
use granulor_engine::{
    EngineStats, Generator, GranularEngine, Scene, Timeline, RENDER_QUANTUM,
};

use crate::config::Settings;

/// What a render produced.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderSummary {
    pub frames: usize,
    pub peak: f32,
    pub stats: EngineStats,
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn render_wav(
    path: &Path,
    settings: &Settings,
    sample_rate: u32,
    channels: u16,
    seconds: f32,
) -> Result<RenderSummary> {
    anyhow::ensure!(sample_rate > 0, "sample rate must be positive");
    anyhow::ensure!(channels > 0, "channel count must be positive");
    anyhow::ensure!(seconds.is_finite() && seconds >= 0.0, "invalid duration {seconds}");
    anyhow::ensure!(settings.gain.is_finite(), "invalid gain {}", settings.gain);

    let sr = sample_rate as f32;
    let mut engine = crate::build_engine(settings, sr)?;
    let mut scene = Scene::new(settings.scene, sr);
    let mut timeline = Timeline::new(settings.cues.clone());

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;

    let total = (f64::from(seconds) * f64::from(sample_rate)).round() as usize;
    let mut input = [0.0_f32; RENDER_QUANTUM];
    let mut output = [0.0_f32; RENDER_QUANTUM];
    let mut frames = 0usize;
    let mut peak = 0.0_f32;

    while frames < total {
        let now = frames as f32 / sr;
        if let Some(update) = timeline.due(now) {
            log::info!("{now:.2}s: {update:?}");
            apply(&mut engine, update)?;
        }

        input.iter_mut().for_each(|x| *x = scene.next());
        engine.process(Some(&input[..]), &mut output);

        let n = (total - frames).min(RENDER_QUANTUM);
        for &y in &output[..n] {
            let s = (y * settings.gain).clamp(-1.0, 1.0);
            peak = peak.max(s.abs());
            for _ in 0..channels {
                writer.write_sample(s)?;
            }
        }
        frames += n;
    }
    writer.finalize().with_context(|| format!("finalizing {}", path.display()))?;

    Ok(RenderSummary { frames, peak, stats: engine.stats() })
}

fn apply(engine: &mut GranularEngine, update: granulor_engine::ParameterUpdate) -> Result<()> {
    engine.apply(update).context("automation cue")
}
