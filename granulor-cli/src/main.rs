//! Granulor CLI - realtime player and offline renderer for the feedback granular engine.

mod args;
mod config;
mod meter;
mod render;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use granulor_engine::{
    BlockRunner, GranularEngine, ParameterSender, Scene, SceneKind, Timeline,
};

use crate::args::Args;
use crate::config::{Config, Settings};
use crate::meter::Meter;

/// Render length when `--render` is given without `--duration`.
const DEFAULT_RENDER_SECONDS: f32 = 30.0;
const DEFAULT_RENDER_RATE: u32 = 48_000;
/// How often the control loop checks the cue timeline.
const CONTROL_TICK: Duration = Duration::from_millis(20);

/// Engine for `settings` at `sr`, with its starting parameters applied.
pub(crate) fn build_engine(settings: &Settings, sr: f32) -> Result<GranularEngine> {
    let engine = match settings.seed {
        Some(seed) => GranularEngine::with_seed(sr, seed),
        None => GranularEngine::new(sr),
    };
    engine
        .with_parameters(settings.initial_update(sr))
        .context("starting parameters")
}

fn list_output_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn list_scenes() {
    println!("Available scenes:");
    for kind in SceneKind::ALL {
        let p = kind.parameters(48_000.0);
        println!(
            "- {kind:<13} density {:>5}/s  pitch {:>4}  cues {}",
            p.density.unwrap_or_default(),
            p.pitch.unwrap_or_default(),
            kind.cues().len()
        );
    }
}

fn pick_device(args: &Args) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = &args.device {
        for d in host.output_devices()? {
            if d.name()? == *name {
                return Ok(d);
            }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device()
        .ok_or_else(|| anyhow!("no default output device"))
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig> {
    // If nothing requested, default is already concrete.
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Pick a SupportedStreamConfigRange first.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch     = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = req_ch.map_or(0, |c| u64::from(ch.abs_diff(c)));
        let sr_pen = match req_sr {
            Some(sr) if !(sr_min..=sr_max).contains(&sr) => {
                u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr)))
            }
            _ => 0,
        };

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| anyhow!("no supported output configs"))?;

    let pick_sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };

    Ok(range.with_sample_rate(pick_sr))
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut runner: BlockRunner<GranularEngine>,
    mut scene: Scene,
    gain: f32,
    meter: Arc<Meter>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels).max(1);
    let err_fn = |e: cpal::StreamError| log::error!("stream error: {e}");

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            use granulor_engine::Generator;

            let mut peak = 0.0_f32;
            for frame in output.chunks_mut(channels) {
                let s = (runner.next(scene.next()) * gain).clamp(-1.0, 1.0);
                peak = peak.max(s.abs());
                let v: T = T::from_sample(s);
                for ch in frame.iter_mut() {
                    *ch = v;
                }
            }
            meter.record(peak, runner.processor().stats().active);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Feed due cues to the engine and log the meter until `duration` runs out
/// (or forever).
fn control_loop(sender: &ParameterSender, mut timeline: Timeline, meter: &Meter, duration: Option<f32>) {
    let start = Instant::now();
    let mut next_report = Duration::from_secs(1);
    loop {
        let elapsed = start.elapsed();
        let now = elapsed.as_secs_f32();
        if let Some(update) = timeline.due(now) {
            log::info!("{now:.2}s: {update:?}");
            if let Err(e) = sender.send(update) {
                log::warn!("cue not delivered: {e}");
            }
        }
        if elapsed >= next_report {
            let (peak, active) = meter.take();
            log::info!("peak ~ {peak:.3} | grains {active:>3}");
            next_report += Duration::from_secs(1);
        }
        if duration.is_some_and(|d| now >= d) {
            return;
        }
        std::thread::sleep(CONTROL_TICK);
    }
}

fn play(args: &Args, settings: &Settings) -> Result<()> {
    let device  = pick_device(args)?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();

    if let Some(sr) = args.sample_rate { cfg.sample_rate = cpal::SampleRate(sr); }
    if let Some(ch) = args.channels    { cfg.channels    = ch; }

    #[allow(clippy::cast_precision_loss)]
    let sr = cfg.sample_rate.0 as f32;
    let engine = build_engine(settings, sr)?;
    let sender = engine.sender();
    let runner = BlockRunner::new(engine, sr);
    let scene = Scene::new(settings.scene, sr);
    let meter = Arc::new(Meter::default());

    log::info!("device: {}", device.name()?);
    log::info!("stream config: {cfg:?} (sample_format: {sample_format:?})");
    log::info!("scene: {} | gain: {:.2}", settings.scene, settings.gain);

    let m = Arc::clone(&meter);
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, runner, scene, settings.gain, m)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, runner, scene, settings.gain, m)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, runner, scene, settings.gain, m)?,
        other => bail!("unsupported device sample format: {other:?}"),
    };

    stream.play()?;
    match args.duration {
        Some(d) => log::info!("auto-stop after {d} seconds"),
        None => log::info!("press Ctrl+C to stop"),
    }

    control_loop(&sender, Timeline::new(settings.cues.clone()), &meter, args.duration);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        return list_output_devices();
    }
    if args.list_scenes {
        list_scenes();
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let settings = Settings::resolve(&args, config)?;

    if let Some(path) = &args.render {
        let sample_rate = args.sample_rate.unwrap_or(DEFAULT_RENDER_RATE);
        let channels = args.channels.unwrap_or(2);
        let seconds = args.duration.unwrap_or(DEFAULT_RENDER_SECONDS);
        log::info!("rendering {seconds}s of {} to {}", settings.scene, path.display());
        let summary = render::render_wav(path, &settings, sample_rate, channels, seconds)?;
        log::info!(
            "wrote {} frames, peak {:.3}, {} grains ({} dropped)",
            summary.frames,
            summary.peak,
            summary.stats.spawned,
            summary.stats.dropped
        );
        return Ok(());
    }

    play(&args, &settings)
}
