use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use flate2::read::GzDecoder;
use hazard_monitor_rs::{
    AccelSample, Event, FallCooldown, GyroSample, HazardSession, MonitorConfig, MotionSession,
    NullSink, SensorAvailability, Track,
};
use serde::Deserialize;
use serde_json::json;

/// Replay a recorded sensor/detection log through both pipelines
#[derive(Parser, Debug)]
#[command(name = "replay")]
struct Args {
    /// Path to a recorded log (.json or .json.gz)
    #[arg(long)]
    log: PathBuf,

    /// Optional JSON config overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fall cooldown mode (independent, shared)
    #[arg(long)]
    fall_cooldown: Option<FallCooldown>,

    /// Treat the recording as coming from a device without a gyroscope
    #[arg(long, default_value_t = false)]
    no_gyro: bool,

    /// Write the summary here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Axes {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct Reading {
    timestamp_ms: i64,
    accel: Option<Axes>,
    gyro: Option<Axes>,
}

#[derive(Deserialize)]
struct Frame {
    #[serde(default)]
    detections: Vec<f32>,
}

#[derive(Deserialize)]
struct LogFile {
    #[serde(default)]
    readings: Vec<Reading>,
    #[serde(default)]
    frames: Vec<Frame>,
}

fn load_log(path: &Path) -> anyhow::Result<LogFile> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(serde_json::from_reader(BufReader::new(reader))?)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => MonitorConfig::from_json_file(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(mode) = args.fall_cooldown {
        config.motion.fall_cooldown = mode;
    }

    let log = load_log(&args.log)?;
    log::info!(
        "replaying {} readings and {} frames from {}",
        log.readings.len(),
        log.frames.len(),
        args.log.display()
    );

    let mut motion = MotionSession::from_config(&config, Vec::<Event>::new())?;
    motion.start(SensorAvailability {
        accelerometer: true,
        gyroscope: !args.no_gyro,
    })?;
    for r in &log.readings {
        if let Some(a) = r.accel.as_ref() {
            motion.on_accel(&AccelSample::new(a.x, a.y, a.z, r.timestamp_ms));
        }
        if let Some(g) = r.gyro.as_ref() {
            motion.on_gyro(&GyroSample::new(g.x, g.y, g.z, r.timestamp_ms));
        }
    }
    let session_id = motion.metadata().session_id.clone();
    motion.stop();
    let events = motion.into_sink();

    let mut hazards = HazardSession::from_config(&config, NullSink)?;
    let mut final_tracks: Vec<Track> = Vec::new();
    let mut peak_tracks = 0usize;
    for frame in &log.frames {
        final_tracks = hazards.process_frame(&frame.detections);
        peak_tracks = peak_tracks.max(final_tracks.len());
    }

    let mut event_counts: BTreeMap<String, usize> = BTreeMap::new();
    for event in &events {
        let key = serde_json::to_value(event.kind)?
            .as_str()
            .unwrap_or_default()
            .to_string();
        *event_counts.entry(key).or_default() += 1;
    }

    let summary = json!({
        "session_id": session_id,
        "fall_cooldown": config.motion.fall_cooldown.to_string(),
        "events": events,
        "event_counts": event_counts,
        "frames": log.frames.len(),
        "tracks_created": hazards.tracks_created(),
        "peak_tracks": peak_tracks,
        "final_tracks": final_tracks,
    });

    let text = serde_json::to_string_pretty(&summary)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, text)?;
            log::info!("summary written to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
