use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use headcount_core::capture::infrastructure::ffmpeg_camera::CameraSource;
use headcount_core::detection::domain::face_counter::{DetectorConfig, FaceCounter};
use headcount_core::detection::infrastructure::model_fetcher;
use headcount_core::detection::infrastructure::onnx_landmark_detector::OnnxLandmarkDetector;
use headcount_core::display::domain::display_sink::DisplaySink;
use headcount_core::display::infrastructure::headless_display::HeadlessDisplay;
use headcount_core::display::infrastructure::snapshot_display::SnapshotDisplay;
use headcount_core::overlay::overlay_renderer::OverlayRenderer;
use headcount_core::pipeline::count_people_use_case::{CountPeopleUseCase, LoopExit};
use headcount_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use headcount_core::shared::constants::{
    DEFAULT_CREDENTIALS_FILE, DEFAULT_DATABASE_URL, DEFAULT_MAX_FACES, DEFAULT_MIN_CONFIDENCE,
    DEFAULT_QUIT_KEY, LIVE_DATA_PATH, PUBLISH_INTERVAL_SECS,
};
use headcount_core::telemetry::domain::clock::SystemClock;
use headcount_core::telemetry::domain::throttled_publisher::{PublisherConfig, ThrottledPublisher};
use headcount_core::telemetry::infrastructure::firebase_sink::{FirebaseApp, FirebaseConfig};

#[cfg(feature = "window")]
const DEFAULT_DISPLAY: &str = "window";
#[cfg(not(feature = "window"))]
const DEFAULT_DISPLAY: &str = "headless";

#[cfg(feature = "window")]
const WINDOW_TITLE: &str = "Headcount";

/// Frames between progress lines in the log.
const HEARTBEAT_FRAMES: u64 = 300;

/// Count the people in front of a webcam and publish the live count.
#[derive(Parser)]
#[command(name = "headcount")]
struct Cli {
    /// Camera index or platform device name (e.g. /dev/video2).
    #[arg(long, default_value = "0")]
    camera: String,

    /// Face landmark model (defaults to the model cache directory).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Database credential file.
    #[arg(long, default_value = DEFAULT_CREDENTIALS_FILE)]
    credentials: PathBuf,

    /// Realtime Database URL.
    #[arg(long, default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Document path the live count is written to.
    #[arg(long, default_value = LIVE_DATA_PATH)]
    sink_path: String,

    /// Maximum number of faces counted per frame.
    #[arg(long, default_value_t = DEFAULT_MAX_FACES)]
    max_faces: usize,

    /// Minimum detection confidence (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    min_confidence: f64,

    /// Seconds between published counts.
    #[arg(long, default_value_t = PUBLISH_INTERVAL_SECS)]
    publish_interval: f64,

    /// Display mode: headless, window or snapshot.
    #[arg(long, default_value = DEFAULT_DISPLAY)]
    display: String,

    /// File the annotated frame is written to in snapshot mode.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Key that stops the loop in window mode.
    #[arg(long, default_value_t = DEFAULT_QUIT_KEY)]
    quit_key: char,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let detector_config = DetectorConfig {
        max_faces: cli.max_faces,
        min_confidence: cli.min_confidence,
    };
    let model_path = match cli.model.clone() {
        Some(path) => path,
        None => model_fetcher::default_model_path()?,
    };
    let detector = OnnxLandmarkDetector::new(&model_path, detector_config)?;
    let counter = FaceCounter::new(Box::new(detector), detector_config);

    let app = FirebaseApp::initialize(&FirebaseConfig {
        database_url: cli.database_url.clone(),
        credentials_path: cli.credentials.clone(),
    })?;
    let reference = app.reference(&cli.sink_path);
    log::info!("Publishing to {}{}", app.database_url(), reference.path());
    let publisher = ThrottledPublisher::new(
        Box::new(reference),
        Box::new(SystemClock),
        PublisherConfig {
            interval: Duration::try_from_secs_f64(cli.publish_interval)?,
        },
    );

    let display = build_display(&cli)?;
    let source = CameraSource::open(&cli.camera)?;

    let quit_hint = if cli.display == "window" {
        format!("press '{}' or Ctrl-C to quit", cli.quit_key)
    } else {
        "press Ctrl-C to quit".to_string()
    };
    log::info!(
        "Counting people on camera {} ({}; {quit_hint})",
        source.device(),
        cli.display
    );

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst)) {
        log::warn!("Failed to install Ctrl+C handler: {e}");
    }

    let mut use_case = CountPeopleUseCase::new(
        Box::new(source),
        counter,
        OverlayRenderer::default(),
        publisher,
        display,
        Box::new(StdoutPipelineLogger::new(HEARTBEAT_FRAMES)),
    )
    .with_stop_signal(stop);
    let report = use_case.execute();
    log::info!(
        "Processed {} frames, {} counts published, {} publish failures",
        report.frames,
        report.published,
        report.publish_failures
    );

    match report.exit {
        LoopExit::DisplayFailed(e) => Err(format!("Display failed: {e}").into()),
        _ => Ok(()),
    }
}

fn build_display(cli: &Cli) -> Result<Box<dyn DisplaySink>, Box<dyn std::error::Error>> {
    match cli.display.as_str() {
        "snapshot" => {
            let path = cli
                .snapshot
                .as_deref()
                .ok_or("--snapshot is required with --display snapshot")?;
            Ok(Box::new(SnapshotDisplay::new(path)))
        }
        #[cfg(feature = "window")]
        "window" => {
            use headcount_core::display::infrastructure::highgui_display::HighguiDisplay;
            Ok(Box::new(HighguiDisplay::new(WINDOW_TITLE, cli.quit_key)?))
        }
        _ => Ok(Box::new(HeadlessDisplay::new())),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    DetectorConfig {
        max_faces: cli.max_faces,
        min_confidence: cli.min_confidence,
    }
    .validate()?;
    match Duration::try_from_secs_f64(cli.publish_interval) {
        Ok(interval) if !interval.is_zero() => {}
        _ => {
            return Err(format!(
                "Publish interval must be a positive number of seconds, got {}",
                cli.publish_interval
            )
            .into());
        }
    }
    match cli.display.as_str() {
        "headless" => {}
        "snapshot" => {
            if cli.snapshot.is_none() {
                return Err("--snapshot is required with --display snapshot".into());
            }
        }
        "window" => {
            if !cfg!(feature = "window") {
                return Err("Window display needs a build with the `window` feature".into());
            }
        }
        other => {
            return Err(format!(
                "Display must be one of: headless, window, snapshot, got '{other}'"
            )
            .into());
        }
    }
    if cli.sink_path.trim_matches('/').is_empty() {
        return Err("Sink path must not be empty".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["headcount"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cli = parse(&[]);
        assert_eq!(cli.camera, "0");
        assert_eq!(cli.max_faces, 10);
        assert_eq!(cli.sink_path, "seminar_hall/live_data");
        assert_eq!(cli.quit_key, 'q');
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_rejects_zero_max_faces() {
        assert!(validate(&parse(&["--max-faces", "0"])).is_err());
    }

    #[test]
    fn test_rejects_confidence_out_of_range() {
        assert!(validate(&parse(&["--min-confidence", "1.5"])).is_err());
    }

    #[test]
    fn test_rejects_non_positive_interval() {
        assert!(validate(&parse(&["--publish-interval", "0"])).is_err());
    }

    #[test]
    fn test_rejects_interval_too_large_for_duration() {
        assert!(validate(&parse(&["--publish-interval", "1e20"])).is_err());
        assert!(validate(&parse(&["--publish-interval", "inf"])).is_err());
        assert!(validate(&parse(&["--publish-interval=-1"])).is_err());
        assert!(validate(&parse(&["--publish-interval", "0.5"])).is_ok());
    }

    #[test]
    fn test_snapshot_requires_path() {
        assert!(validate(&parse(&["--display", "snapshot"])).is_err());
        assert!(validate(&parse(&["--display", "snapshot", "--snapshot", "out.png"])).is_ok());
    }

    #[test]
    fn test_rejects_unknown_display() {
        assert!(validate(&parse(&["--display", "tv"])).is_err());
    }
}
