use std::path::PathBuf;
use std::process;

use clap::Parser;

use headcount_core::detection::infrastructure::model_fetcher;
use headcount_core::shared::constants::FACE_MODEL_URL;

/// Download the face landmark model used by `headcount`.
#[derive(Parser)]
#[command(name = "headcount-fetch-model")]
struct Cli {
    /// Model download URL.
    #[arg(long, default_value = FACE_MODEL_URL)]
    url: String,

    /// Destination file (defaults to the model cache directory).
    #[arg(long)]
    output: Option<PathBuf>,
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
    let output = match cli.output {
        Some(path) => path,
        None => model_fetcher::default_model_path()?,
    };

    log::info!("Fetching {} -> {}", cli.url, output.display());
    let bytes = model_fetcher::fetch(&cli.url, &output, Some(Box::new(download_progress)))?;
    eprintln!();

    let saved = std::fs::canonicalize(&output).unwrap_or(output);
    println!("Model ({bytes} bytes) saved at {}", saved.display());
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face landmark model... {pct}%");
    } else {
        eprint!("\rDownloading face landmark model... {downloaded} bytes");
    }
}
