use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::FACE_MODEL_NAME;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Platform-specific model directory, shared by the fetcher and the counter.
///
/// - macOS: `~/Library/Application Support/Headcount/models/`
/// - Linux: `$XDG_CACHE_HOME/Headcount/models/` or `~/.cache/Headcount/models/`
/// - Windows: `%LOCALAPPDATA%/Headcount/models/`
pub fn model_cache_dir() -> Result<PathBuf, FetchError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Headcount").join("models"))
            .ok_or(FetchError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Headcount").join("models"))
            .ok_or(FetchError::NoCacheDir)
    }
}

/// Where the face model lives unless overridden on the command line.
pub fn default_model_path() -> Result<PathBuf, FetchError> {
    Ok(model_cache_dir()?.join(FACE_MODEL_NAME))
}

/// Downloads `url` to `dest` in one blocking transfer.
///
/// Any existing file at `dest` is replaced. There is no retry, resume or
/// checksum; on failure a partially written file may remain at `dest`.
/// Returns the number of bytes written.
pub fn fetch(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<u64, FetchError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| FetchError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let write_err = |e: std::io::Error| FetchError::Write {
        path: dest.to_path_buf(),
        source: e,
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(dest).map_err(write_err)?;

    // Streamed in 1MB chunks so progress reflects the transfer itself.
    let mut reader = response;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)?;
    Ok(downloaded)
}
