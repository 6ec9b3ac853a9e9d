use std::fs;
use std::path::{Path, PathBuf};

use crate::display::domain::display_sink::{DisplayEvent, DisplaySink};
use crate::shared::frame::Frame;

/// Writes every annotated frame over a single image file, for viewing the
/// counter remotely. Format follows the file extension.
pub struct SnapshotDisplay {
    path: PathBuf,
}

impl SnapshotDisplay {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temp file next to the target, keeping the extension so `image` can
    /// pick the encoder.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".partial-{name}"))
    }
}

impl DisplaySink for SnapshotDisplay {
    fn show(&mut self, frame: &Frame) -> Result<DisplayEvent, Box<dyn std::error::Error>> {
        let color = match frame.channels() {
            3 => image::ExtendedColorType::Rgb8,
            4 => image::ExtendedColorType::Rgba8,
            n => return Err(format!("Unsupported channel count for snapshot: {n}").into()),
        };

        // Written then renamed so viewers never read a half-encoded image.
        let temp = self.temp_path();
        image::save_buffer(&temp, frame.data(), frame.width(), frame.height(), color)?;
        fs::rename(&temp, &self.path)?;
        Ok(DisplayEvent::Continue)
    }

    fn close(&mut self) {
        let _ = fs::remove_file(self.temp_path());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_written_and_replaced() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("live.png");
        let mut display = SnapshotDisplay::new(&path);

        display.show(&Frame::filled(4, 3, [255, 0, 0], 0)).unwrap();
        let first = image::open(&path).unwrap().to_rgb8();
        assert_eq!(first.dimensions(), (4, 3));
        assert_eq!(first.get_pixel(0, 0).0, [255, 0, 0]);

        display.show(&Frame::filled(4, 3, [0, 0, 255], 1)).unwrap();
        let second = image::open(&path).unwrap().to_rgb8();
        assert_eq!(second.get_pixel(3, 2).0, [0, 0, 255]);

        display.close();
        assert!(!display.temp_path().exists());
    }

    #[test]
    fn test_snapshot_never_requests_quit() {
        let tmp = TempDir::new().unwrap();
        let mut display = SnapshotDisplay::new(&tmp.path().join("live.png"));
        let event = display.show(&Frame::filled(1, 1, [0, 0, 0], 0)).unwrap();
        assert_eq!(event, DisplayEvent::Continue);
    }

    #[test]
    fn test_snapshot_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let mut display = SnapshotDisplay::new(&tmp.path().join("missing").join("live.png"));
        assert!(display.show(&Frame::filled(1, 1, [0, 0, 0], 0)).is_err());
    }
}
