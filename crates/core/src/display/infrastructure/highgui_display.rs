//! OpenCV HighGUI window with keyboard polling.
use opencv::core::{Mat, MatTraitManual, Scalar, CV_8UC3};
use opencv::highgui;
use opencv::prelude::*;

use crate::display::domain::display_sink::{DisplayEvent, DisplaySink};
use crate::shared::constants::KEY_POLL_MS;
use crate::shared::frame::Frame;

pub struct HighguiDisplay {
    title: String,
    quit_key: char,
    open: bool,
}

impl HighguiDisplay {
    pub fn new(title: &str, quit_key: char) -> Result<Self, Box<dyn std::error::Error>> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            title: title.to_string(),
            quit_key,
            open: true,
        })
    }
}

impl DisplaySink for HighguiDisplay {
    fn show(&mut self, frame: &Frame) -> Result<DisplayEvent, Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("Window display expects RGB frames, got {} channels", frame.channels()).into());
        }
        let mut mat = Mat::new_rows_cols_with_default(
            frame.height() as i32,
            frame.width() as i32,
            CV_8UC3,
            Scalar::all(0.0),
        )?;
        mat.data_bytes_mut()?.copy_from_slice(&frame.to_bgr());
        highgui::imshow(&self.title, &mat)?;

        let key = highgui::wait_key(KEY_POLL_MS)?;
        if is_quit_key(key, self.quit_key) {
            return Ok(DisplayEvent::Quit);
        }
        Ok(DisplayEvent::Continue)
    }

    fn close(&mut self) {
        if self.open {
            report_close(&self.title, highgui::destroy_window(&self.title));
            self.open = false;
        }
    }
}

/// `wait_key` returns -1 on timeout; only the low byte names the key.
fn is_quit_key(key: i32, quit_key: char) -> bool {
    key >= 0 && (key & 0xFF) as u8 == quit_key as u8
}

/// Logs a failed window teardown. Returns whether it failed.
fn report_close(title: &str, result: opencv::Result<()>) -> bool {
    match result {
        Ok(()) => false,
        Err(e) => {
            log::warn!("Failed to close window '{title}': {e}");
            true
        }
    }
}

impl Drop for HighguiDisplay {
    fn drop(&mut self) {
        self.close();
    }
}
