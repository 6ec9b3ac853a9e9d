use crate::display::domain::display_sink::{DisplayEvent, DisplaySink};
use crate::shared::frame::Frame;

/// Display for machines without a screen: frames are dropped and the loop
/// only ends on end of stream or process termination.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    shown: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }
}

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, frame: &Frame) -> Result<DisplayEvent, Box<dyn std::error::Error>> {
        self.shown += 1;
        log::trace!("frame {} ({}x{})", frame.sequence(), frame.width(), frame.height());
        Ok(DisplayEvent::Continue)
    }

    fn close(&mut self) {}
}
