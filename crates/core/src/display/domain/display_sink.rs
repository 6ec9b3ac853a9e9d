use crate::shared::frame::Frame;

/// What the operator asked for while the frame was on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Continue,
    Quit,
}

/// Local presentation surface for annotated frames.
///
/// `show` also polls for the quit key with a short timeout, so it bounds
/// how long one loop iteration waits on the operator.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame) -> Result<DisplayEvent, Box<dyn std::error::Error>>;

    /// Releases the window or file handle. Must be idempotent.
    fn close(&mut self);
}
