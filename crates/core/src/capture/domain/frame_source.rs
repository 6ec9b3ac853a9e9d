use crate::shared::frame::Frame;

/// Pulls frames from a camera or other live source.
///
/// `capture` blocks until a frame is available. `Ok(None)` signals end of
/// stream; the perception loop treats it, and any `Err`, as a reason to
/// stop rather than something to retry.
pub trait FrameSource {
    fn capture(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device. Called on every loop exit path; must be idempotent.
    fn release(&mut self);
}
