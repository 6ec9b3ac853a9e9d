pub mod headless_display;
#[cfg(feature = "window")]
pub mod highgui_display;
pub mod snapshot_display;
