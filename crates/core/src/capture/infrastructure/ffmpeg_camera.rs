use thiserror::Error;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no capture device format available (tried {0})")]
    NoCameraFormat(&'static str),
    #[error("failed to open camera {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("camera {0} exposes no video stream")]
    NoVideoStream(String),
    #[error("camera decode failed: {0}")]
    Decode(#[source] ffmpeg_next::Error),
    #[error("failed to read from camera {device}: {source}")]
    Read {
        device: String,
        #[source]
        source: ffmpeg_next::Error,
    },
}

/// Result of one demuxer read.
#[derive(Debug, PartialEq, Eq)]
enum PacketRead {
    Packet,
    /// Nothing available yet on a non-blocking device.
    Retry,
    EndOfStream,
}

/// Maps `av_read_frame` results. Anything other than EOF or EAGAIN means
/// the device is gone (ENODEV/EIO after an unplug) and must stop capture.
fn classify_read(
    result: Result<(), ffmpeg_next::Error>,
    device: &str,
) -> Result<PacketRead, CaptureError> {
    match result {
        Ok(()) => Ok(PacketRead::Packet),
        Err(ffmpeg_next::Error::Eof) => Ok(PacketRead::EndOfStream),
        Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => {
            Ok(PacketRead::Retry)
        }
        Err(source) => Err(CaptureError::Read {
            device: device.to_string(),
            source,
        }),
    }
}

/// libavdevice input format names for each platform's camera API.
#[cfg(target_os = "linux")]
const DEVICE_FORMATS: &str = "video4linux2,v4l2";
#[cfg(target_os = "macos")]
const DEVICE_FORMATS: &str = "avfoundation";
#[cfg(target_os = "windows")]
const DEVICE_FORMATS: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const DEVICE_FORMATS: &str = "";

/// Maps a camera identifier to the device string libavdevice expects.
///
/// A bare index becomes `/dev/videoN` on Linux and stays an index for
/// AVFoundation. Anything else is passed through, which is also how
/// DirectShow names (`video=...`) are given.
pub fn device_name(camera: &str) -> String {
    match camera.parse::<u32>() {
        Ok(index) if cfg!(target_os = "linux") => format!("/dev/video{index}"),
        Ok(index) if cfg!(target_os = "macos") => format!("{index}:none"),
        _ => camera.to_string(),
    }
}

/// Live camera capture via libavdevice, decoded to RGB24.
pub struct CameraSource {
    device: String,
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    width: u32,
    height: u32,
    sequence: u64,
}

impl CameraSource {
    /// Opens the camera identified by `camera` (see [`device_name`]).
    pub fn open(camera: &str) -> Result<Self, CaptureError> {
        ffmpeg_next::init().map_err(|e| CaptureError::Open {
            device: camera.to_string(),
            source: e,
        })?;
        ffmpeg_next::device::register_all();

        let device = device_name(camera);
        let format = find_device_format().ok_or(CaptureError::NoCameraFormat(DEVICE_FORMATS))?;

        let open_err = |e| CaptureError::Open {
            device: device.clone(),
            source: e,
        };
        let ictx = ffmpeg_next::format::open_with(
            &device,
            &ffmpeg_next::format::format::Format::Input(format),
            ffmpeg_next::Dictionary::new(),
        )
        .map_err(open_err)?
        .input();

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::NoVideoStream(device.clone()))?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(open_err)?;
        let decoder = codec_ctx.decoder().video().map_err(open_err)?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(open_err)?;

        log::info!("Opened camera {device} ({width}x{height})");

        Ok(Self {
            device,
            input_ctx: Some(ictx),
            decoder: Some(decoder),
            scaler: Some(scaler),
            video_stream_index,
            width,
            height,
            sequence: 0,
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, CaptureError> {
        let (Some(decoder), Some(scaler)) = (self.decoder.as_mut(), self.scaler.as_mut()) else {
            return Ok(None);
        };
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut rgb).map_err(CaptureError::Decode)?;

        let pixels = extract_rgb_pixels(&rgb, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }
}

impl FrameSource for CameraSource {
    fn capture(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }

            let (Some(ictx), Some(decoder)) = (self.input_ctx.as_mut(), self.decoder.as_mut())
            else {
                return Ok(None);
            };
            let mut packet = ffmpeg_next::Packet::empty();
            match classify_read(packet.read(ictx), &self.device)? {
                PacketRead::Packet => {}
                PacketRead::Retry => continue,
                PacketRead::EndOfStream => return Ok(None),
            }
            if packet.stream() != self.video_stream_index {
                continue;
            }
            decoder.send_packet(&packet).map_err(CaptureError::Decode)?;
        }
    }

    fn release(&mut self) {
        if self.input_ctx.is_some() {
            log::debug!("Releasing camera {}", self.device);
        }
        self.scaler = None;
        self.decoder = None;
        self.input_ctx = None;
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

fn find_device_format() -> Option<ffmpeg_next::format::format::Input> {
    ffmpeg_next::device::input::video().find(|format| {
        format
            .name()
            .split(',')
            .any(|name| DEVICE_FORMATS.split(',').any(|wanted| wanted == name))
    })
}

fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_device_name_passes_through_paths() {
        assert_eq!(device_name("/dev/video2"), "/dev/video2");
        assert_eq!(device_name("video=Integrated Camera"), "video=Integrated Camera");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_device_name_maps_index_to_v4l2_node() {
        assert_eq!(device_name("0"), "/dev/video0");
        assert_eq!(device_name("3"), "/dev/video3");
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_device_name_maps_index_to_avfoundation() {
        assert_eq!(device_name("0"), "0:none");
    }

    #[test]
    fn test_read_ok_is_packet() {
        assert_eq!(classify_read(Ok(()), "/dev/video0").unwrap(), PacketRead::Packet);
    }

    #[test]
    fn test_read_eof_ends_stream() {
        assert_eq!(
            classify_read(Err(ffmpeg_next::Error::Eof), "/dev/video0").unwrap(),
            PacketRead::EndOfStream
        );
    }

    #[test]
    fn test_read_eagain_retries() {
        let again = ffmpeg_next::Error::Other {
            errno: ffmpeg_next::error::EAGAIN,
        };
        assert_eq!(classify_read(Err(again), "/dev/video0").unwrap(), PacketRead::Retry);
    }

    #[rstest]
    #[case::no_device(ffmpeg_next::Error::Other { errno: ffmpeg_next::error::ENODEV })]
    #[case::io_error(ffmpeg_next::Error::Other { errno: ffmpeg_next::error::EIO })]
    #[case::exit(ffmpeg_next::Error::Exit)]
    fn test_unplugged_device_is_read_error(#[case] error: ffmpeg_next::Error) {
        let err = classify_read(Err(error), "/dev/video0").unwrap_err();
        assert!(matches!(err, CaptureError::Read { ref device, .. } if device == "/dev/video0"));
        assert!(err.to_string().contains("/dev/video0"));
    }

    #[test]
    fn test_capture_error_messages_name_device() {
        let err = CaptureError::NoVideoStream("/dev/video9".into());
        assert!(err.to_string().contains("/dev/video9"));
    }
}
