use ndarray::{ArrayView3, ArrayViewMut3};

/// A single camera sample: contiguous RGB bytes in row-major order.
///
/// Owned by exactly one loop iteration and dropped once that iteration has
/// been displayed.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            sequence,
        }
    }

    /// Solid-colour RGB frame, mostly useful for stubs and tests.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(data, width, height, 3, sequence)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Position of this frame in the capture stream, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Writes one RGB pixel; coordinates outside the frame are ignored.
    pub fn put_pixel(&mut self, x: i32, y: i32, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let channels = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * channels;
        let n = channels.min(3);
        self.data[offset..offset + n].copy_from_slice(&rgb[..n]);
    }

    /// Copy of the pixel data with the R and B channels swapped.
    pub fn to_bgr(&self) -> Vec<u8> {
        let channels = self.channels as usize;
        let mut out = self.data.clone();
        if channels >= 3 {
            for px in out.chunks_exact_mut(channels) {
                px.swap(0, 2);
            }
        }
        out
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frame_has_expected_layout() {
        let frame = Frame::filled(4, 2, [10, 20, 30], 7);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.sequence(), 7);
        assert_eq!(frame.data().len(), 24);
        assert_eq!(&frame.data()[3..6], &[10, 20, 30]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_is_height_width_channels() {
        let frame = Frame::filled(4, 2, [0, 0, 0], 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_put_pixel_writes_rgb() {
        let mut frame = Frame::filled(3, 3, [0, 0, 0], 0);
        frame.put_pixel(1, 2, [255, 128, 1]);
        let arr = frame.as_ndarray();
        assert_eq!(arr[[2, 1, 0]], 255);
        assert_eq!(arr[[2, 1, 1]], 128);
        assert_eq!(arr[[2, 1, 2]], 1);
    }

    #[test]
    fn test_put_pixel_out_of_bounds_is_ignored() {
        let mut frame = Frame::filled(2, 2, [9, 9, 9], 0);
        frame.put_pixel(-1, 0, [0, 0, 0]);
        frame.put_pixel(0, 2, [0, 0, 0]);
        frame.put_pixel(2, 0, [0, 0, 0]);
        assert!(frame.data().iter().all(|&b| b == 9));
    }

    #[test]
    fn test_to_bgr_swaps_red_and_blue() {
        let frame = Frame::filled(1, 1, [1, 2, 3], 0);
        assert_eq!(frame.to_bgr(), vec![3, 2, 1]);
        assert_eq!(frame.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = Frame::filled(1, 1, [100, 100, 100], 0);
        let mut cloned = frame.clone();
        cloned.put_pixel(0, 0, [0, 0, 0]);
        assert_eq!(frame.data()[0], 100);
        assert_eq!(cloned.data()[0], 0);
    }
}
