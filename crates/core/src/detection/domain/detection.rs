use super::face_landmarks::FaceLandmarks;

/// One detected face within a frame, in normalized `[0, 1]` coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// `[x1, y1, x2, y2]`.
    pub bbox: [f64; 4],
    pub confidence: f64,
    pub landmarks: Option<FaceLandmarks>,
}

impl Detection {
    pub fn new(bbox: [f64; 4], confidence: f64, landmarks: Option<FaceLandmarks>) -> Self {
        Self {
            bbox,
            confidence,
            landmarks,
        }
    }

    pub fn bbox_center(&self) -> (f64, f64) {
        (
            (self.bbox[0] + self.bbox[2]) / 2.0,
            (self.bbox[1] + self.bbox[3]) / 2.0,
        )
    }

    /// Point the overlay marks for this face.
    ///
    /// Nose tip when visible, else the weighted landmark centroid, else the
    /// box centre.
    pub fn reference_point(&self) -> (f64, f64) {
        self.landmarks
            .as_ref()
            .and_then(|lm| lm.nose().or_else(|| lm.center()))
            .unwrap_or_else(|| self.bbox_center())
    }

    /// Reference point scaled to pixel coordinates of a `width` x `height` frame.
    pub fn reference_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let (x, y) = self.reference_point();
        ((x * width as f64) as i32, (y * height as f64) as i32)
    }
}
