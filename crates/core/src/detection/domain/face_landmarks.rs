//! 5-point face landmarks in normalized image coordinates.
//!
//! Weights emphasize nose (3x) over eyes (2x) and mouth (1x) so the centroid
//! stays near the nose when it is occluded.

pub const LEFT_EYE: usize = 0;
pub const RIGHT_EYE: usize = 1;
pub const NOSE: usize = 2;
pub const LEFT_MOUTH: usize = 3;
pub const RIGHT_MOUTH: usize = 4;

/// Landmark weights: [left_eye, right_eye, nose, left_mouth, right_mouth].
const WEIGHTS: [f64; 5] = [2.0, 2.0, 3.0, 1.0, 1.0];

/// Landmarks for one face. `None` marks a point the detector was not
/// confident about; visible points are `(x, y)` in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [Option<(f64, f64)>; 5],
}

impl FaceLandmarks {
    pub fn new(points: [Option<(f64, f64)>; 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Option<(f64, f64)>; 5] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<(f64, f64)> {
        self.points.get(index).copied().flatten()
    }

    pub fn nose(&self) -> Option<(f64, f64)> {
        self.get(NOSE)
    }

    pub fn visible_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    /// Weighted centroid of the visible landmarks.
    pub fn center(&self) -> Option<(f64, f64)> {
        let mut wx_sum = 0.0;
        let mut wy_sum = 0.0;
        let mut w_sum = 0.0;

        for (i, point) in self.points.iter().enumerate() {
            if let Some((x, y)) = point {
                let w = WEIGHTS[i];
                wx_sum += x * w;
                wy_sum += y * w;
                w_sum += w;
            }
        }

        if w_sum == 0.0 {
            return None;
        }

        Some((wx_sum / w_sum, wy_sum / w_sum))
    }
}
