use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::{DEFAULT_MAX_FACES, DEFAULT_MIN_CONFIDENCE};
use crate::shared::frame::Frame;

/// Detector options fixed at startup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Upper bound on detections returned per frame.
    pub max_faces: usize,
    /// Acceptance threshold in `[0, 1]`.
    pub min_confidence: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_faces: DEFAULT_MAX_FACES,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_faces == 0 {
            return Err("max_faces must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(format!(
                "min_confidence must be between 0.0 and 1.0, got {}",
                self.min_confidence
            ));
        }
        Ok(())
    }
}

/// Detections for a single frame. The person count is derived from this
/// and nothing else.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceCount {
    detections: Vec<Detection>,
}

impl FaceCount {
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn person_count(&self) -> u32 {
        self.detections.len() as u32
    }
}

/// Wraps a [`FaceDetector`] and enforces the configured bounds on its output.
///
/// Detections below `min_confidence` are dropped; when more than
/// `max_faces` remain, the most confident ones are kept.
pub struct FaceCounter {
    detector: Box<dyn FaceDetector>,
    config: DetectorConfig,
}

impl FaceCounter {
    pub fn new(detector: Box<dyn FaceDetector>, config: DetectorConfig) -> Self {
        Self { detector, config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn count(&mut self, frame: &Frame) -> Result<FaceCount, Box<dyn std::error::Error>> {
        let mut detections: Vec<Detection> = self
            .detector
            .detect(frame)?
            .into_iter()
            .filter(|d| d.confidence >= self.config.min_confidence)
            .collect();

        if detections.len() > self.config.max_faces {
            detections.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            detections.truncate(self.config.max_faces);
        }

        Ok(FaceCount { detections })
    }
}
