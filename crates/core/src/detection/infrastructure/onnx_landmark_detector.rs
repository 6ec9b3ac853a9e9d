/// Face landmark detector using ONNX Runtime via `ort`.
///
/// Runs a YOLO-pose face model (box + 5 keypoints per face), applies
/// confidence filtering and NMS, and reports detections in normalized
/// frame coordinates.
use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_counter::DetectorConfig;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::detection::infrastructure::execution_provider::platform_execution_providers;
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// 5 keypoints x (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

pub struct OnnxLandmarkDetector {
    session: ort::session::Session,
    config: DetectorConfig,
    input_size: u32,
}

impl OnnxLandmarkDetector {
    /// Load the model. A missing or unreadable file is a setup-time error.
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 when the shape is dynamic.
    pub fn new(model_path: &Path, config: DetectorConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if !model_path.exists() {
            return Err(format!(
                "Model file not found: {} (run headcount-fetch-model first)",
                model_path.display()
            )
            .into());
        }
        let session = ort::session::Session::builder()?
            .with_execution_providers(platform_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!("Loaded face model {} (input {input_size}px)", model_path.display());

        Ok(Self {
            session,
            config,
            input_size,
        })
    }
}

impl FaceDetector for OnnxLandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, geometry) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Face model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = decode_rows(data, &shape, &geometry, self.config.min_confidence)?;
        let mut kept = nms(&mut raw, NMS_IOU_THRESH);
        kept.truncate(self.config.max_faces);

        Ok(kept
            .iter()
            .map(|d| d.normalized(frame.width(), frame.height()))
            .collect())
    }
}

/// Mapping between letterboxed model input and original frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LetterboxGeometry {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl LetterboxGeometry {
    fn to_frame(self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` x `target_size`, NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, LetterboxGeometry) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // 114/255 gray padding, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, LetterboxGeometry { scale, pad_x, pad_y })
}

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    keypoints: Option<[Option<(f64, f64)>; 5]>,
}

impl RawDetection {
    fn normalized(&self, width: u32, height: u32) -> Detection {
        let w = width as f64;
        let h = height as f64;
        let norm = |(x, y): (f64, f64)| ((x / w).clamp(0.0, 1.0), (y / h).clamp(0.0, 1.0));
        let (x1, y1) = norm((self.x1, self.y1));
        let (x2, y2) = norm((self.x2, self.y2));
        let landmarks = self
            .keypoints
            .map(|pts| FaceLandmarks::new(pts.map(|p| p.map(norm))));
        Detection::new([x1, y1, x2, y2], self.confidence, landmarks)
    }
}

/// Parses model output rows `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
///
/// Accepts both `[1, features, detections]` (transposed) and
/// `[1, detections, features]` layouts.
fn decode_rows(
    data: &[f32],
    shape: &[usize],
    geometry: &LetterboxGeometry,
    min_confidence: f64,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected face model output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if data.len() < num_dets * num_feats {
        return Err(format!(
            "Face model output has {} values, expected {}",
            data.len(),
            num_dets * num_feats
        )
        .into());
    }

    let mut dets = Vec::new();
    for i in 0..num_dets {
        let value = |f: usize| -> f64 {
            if transposed {
                data[f * num_dets + i] as f64
            } else {
                data[i * num_feats + f] as f64
            }
        };

        if num_feats < 5 {
            continue;
        }
        let conf = value(4);
        if conf < min_confidence {
            continue;
        }

        let (cx, cy, w, h) = (value(0), value(1), value(2), value(3));
        let (x1, y1) = geometry.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.to_frame(cx + w / 2.0, cy + h / 2.0);

        let keypoints = if num_feats >= 5 + NUM_KEYPOINT_VALUES {
            let mut pts = [None; 5];
            for (k, pt) in pts.iter_mut().enumerate() {
                let base = 5 + k * 3;
                if value(base + 2) >= KEYPOINT_CONF_THRESH {
                    *pt = Some(geometry.to_frame(value(base), value(base + 1)));
                }
            }
            Some(pts)
        } else {
            None
        };

        dets.push(RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence: conf,
            keypoints,
        });
    }
    Ok(dets)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        let overlaps = keep.iter().any(|k| {
            bbox_iou(&[k.x1, k.y1, k.x2, k.y2], &[det.x1, det.y1, det.x2, det.y2]) > iou_thresh
        });
        if !overlaps {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
