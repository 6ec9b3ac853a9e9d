/// File name of the face landmark model inside the model cache directory.
pub const FACE_MODEL_NAME: &str = "face_landmarks.onnx";
/// Face detector with 5-point landmarks (eyes, nose, mouth corners).
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const DEFAULT_DATABASE_URL: &str =
    "https://smart-seminar-hall-default-rtdb.asia-southeast1.firebasedatabase.app/";
pub const LIVE_DATA_PATH: &str = "seminar_hall/live_data";
pub const DEFAULT_CREDENTIALS_FILE: &str = "serviceAccountKey.json";

pub const DEFAULT_MAX_FACES: usize = 10;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Minimum spacing between two publish attempts, in seconds (exclusive).
pub const PUBLISH_INTERVAL_SECS: f64 = 2.0;

pub const DEFAULT_QUIT_KEY: char = 'q';
/// Per-iteration key poll timeout for the window display.
pub const KEY_POLL_MS: i32 = 1;
