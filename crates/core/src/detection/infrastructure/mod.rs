pub mod execution_provider;
pub mod model_fetcher;
pub mod onnx_landmark_detector;
