use ort::execution_providers::ExecutionProviderDispatch;

/// Hardware execution providers to register for the face model.
///
/// ONNX Runtime falls back to CPU when a listed provider fails to load,
/// so an empty list simply means CPU-only.
pub fn platform_execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    #[test]
    fn test_cpu_only_on_other_platforms() {
        assert!(platform_execution_providers().is_empty());
    }

    #[cfg(any(target_os = "macos", target_os = "windows"))]
    #[test]
    fn test_one_accelerator_registered() {
        assert_eq!(platform_execution_providers().len(), 1);
    }
}
