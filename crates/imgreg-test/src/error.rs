//! Error types for the verdict engine

use thiserror::Error;

/// Errors that can occur during regression testing
#[derive(Debug, Error)]
pub enum TestError {
    /// Test and baseline images have different shapes or component counts
    #[error("dimension mismatch: test image is {test}, baseline is {baseline}")]
    DimensionMismatch { test: String, baseline: String },

    /// Failed to load an image
    #[error("failed to load image '{path}': {message}")]
    ImageLoad { path: String, message: String },

    /// No baseline file exists for a template
    #[error("no baseline image found for template '{template}'")]
    BaselineNotFound { template: String },

    /// Tolerance value out of range
    #[error("invalid tolerance configuration: {0}")]
    InvalidToleranceConfig(String),

    /// Worker pool could not be created
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TestError {
    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TestError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            TestError::ImageLoad { .. } => ErrorKind::ImageLoad,
            TestError::BaselineNotFound { .. } => ErrorKind::BaselineNotFound,
            TestError::InvalidToleranceConfig(_) => ErrorKind::InvalidToleranceConfig,
            TestError::ThreadPool(_) | TestError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Error classification carried by results and verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DimensionMismatch,
    ImageLoad,
    BaselineNotFound,
    InvalidToleranceConfig,
    Io,
}

impl ErrorKind {
    /// Name used in dashboard measurements
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DimensionMismatch => "DimensionMismatch",
            ErrorKind::ImageLoad => "ImageLoadError",
            ErrorKind::BaselineNotFound => "BaselineNotFound",
            ErrorKind::InvalidToleranceConfig => "InvalidToleranceConfig",
            ErrorKind::Io => "IoError",
        }
    }
}

/// A classified, cloneable snapshot of a [`TestError`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&TestError> for Diagnostic {
    fn from(err: &TestError) -> Self {
        Diagnostic {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<TestError> for Diagnostic {
    fn from(err: TestError) -> Self {
        Diagnostic::from(&err)
    }
}

/// Result type for test operations
pub type TestResult<T> = Result<T, TestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_keeps_kind_and_message() {
        let err = TestError::DimensionMismatch {
            test: "3x3".to_string(),
            baseline: "4x4".to_string(),
        };
        let diag = Diagnostic::from(&err);
        assert_eq!(diag.kind, ErrorKind::DimensionMismatch);
        assert_eq!(diag.message, "dimension mismatch: test image is 3x3, baseline is 4x4");
        assert_eq!(diag.kind.as_str(), "DimensionMismatch");
    }
}
