use thiserror::Error;

/// Possible errors from the vertical coordinate routines.
///
/// Only structural problems end up here. Values that fall outside a column's
/// vertical range are reported as NaN in the output instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerticalError {
    /// A level type, interpolation kind, or coordinate name wasn't recognized
    #[error("level type not recognized: {0:?}")]
    InvalidLevelType(String),

    /// The inputs don't have compatible shapes
    #[error("inputs have incompatible shapes: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// The hybrid coefficients don't describe a valid vertical grid
    #[error("invalid hybrid coefficients: {0}")]
    InvalidCoefficients(String),
}

impl VerticalError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<ndarray::ShapeError> for VerticalError {
    fn from(e: ndarray::ShapeError) -> Self {
        Self::shape_mismatch("a compatible array layout", e.to_string())
    }
}
