//! Errors raised by forward models and observation operators.
//!
//! [`ModelError`] describes a single evaluation that left the admissible
//! domain of a model function (zero population, wrong state length,
//! non-finite inputs) or a model that does not provide a linearization.
//! The trajectory layer attaches the failing step index when converting
//! into [`crate::optimization::errors::OptError`].

/// Result alias for model evaluations.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    // ---- Domain ----
    /// Living compartments sum to zero, so the force of infection is undefined.
    ZeroPopulation,

    /// State vector does not have the length the model expects.
    StateLengthMismatch { expected: usize, actual: usize },

    /// A state component is NaN or infinite.
    NonFiniteState { index: usize, value: f64 },

    /// A model function produced a non-finite output component.
    NonFiniteOutput { index: usize, value: f64 },

    /// Selected component is outside the state vector.
    ComponentOutOfRange { index: usize, dim: usize },

    // ---- Linearization ----
    /// Tangent-linear operator not provided; callers fall back to finite differences.
    JacobianNotImplemented,

    // ---- User functions ----
    /// Free-form failure reported by a user-supplied closure.
    Custom { reason: String },
}

impl std::error::Error for ModelError {}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Domain ----
            ModelError::ZeroPopulation => {
                write!(f, "Compartments S + E + I + R sum to zero; step is undefined")
            }
            ModelError::StateLengthMismatch { expected, actual } => {
                write!(f, "State length mismatch: expected {expected}, actual {actual}")
            }
            ModelError::NonFiniteState { index, value } => {
                write!(f, "Non-finite state component at index {index}: {value}")
            }
            ModelError::NonFiniteOutput { index, value } => {
                write!(f, "Non-finite model output at index {index}: {value}")
            }
            ModelError::ComponentOutOfRange { index, dim } => {
                write!(f, "Component index {index} out of range for state of length {dim}")
            }

            // ---- Linearization ----
            ModelError::JacobianNotImplemented => {
                write!(f, "Jacobian not implemented for this model function")
            }

            // ---- User functions ----
            ModelError::Custom { reason } => write!(f, "Model function failed: {reason}"),
        }
    }
}
