use argmin::core::{ArgminError, Error};

use crate::model::errors::ModelError;

/// Crate-wide result alias for assimilation and optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

/// Coarse classification of [`OptError`] variants.
///
/// - `Domain`: a model function was evaluated outside its valid domain.
/// - `Dimension`: inputs have incompatible shapes; raised before iterating.
/// - `Convergence`: the minimizer diverged (non-finite values) or stopped
///   for a reason other than convergence or the iteration cap.
/// - `Configuration`: invalid options or error specifications.
/// - `Backend`: errors from argmin that fit none of the above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Domain,
    Dimension,
    Convergence,
    Configuration,
    Backend,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Domain ----
    /// Forward model failed on the input of step `step` (0-based).
    Domain { step: usize, source: ModelError },

    /// Observation operator failed on trajectory state `state`.
    ObservationDomain { state: usize, source: ModelError },

    // ---- Dimension ----
    /// Background vector is empty.
    EmptyBackground,

    /// Background vector holds NaN/±∞.
    NonFiniteBackground { index: usize, value: f64 },

    /// Observation series has no rows or zero columns.
    EmptyObservations,

    /// Observation series holds NaN/±∞.
    NonFiniteObservation { step: usize, component: usize, value: f64 },

    /// Observation operator output length differs from the series width.
    ObservationDimMismatch { expected: usize, found: usize },

    /// Forward model output length differs from the state length.
    StateDimMismatch { step: usize, expected: usize, found: usize },

    /// Error specification does not match the vector it weights.
    ErrorSpecDimMismatch { kind: &'static str, expected: usize, found: (usize, usize) },

    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch { expected: usize, found: usize },

    /// A model Jacobian has the wrong shape for the adjoint sweep.
    JacobianShapeMismatch {
        operator: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    // ---- Convergence ----
    /// Cost function returned a non-finite value.
    NonFiniteCost { value: f64 },

    /// Gradient elements need to be finite.
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    /// Calibrated state must be finite.
    InvalidAnalysis { index: usize, value: f64, reason: &'static str },

    /// Analysis is missing from the solver state.
    MissingAnalysis,

    /// Solver stopped for a reason other than convergence or the iteration cap.
    UnexpectedTermination { reason: String },

    // ---- Configuration ----
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad { tol: f64, reason: &'static str },

    /// Cost change tolerance needs to be positive and finite.
    InvalidTolCost { tol: f64, reason: &'static str },

    /// Maximum iterations needs to be positive.
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    /// At least one stopping rule must be provided.
    NoTolerancesProvided,

    /// Invalid line searcher name.
    InvalidLineSearch { name: String, reason: &'static str },

    /// lbfgs_mem needs to be at least 1.
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    /// Unknown supplementary quantity name.
    InvalidStoredQuantity { name: String },

    /// Variances must be finite and strictly positive.
    InvalidVariance { kind: &'static str, index: usize, value: f64 },

    /// Full covariance matrix is not symmetric.
    AsymmetricCovariance { kind: &'static str, row: usize, col: usize },

    /// Full covariance matrix has no Cholesky factor.
    CovarianceNotPositiveDefinite { kind: &'static str },

    /// Imperfect-model cost requested without an evolution error.
    MissingEvolutionError,

    /// Adjoint gradient requested but a model function has no Jacobian.
    JacobianUnavailable { operator: &'static str },

    /// Observer storage was poisoned by a panicking thread.
    ObserverPoisoned,

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter { text: String },
    /// Wrapper for argmin::NotImplemented
    NotImplemented { text: String },
    /// Wrapper for argmin::NotInitialized
    NotInitialized { text: String },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated { text: String },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound { text: String },
    /// Wrapper for argmin::PotentialBug
    PotentialBug { text: String },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError { text: String },
    /// Wrapper for other argmin::Error types
    BackendError { text: String },

    // ---- Gradient ----
    /// Objective has no analytic gradient; finite differences are used.
    GradientNotImplemented,

    // ---- Fallback ----
    UnknownError,
}

impl OptError {
    /// Classify this error into the engine's error taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            OptError::Domain { .. } | OptError::ObservationDomain { .. } => ErrorClass::Domain,

            OptError::EmptyBackground
            | OptError::NonFiniteBackground { .. }
            | OptError::EmptyObservations
            | OptError::NonFiniteObservation { .. }
            | OptError::ObservationDimMismatch { .. }
            | OptError::StateDimMismatch { .. }
            | OptError::ErrorSpecDimMismatch { .. }
            | OptError::GradientDimMismatch { .. }
            | OptError::JacobianShapeMismatch { .. } => ErrorClass::Dimension,

            OptError::NonFiniteCost { .. }
            | OptError::InvalidGradient { .. }
            | OptError::InvalidAnalysis { .. }
            | OptError::MissingAnalysis
            | OptError::UnexpectedTermination { .. } => ErrorClass::Convergence,

            OptError::InvalidTolGrad { .. }
            | OptError::InvalidTolCost { .. }
            | OptError::InvalidMaxIter { .. }
            | OptError::NoTolerancesProvided
            | OptError::InvalidLineSearch { .. }
            | OptError::InvalidLBFGSMem { .. }
            | OptError::InvalidStoredQuantity { .. }
            | OptError::InvalidVariance { .. }
            | OptError::AsymmetricCovariance { .. }
            | OptError::CovarianceNotPositiveDefinite { .. }
            | OptError::MissingEvolutionError
            | OptError::JacobianUnavailable { .. } => ErrorClass::Configuration,

            _ => ErrorClass::Backend,
        }
    }
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Domain ----
            OptError::Domain { step, source } => {
                write!(f, "Forward model failed at step {step}: {source}")
            }
            OptError::ObservationDomain { state, source } => {
                write!(f, "Observation operator failed on state {state}: {source}")
            }

            // ---- Dimension ----
            OptError::EmptyBackground => write!(f, "Background vector is empty"),
            OptError::NonFiniteBackground { index, value } => {
                write!(f, "Non-finite background component at index {index}: {value}")
            }
            OptError::EmptyObservations => write!(f, "Observation series is empty"),
            OptError::NonFiniteObservation { step, component, value } => {
                write!(f, "Non-finite observation at step {step}, component {component}: {value}")
            }
            OptError::ObservationDimMismatch { expected, found } => {
                write!(f, "Observation dimension mismatch: expected {expected}, found {found}")
            }
            OptError::StateDimMismatch { step, expected, found } => {
                write!(
                    f,
                    "Forward model changed state dimension at step {step}: expected {expected}, found {found}"
                )
            }
            OptError::ErrorSpecDimMismatch { kind, expected, found } => {
                write!(
                    f,
                    "{kind} error specification has shape {found:?}, expected dimension {expected}"
                )
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::JacobianShapeMismatch { operator, expected, found } => {
                write!(f, "{operator} Jacobian has shape {found:?}, expected {expected:?}")
            }

            // ---- Convergence ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }
            OptError::InvalidAnalysis { index, value, reason } => {
                write!(f, "Invalid analysis component at index {index}: {value}: {reason}")
            }
            OptError::MissingAnalysis => write!(f, "Missing analysis state"),
            OptError::UnexpectedTermination { reason } => {
                write!(f, "Minimizer stopped without converging: {reason}")
            }

            // ---- Configuration ----
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost function change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => write!(f, "No tolerances provided"),
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }
            OptError::InvalidStoredQuantity { name } => {
                write!(f, "Unknown stored quantity '{name}'")
            }
            OptError::InvalidVariance { kind, index, value } => {
                write!(
                    f,
                    "Invalid {kind} error variance at index {index}: {value}, must be finite and > 0"
                )
            }
            OptError::AsymmetricCovariance { kind, row, col } => {
                write!(f, "{kind} error covariance is not symmetric at ({row}, {col})")
            }
            OptError::CovarianceNotPositiveDefinite { kind } => {
                write!(f, "{kind} error covariance is not positive definite")
            }
            OptError::MissingEvolutionError => {
                write!(f, "Imperfect-model cost requires an evolution error specification")
            }
            OptError::JacobianUnavailable { operator } => {
                write!(f, "Adjoint gradient requires a {operator} Jacobian")
            }
            OptError::ObserverPoisoned => write!(f, "Iteration recorder lock was poisoned"),

            // ---- Argmin ----
            OptError::InvalidParameter { text } => write!(f, "Invalid parameter: {text}"),
            OptError::NotImplemented { text } => write!(f, "Not implemented: {text}"),
            OptError::NotInitialized { text } => write!(f, "Not initialized: {text}"),
            OptError::ConditionViolated { text } => write!(f, "Condition violated: {text}"),
            OptError::CheckPointNotFound { text } => write!(f, "Checkpoint not found: {text}"),
            OptError::PotentialBug { text } => write!(f, "Potential bug: {text}"),
            OptError::ImpossibleError { text } => write!(f, "Impossible error: {text}"),
            OptError::BackendError { text } => write!(f, "Backend error: {text}"),

            // ---- Gradient ----
            OptError::GradientNotImplemented => {
                write!(f, "Gradient optimization not implemented")
            }

            // ---- Fallback ----
            OptError::UnknownError => write!(f, "Unknown error"),
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(opt_err) => match opt_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}
