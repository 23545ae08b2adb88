//! model — forward models and observation operators.
//!
//! Purpose
//! -------
//! Define the two model functions the variational engine is built around,
//! the SEIRD epidemic model used for mortality calibration, and thin
//! adapters for user-supplied closures.
//!
//! Key behaviors
//! -------------
//! - [`traits::ForwardModel`] and [`traits::ObservationOperator`] describe
//!   pure one-step evolution and state → observable maps, each with an
//!   optional Jacobian for adjoint gradients.
//! - [`seird::SeirdModel`] implements the discrete SEIRD step with rates
//!   carried as pass-through state components, plus its exact Jacobian.
//! - [`observation::CompartmentObservation`] selects one compartment
//!   (cumulative deaths by default).
//! - [`closure`] wraps plain functions so callers can hand the engine two
//!   closures instead of implementing the traits.
//!
//! Invariants & assumptions
//! ------------------------
//! - Model functions never mutate shared state; diagnostics such as call
//!   counts are owned by the engine.
//! - Domain violations are reported as [`errors::ModelError`] values, never
//!   as NaN.
//!
//! Downstream usage
//! ----------------
//! - `assimilation` consumes these traits through generic parameters; any
//!   type implementing them can be calibrated.

pub mod closure;
pub mod errors;
pub mod observation;
pub mod seird;
pub mod traits;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::closure::{FnForwardModel, FnObservation};
pub use self::errors::{ModelError, ModelResult};
pub use self::observation::CompartmentObservation;
pub use self::seird::{STATE_DIM, SeirdModel, SeirdState};
pub use self::traits::{ForwardModel, ObservationOperator};
