//! assimilation — variational (4D-Var) calibration of a dynamical model.
//!
//! Purpose
//! -------
//! Estimate the initial state and parameters of a forward model from a
//! series of observations by minimizing a prior-fit plus observation-fit
//! cost over a multi-step trajectory.
//!
//! Key behaviors
//! -------------
//! - [`covariance`] validates error specifications and prepares their
//!   inverse weights (Cholesky for full covariances).
//! - [`trajectory`] rolls the model forward and observes the trajectory.
//! - [`cost`] assembles `J = Jb + Jo [+ Jq]`; [`adjoint`] computes its
//!   exact gradient with one backward sweep.
//! - [`problem`] binds everything into a minimizer objective with a
//!   per-point evaluation cache and invocation counters; [`control`] maps
//!   the state onto background-relative control variables.
//! - [`calibrate`] orchestrates validation, minimization, and reporting;
//!   [`inspect_residuals`] compares any state against the observations.
//!
//! Invariants & assumptions
//! ------------------------
//! - Observation row `t` is compared with trajectory state `t + 1`.
//! - Dimension problems are reported before the first iteration.
//! - Each calibration owns its cache and counters; nothing is global.
//!
//! Testing notes
//! -------------
//! - Adjoint gradients are checked against central finite differences.
//! - End-to-end SEIRD scenarios live in `tests/integration_calibration.rs`.

pub mod adjoint;
pub mod api;
pub mod control;
pub mod cost;
pub mod counters;
pub mod covariance;
pub mod options;
pub mod outcome;
pub mod problem;
pub mod residuals;
pub mod series;
pub mod trajectory;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::calibrate;
pub use self::control::ControlTransform;
pub use self::cost::{CostBreakdown, Evaluation};
pub use self::counters::EvalCounts;
pub use self::covariance::{ErrorKind, ErrorModel, ErrorSpec, Precision, PreparedErrors};
pub use self::options::{CalibrationOptions, GradientMethod, ModelAssumption, StoredQuantity};
pub use self::outcome::{CalibrationOutcome, IntermediateRecords};
pub use self::residuals::{ResidualReport, inspect_residuals};
pub use self::series::ObservationSeries;
pub use self::trajectory::{Trajectory, observe_trajectory, rollout, synthesize_observations};
