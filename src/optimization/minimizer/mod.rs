//! minimizer — argmin-powered L-BFGS minimization of a scalar cost.
//!
//! Purpose
//! -------
//! Provide the gradient-based minimizer behind variational calibration.
//! Callers implement [`Objective`] and invoke [`minimize`] to run L-BFGS
//! with a configurable line search, tolerances, iteration recording, and a
//! finite-difference gradient fallback.
//!
//! Key behaviors
//! -------------
//! - Bridge an [`Objective`] into argmin via [`adapter::ArgMinAdapter`];
//!   costs pass through without any sign change.
//! - Build the solver in [`builders`] from [`traits::LineSearcher`] and run
//!   it through [`run::run_lbfgs`].
//! - Record every accepted iterate with [`observer::IterationRecorder`] when
//!   `record_iterations` is set.
//! - Normalize the final state into a [`MinimizerOutcome`] whose
//!   [`TerminalState`] separates convergence from the iteration cap.
//!
//! Invariants & assumptions
//! ------------------------
//! - Objectives report infeasible inputs as [`crate::optimization::errors::OptError`]
//!   values; the run aborts with that error rather than continuing.
//! - Costs and gradients are validated for finiteness on every evaluation.
//! - Options are validated on construction ([`Tolerances::new`],
//!   [`MinimizerOptions::new`]).
//!
//! Testing notes
//! -------------
//! - Unit tests in each submodule cover local concerns; `api` runs
//!   end-to-end minimizations on small convex problems.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod observer;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::minimize;
pub use self::finite_diff::fd_gradient;
pub use self::observer::IterationRecord;
pub use self::traits::{
    DEFAULT_MAX_ITER, FdScheme, LineSearcher, MinimizerOptions, MinimizerOutcome, Objective,
    TerminalState, Tolerances,
};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::api::minimize;
    pub use super::traits::{
        FdScheme, LineSearcher, MinimizerOptions, MinimizerOutcome, Objective, TerminalState,
        Tolerances,
    };
    pub use super::types::{Cost, Grad, Theta};
}
