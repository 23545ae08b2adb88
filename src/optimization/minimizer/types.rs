//! minimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the numeric types and solver aliases used by the minimizer so
//! the rest of the crate stays agnostic to `ndarray` and argmin generics.
//!
//! Key behaviors
//! -------------
//! - Define canonical aliases for control vectors, gradients, and scalar
//!   costs (`Theta`, `Grad`, `Cost`).
//! - Provide the map type for argmin function-evaluation counters
//!   (`FnEvalMap`) and the concrete argmin iteration state (`MinState`).
//! - Expose pre-wired L-BFGS aliases for both supported line searches.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Cost` is the 4D-Var objective `J(x) ≥ 0`; there is no sign flip
//!   between user-facing and solver-facing values.
//! - The line-search aliases assume argmin's three-parameter forms
//!   `(Param, Gradient, Float)` as of the pinned argmin version.
//!
//! Testing notes
//! -------------
//! - Type aliases and constants only; exercised by the builder and runner
//!   tests.
use argmin::{
    core::IterState,
    solver::{
        linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
        quasinewton::LBFGS,
    },
};
use ndarray::Array1;
use std::collections::HashMap;

/// Control vector `x` (initial state and parameters).
pub type Theta = Array1<f64>;

/// Gradient `∇J(x)`, same shape as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value `J(x)`.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver
/// (e.g. `"cost_count"`, `"gradient_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// argmin iteration state for gradient-based solvers over [`Theta`].
pub type MinState = IterState<Theta, Grad, (), (), (), Cost>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Hager–Zhang line search specialized to this crate's numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search specialized to this crate's numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// L-BFGS solver wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS solver wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
