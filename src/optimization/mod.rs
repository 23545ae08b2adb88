//! optimization — L-BFGS minimizer and unified error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer used by variational calibration: an
//! argmin-backed minimizer for scalar costs and a single error/result
//! surface shared with the assimilation layer.
//!
//! Key behaviors
//! -------------
//! - [`minimizer`] minimizes any [`minimizer::Objective`] with L-BFGS and
//!   reports a normalized outcome.
//! - [`errors::OptError`] classifies every failure into domain, dimension,
//!   convergence, configuration, or backend errors.
//!
//! Conventions
//! -----------
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw argmin errors.
//! - Front-ends typically import the curated surface via
//!   `optimization::prelude::*`.

pub mod errors;
pub mod minimizer;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use seird_4dvar::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{ErrorClass, OptError, OptResult};
    pub use super::minimizer::prelude::*;
}
