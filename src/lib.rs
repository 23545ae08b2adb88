//! seird_4dvar — variational calibration of epidemic models.
//!
//! Purpose
//! -------
//! Estimate the initial compartments and transmission rates of a discrete
//! SEIRD model from a series of observed cumulative deaths by 4D-Var:
//! minimize a background-fit plus observation-fit cost over a multi-step
//! model trajectory with L-BFGS.
//!
//! Key behaviors
//! -------------
//! - [`model`] defines the forward-model and observation-operator traits,
//!   the SEIRD step with its Jacobian, and closure adapters.
//! - [`assimilation`] prepares error weights, rolls trajectories, assembles
//!   the cost and its adjoint gradient, and runs [`assimilation::calibrate`].
//! - [`optimization`] wraps argmin's L-BFGS behind a small [`Objective`]
//!   trait with finite-difference fallback and iteration recording.
//! - [`data`] loads a per-region observation window from a delimited file.
//!
//! Invariants & assumptions
//! ------------------------
//! - Model functions are pure; call counts and caches belong to one
//!   calibration.
//! - Every failure is returned as a typed error
//!   ([`optimization::errors::OptError`], [`model::ModelError`],
//!   [`data::DataError`]); nothing panics on bad input.
//!
//! Downstream usage
//! ----------------
//! - Typical flow: [`data::load_series`] →
//!   [`assimilation::ObservationSeries::from_scalars`] →
//!   [`assimilation::calibrate`] → [`assimilation::inspect_residuals`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; end-to-end SEIRD scenarios are in
//!   `tests/integration_calibration.rs`.
//!
//! [`Objective`]: optimization::minimizer::Objective

pub mod assimilation;
pub mod data;
pub mod model;
pub mod optimization;
