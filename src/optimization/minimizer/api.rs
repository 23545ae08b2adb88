//! High-level entry point for minimizing an [`Objective`].
//!
//! Selects an L-BFGS solver with either Hager–Zhang or More–Thuente line
//! search, wraps the objective in an [`ArgMinAdapter`], and delegates the
//! run to [`run_lbfgs`].
use crate::optimization::{
    errors::OptResult,
    minimizer::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, MinimizerOptions, MinimizerOutcome, Objective},
        types::Theta,
    },
};
use std::cell::RefCell;

/// minimize — minimize `J(x)` with L-BFGS and the configured line search.
///
/// Purpose
/// -------
/// Single entry point of the minimizer. Validates the start, builds the
/// solver selected by `opts.line_searcher`, and runs it through
/// [`run_lbfgs`].
///
/// Parameters
/// ----------
/// - `f`: `&F`
///   Objective to minimize. Its gradient is used when provided, otherwise
///   the adapter finite-differences `f.value`.
/// - `x0`: `Theta`
///   Starting point.
/// - `opts`: `&MinimizerOptions`
///   Tolerances, line search, finite-difference scheme, recording and
///   verbosity.
///
/// Returns
/// -------
/// `OptResult<MinimizerOutcome>`
///   The normalized outcome of the run.
///
/// Errors
/// ------
/// - Propagates any error from `f.check(&x0)`.
/// - Propagates builder errors for invalid tolerances.
/// - Returns the objective's own error (for example `Domain`) when it stops
///   the run, including failures inside the line search.
///
/// Panics
/// ------
/// - Never panics.
///
/// Safety
/// ------
/// - No `unsafe` code is used.
///
/// Notes
/// -----
/// - The failure slot shared with the adapter lives for one call.
///
/// Examples
/// --------
/// ```
/// use ndarray::array;
/// use seird_4dvar::optimization::{
///     errors::OptResult,
///     minimizer::{Cost, Grad, MinimizerOptions, Objective, Theta, minimize},
/// };
///
/// struct Bowl;
/// impl Objective for Bowl {
///     fn value(&self, x: &Theta) -> OptResult<Cost> {
///         Ok(x.dot(x))
///     }
///     fn check(&self, _x: &Theta) -> OptResult<()> {
///         Ok(())
///     }
///     fn grad(&self, x: &Theta) -> OptResult<Grad> {
///         Ok(2.0 * x)
///     }
/// }
///
/// let out = minimize(&Bowl, array![1.0, -2.0], &MinimizerOptions::default())?;
/// assert!(out.value < 1e-10);
/// # Ok::<(), seird_4dvar::optimization::errors::OptError>(())
/// ```
pub fn minimize<F: Objective>(
    f: &F, x0: Theta, opts: &MinimizerOptions,
) -> OptResult<MinimizerOutcome> {
    f.check(&x0)?;
    let failure = RefCell::new(None);
    let problem = ArgMinAdapter::new(f, opts.fd_scheme, &failure);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(x0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(x0, opts, problem, solver)
        }
    }
}
