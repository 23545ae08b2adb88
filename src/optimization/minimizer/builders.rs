//! minimizer::builders — L-BFGS solver construction helpers.
//!
//! Purpose
//! -------
//! Hide argmin's generic wiring behind two builders, one per supported line
//! search, and apply the crate's tolerance options in one place.
//!
//! Conventions
//! -----------
//! - Builders never set the initial state or `max_iters`; those are runtime
//!   concerns applied by [`crate::optimization::minimizer::run::run_lbfgs`].
//! - The L-BFGS memory is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`].
//! - Tolerance errors raised by argmin come back as [`crate::optimization::errors::OptError`]
//!   through the crate's `From<argmin::core::Error>` conversion.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    minimizer::{
        traits::MinimizerOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// build_optimizer_hager_zhang — construct L-BFGS with Hager–Zhang line search.
///
/// Purpose
/// -------
/// Build an [`LbfgsHagerZhang`] over the crate's `(Theta, Grad, Cost)` types with
/// the tolerances from [`MinimizerOptions`].
///
/// Parameters
/// ----------
/// - `opts`: `&MinimizerOptions`
///   Consulted fields:
///   - `opts.lbfgs_mem`: history size `m`, or [`DEFAULT_LBFGS_MEM`].
///   - `opts.tols.tol_grad` and `opts.tols.tol_cost`: optional stopping
///     tolerances.
///
/// Returns
/// -------
/// `OptResult<LbfgsHagerZhang>`
///   The configured solver, ready for `run_lbfgs`.
///
/// Errors
/// ------
/// - `OptError` (via `From<argmin::core::Error>`) when argmin rejects a
///   tolerance.
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
/// - Neither the initial point nor `max_iters` is set here.
/// - Selected by `LineSearcher::HagerZhang`.
///
/// Examples
/// --------
/// ```ignore
/// let solver = build_optimizer_hager_zhang(&opts)?;
/// let outcome = run_lbfgs(x0, &opts, problem, solver)?;
/// ```
pub fn build_optimizer_hager_zhang(opts: &MinimizerOptions) -> OptResult<LbfgsHagerZhang> {
    let hager_zhang = HagerZhangLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsHagerZhang::new(hager_zhang, mem);
    configure_lbfgs(lbfgs, opts)
}

/// build_optimizer_more_thuente — construct L-BFGS with More–Thuente line search.
///
/// Purpose
/// -------
/// Build an [`LbfgsMoreThuente`] over the crate's `(Theta, Grad, Cost)` types with
/// the tolerances from [`MinimizerOptions`].
///
/// Parameters
/// ----------
/// - `opts`: `&MinimizerOptions`
///   Consulted fields:
///   - `opts.lbfgs_mem`: history size `m`, or [`DEFAULT_LBFGS_MEM`].
///   - `opts.tols.tol_grad` and `opts.tols.tol_cost`: optional stopping
///     tolerances.
///
/// Returns
/// -------
/// `OptResult<LbfgsMoreThuente>`
///   The configured solver, ready for `run_lbfgs`.
///
/// Errors
/// ------
/// - `OptError` (via `From<argmin::core::Error>`) when argmin rejects a
///   tolerance.
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
/// - Neither the initial point nor `max_iters` is set here.
/// - Selected by `LineSearcher::MoreThuente`, the default.
///
/// Examples
/// --------
/// ```ignore
/// let solver = build_optimizer_more_thuente(&opts)?;
/// let outcome = run_lbfgs(x0, &opts, problem, solver)?;
/// ```
pub fn build_optimizer_more_thuente(opts: &MinimizerOptions) -> OptResult<LbfgsMoreThuente> {
    let more_thuente = MoreThuenteLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsMoreThuente::new(more_thuente, mem);
    configure_lbfgs(lbfgs, opts)
}

/// configure_lbfgs — apply optional tolerances to an L-BFGS solver.
///
/// Purpose
/// -------
/// Shared wiring for both builders, generic over the line search `L`.
///
/// Parameters
/// ----------
/// - `solver`: `LBFGS<L, Theta, Grad, Cost>`
///   Freshly constructed solver.
/// - `opts`: `&MinimizerOptions`
///   Consulted fields: `opts.tols.tol_grad`, `opts.tols.tol_cost`.
///
/// Returns
/// -------
/// `OptResult<LBFGS<L, Theta, Grad, Cost>>`
///   The solver with each supplied tolerance applied.
///
/// Errors
/// ------
/// - `OptError` when `with_tolerance_grad` or `with_tolerance_cost` fails.
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
/// - A `None` tolerance leaves argmin's default in place.
///
/// Examples
/// --------
/// ```ignore
/// let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
/// let solver = configure_lbfgs(raw, &opts)?;
/// ```
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MinimizerOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
