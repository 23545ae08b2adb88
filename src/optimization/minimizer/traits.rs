//! Public API surface for cost minimization.
//!
//! - [`Objective`]: trait implemented by anything the minimizer can drive.
//! - [`MinimizerOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`LineSearcher`]: choice of line search used by L-BFGS.
//! - [`FdScheme`]: finite-difference scheme used when no gradient is provided.
//! - [`TerminalState`] and [`MinimizerOutcome`]: normalized result returned
//!   by [`crate::optimization::minimizer::minimize`].
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{
        observer::IterationRecord,
        types::{Cost, FnEvalMap, Grad, Theta},
        validation::{validate_analysis, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Objective interface minimized by L-BFGS.
///
/// Required:
/// - `value(&Theta) -> OptResult<Cost>`: evaluate `J(x)`.
///   - Errors: return a descriptive `OptError` for infeasible inputs; the
///     run aborts with that error.
/// - `check(&Theta) -> OptResult<()>`: validation hook called once before
///   the first iteration.
///
/// Optional:
/// - `grad(&Theta) -> OptResult<Grad>`: analytic gradient `∇J(x)`. Returning
///   [`OptError::GradientNotImplemented`] selects finite differences.
pub trait Objective {
    // Required methods
    fn value(&self, x: &Theta) -> OptResult<Cost>;
    fn check(&self, x: &Theta) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _x: &Theta) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Choice of line search used inside the L-BFGS solver.
///
/// Parsing accepts case-insensitive `"MoreThuente"` / `"HagerZhang"`;
/// anything else returns `OptError::InvalidLineSearch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineSearcher {
    #[default]
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Finite-difference scheme for numerical gradients.
///
/// - `Central`: `(J(x + h e_i) − J(x − h e_i)) / 2h`, 2N evaluations.
/// - `Forward`: `(J(x + h e_i) − J(x)) / h`, N + 1 evaluations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FdScheme {
    #[default]
    Central,
    Forward,
}

/// Optimizer-level configuration.
///
/// Default:
/// - `tols`: `tol_grad = 1e-6`, `tol_cost = None`, `max_iter = 100`
/// - `line_searcher`: `MoreThuente`
/// - `fd_scheme`: `Central`
/// - `lbfgs_mem`: `None` (uses [`crate::optimization::minimizer::DEFAULT_LBFGS_MEM`])
/// - `record_iterations`: `false`
/// - `verbose`: `false`
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizerOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub fd_scheme: FdScheme,
    pub lbfgs_mem: Option<usize>,
    pub record_iterations: bool,
    pub verbose: bool,
}

impl MinimizerOptions {
    /// Create a new set of optimizer options.
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] if `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, fd_scheme: FdScheme,
        lbfgs_mem: Option<usize>, record_iterations: bool, verbose: bool,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self { tols, line_searcher, fd_scheme, lbfgs_mem, record_iterations, verbose })
    }
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            line_searcher: LineSearcher::MoreThuente,
            fd_scheme: FdScheme::Central,
            lbfgs_mem: None,
            record_iterations: false,
            verbose: false,
        }
    }
}

/// Numerical tolerances and iteration limits used by the optimizer.
///
/// - `tol_grad`: terminate when the gradient norm falls below this threshold.
/// - `tol_cost`: terminate when the change in cost falls below this threshold.
/// - `max_iter`: hard cap on the number of iterations.
///
/// Any field can be `None` but **at least one** of the three must be provided
/// (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

/// Iteration cap used when callers do not choose one.
pub const DEFAULT_MAX_ITER: usize = 100;

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Rules
    /// - At least one of `tol_grad`, `tol_cost`, or `max_iter` must be `Some`.
    /// - If provided, tolerances must be **finite and strictly positive**.
    /// - If provided, `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_grad: Some(1e-6), tol_cost: None, max_iter: Some(DEFAULT_MAX_ITER) }
    }
}

/// Successful terminal states of the minimizer.
///
/// Divergence and unexpected solver exits are errors, not terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// Gradient norm, cost change, or target cost criterion met.
    Converged,
    /// Iteration cap reached; the best state found is still returned.
    MaxIterReached,
}

impl TerminalState {
    /// Map argmin's termination status onto the engine's terminal states.
    ///
    /// # Errors
    /// - [`OptError::UnexpectedTermination`] for `NotTerminated`, interrupts,
    ///   timeouts, and solver-specific exits.
    pub fn from_status(status: &TerminationStatus) -> OptResult<Self> {
        match status {
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                Ok(TerminalState::MaxIterReached)
            }
            TerminationStatus::Terminated(
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached,
            ) => Ok(TerminalState::Converged),
            other => Err(OptError::UnexpectedTermination { reason: format!("{other:?}") }),
        }
    }
}

/// Canonical result returned by `minimize`.
///
/// - `x_hat`: best (last accepted) control vector.
/// - `value`: `J(x_hat)`.
/// - `terminal`: `Converged` or `MaxIterReached`.
/// - `status`: argmin's termination status rendered as text.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: argmin's counters (`cost_count`, `gradient_count`, ...).
/// - `grad_norm`: norm of the last available gradient, if present.
/// - `history`: per-iteration records when recording was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizerOutcome {
    pub x_hat: Theta,
    pub value: f64,
    pub terminal: TerminalState,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
    pub history: Option<Vec<IterationRecord>>,
}

impl MinimizerOutcome {
    /// Build a validated [`MinimizerOutcome`] from raw solver state.
    ///
    /// # Errors
    /// - Propagates validation errors for the analysis or the cost value.
    /// - [`OptError::UnexpectedTermination`] when the status is not a
    ///   successful terminal state.
    pub fn new(
        x_hat: Option<Theta>, value: f64, status: &TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>, history: Option<Vec<IterationRecord>>,
    ) -> OptResult<Self> {
        let x_hat = validate_analysis(x_hat)?;
        validate_value(value)?;
        let terminal = TerminalState::from_status(status)?;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            x_hat,
            value,
            terminal,
            status: format!("{status:?}"),
            iterations: iterations as usize,
            fn_evals,
            grad_norm,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Tolerances reject an empty configuration and a zero iteration cap.
    //
    // Given
    // -----
    // - All-`None` tolerances and `max_iter = Some(0)`.
    //
    // Expect
    // ------
    // - `NoTolerancesProvided` and `InvalidMaxIter`.
    fn tolerances_require_a_valid_stopping_rule() {
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(None, None, Some(0)),
            Err(OptError::InvalidMaxIter { max_iter: 0, .. })
        ));
        assert!(Tolerances::new(Some(1e-8), Some(1e-10), Some(50)).is_ok());
    }

    #[test]
    fn line_searcher_parses_case_insensitively() {
        assert_eq!("morethuente".parse::<LineSearcher>().unwrap(), LineSearcher::MoreThuente);
        assert_eq!("HAGERZHANG".parse::<LineSearcher>().unwrap(), LineSearcher::HagerZhang);
        assert!(matches!(
            "bisection".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    fn zero_lbfgs_memory_is_rejected() {
        let res = MinimizerOptions::new(
            Tolerances::default(),
            LineSearcher::MoreThuente,
            FdScheme::Central,
            Some(0),
            false,
            false,
        );
        assert!(matches!(res, Err(OptError::InvalidLBFGSMem { mem: 0, .. })));
    }

    #[test]
    // Purpose
    // -------
    // Map argmin termination reasons onto terminal states.
    //
    // Given
    // -----
    // - Converged, max-iteration, and interrupted statuses.
    //
    // Expect
    // ------
    // - `Converged`, `MaxIterReached`, and an `UnexpectedTermination` error.
    fn terminal_state_distinguishes_cap_from_convergence() {
        let converged = TerminationStatus::Terminated(TerminationReason::SolverConverged);
        let capped = TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        let interrupted = TerminationStatus::Terminated(TerminationReason::Interrupt);

        assert_eq!(TerminalState::from_status(&converged).unwrap(), TerminalState::Converged);
        assert_eq!(TerminalState::from_status(&capped).unwrap(), TerminalState::MaxIterReached);
        assert!(matches!(
            TerminalState::from_status(&interrupted),
            Err(OptError::UnexpectedTermination { .. })
        ));
        assert!(TerminalState::from_status(&TerminationStatus::NotTerminated).is_err());
    }

    #[test]
    fn outcome_reports_gradient_norm() {
        let status = TerminationStatus::Terminated(TerminationReason::SolverConverged);

        let out = MinimizerOutcome::new(
            Some(array![1.0, 2.0]),
            0.5,
            &status,
            4,
            FnEvalMap::new(),
            Some(array![3.0, 4.0]),
            None,
        )
        .unwrap();

        assert_eq!(out.terminal, TerminalState::Converged);
        assert_eq!(out.iterations, 4);
        assert_eq!(out.grad_norm, Some(5.0));
    }
}
