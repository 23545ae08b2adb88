//! Execution helper that runs an `argmin` solver on an [`Objective`] and
//! returns a crate-friendly [`MinimizerOutcome`].
use crate::optimization::{
    errors::OptResult,
    minimizer::{
        adapter::ArgMinAdapter,
        observer::IterationRecorder,
        traits::{MinimizerOptions, MinimizerOutcome, Objective, TerminalState},
        types::{MinState, Theta},
    },
};
use argmin::core::{CostFunction, Executor, Gradient, State, observers::ObserverMode};
use argmin_math::ArgminL2Norm;

/// run_lbfgs — execute an L-BFGS solver on an [`Objective`].
///
/// Purpose
/// -------
/// Shared runner for both line-search variants. Seeds the executor with
/// `x0`, attaches the requested observers, runs the solver, and converts the
/// final argmin state into a [`MinimizerOutcome`].
///
/// Parameters
/// ----------
/// - `x0`: `Theta`
///   Starting point. Already checked by the caller.
/// - `opts`: `&MinimizerOptions`
///   Consulted fields: `verbose`, `record_iterations`, `tols.max_iter`.
/// - `problem`: `ArgMinAdapter<'a, F>`
///   Objective bridge. Its failure slot is read after the run.
/// - `solver`: `S`
///   A configured `argmin` solver, usually from the builders.
///
/// Returns
/// -------
/// `OptResult<MinimizerOutcome>`
///   Best parameters, best cost, terminal state, counters, last gradient
///   norm, and the recorded history when requested.
///
/// Errors
/// ------
/// - The first `OptError` raised by the objective, when the run did not end
///   in convergence or at the iteration cap. This keeps a model-domain
///   failure inside the line search a `Domain` error with its step index.
/// - Otherwise, argmin runtime errors through `From<argmin::core::Error>`.
/// - `UnexpectedTermination` for other solver exits, via
///   [`MinimizerOutcome::new`].
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
/// - With the `obs_slog` feature and `opts.verbose`, argmin's terminal
///   logger is attached in addition to the `tracing` events.
/// - An objective error that the line search recovered from is discarded
///   when the run still ends successfully.
///
/// Examples
/// --------
/// ```ignore
/// let failure = RefCell::new(None);
/// let problem = ArgMinAdapter::new(&f, opts.fd_scheme, &failure);
/// let solver = build_optimizer_more_thuente(&opts)?;
/// let out = run_lbfgs(x0, &opts, problem, solver)?;
/// ```
pub fn run_lbfgs<'a, F, S>(
    x0: Theta, opts: &MinimizerOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<MinimizerOutcome>
where
    F: Objective,
    S: argmin::core::Solver<ArgMinAdapter<'a, F>, MinState> + Send + 'static,
{
    if opts.verbose {
        log_initial_state(&x0, &problem)?;
    }
    let failure = problem.failure();
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(x0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, ObserverMode::Always);
    }
    let recorder = opts.record_iterations.then(IterationRecorder::new);
    if let Some(recorder) = &recorder {
        optimizer = optimizer.add_observer(recorder.clone(), ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let run = optimizer.run();
    if let Some(err) = failure.borrow_mut().take() {
        let failed = match &run {
            Ok(res) => TerminalState::from_status(res.state().get_termination_status()).is_err(),
            Err(_) => true,
        };
        if failed {
            tracing::warn!(error = %err, "objective failed during the run");
            return Err(err);
        }
    }
    let mut result = run?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    let history = recorder.map(|r| r.take()).transpose()?;
    MinimizerOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        &termination,
        iterations,
        function_counts,
        grad,
        history,
    )
}

// ---- Helper Methods ----

fn log_initial_state<F>(x0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: Objective,
{
    let j0 = problem.cost(x0)?;
    let g0n = problem.gradient(x0).ok().map(|g| g.l2_norm());
    tracing::info!(cost = j0, grad_norm = ?g0n, "minimizer initial state");
    Ok(())
}
