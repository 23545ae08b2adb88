//! High-level entry point for variational calibration.
//!
//! Validates every input eagerly, binds the model functions into a
//! [`VariationalProblem`], minimizes it with L-BFGS, and packages the
//! result as a [`CalibrationOutcome`].
use crate::{
    assimilation::{
        control::ControlTransform,
        cost::CostTerms,
        covariance::ErrorModel,
        options::CalibrationOptions,
        outcome::{CalibrationOutcome, IntermediateRecords},
        problem::VariationalProblem,
        series::ObservationSeries,
    },
    model::traits::{ForwardModel, ObservationOperator},
    optimization::{
        errors::{OptError, OptResult},
        minimizer::{IterationRecord, Theta, minimize},
    },
};

/// Calibrate the control vector against an observation series.
///
/// # Behavior
/// 1. Validates the background, the error specifications, and the
///    observation operator's output width before any iteration.
/// 2. Builds a fresh problem (new counters, empty cache) and resolves the
///    gradient method.
/// 3. Minimizes over background-relative controls, `x = xb ⊙ (1 + u)`,
///    with the cost divided by its initial gradient norm. This keeps the
///    first L-BFGS step and finite-difference steps proportional to each
///    component, whether it is a population or a rate.
/// 4. Returns the best accepted state with its physical cost breakdown,
///    counters, and any requested per-iteration records.
///
/// `Converged` and `MaxIterReached` are both `Ok`; every other stop is an
/// error.
///
/// # Errors
/// - Dimension errors (`EmptyBackground`, `ErrorSpecDimMismatch`,
///   `ObservationDimMismatch`, ...) before iterating.
/// - Configuration errors from the error specifications.
/// - Domain errors from the model functions at any iterate.
/// - Convergence errors for non-finite costs or gradients and unexpected
///   solver exits.
///
/// # Example
/// ```
/// use ndarray::array;
/// use seird_4dvar::assimilation::{
///     CalibrationOptions, ErrorModel, ErrorSpec, calibrate, synthesize_observations,
/// };
/// use seird_4dvar::model::{CompartmentObservation, SeirdModel};
///
/// let model = SeirdModel::new();
/// let obs_op = CompartmentObservation::deceased();
/// let xb = array![0.97, 0.01, 0.01, 0.01, 0.0, 0.01, 0.45, 0.125, 0.33];
/// let obs = synthesize_observations(&model, &obs_op, xb.view(), 30)?;
/// let errors = ErrorModel::new(ErrorSpec::Scalar(1.0), ErrorSpec::Scalar(1e-6));
///
/// let out = calibrate(&xb, &obs, &model, &obs_op, &errors, &CalibrationOptions::default())?;
/// assert!(out.converged());
/// # Ok::<(), seird_4dvar::optimization::errors::OptError>(())
/// ```
pub fn calibrate<M, H>(
    xb: &Theta, observations: &ObservationSeries, model: &M, obs_op: &H, errors: &ErrorModel,
    opts: &CalibrationOptions,
) -> OptResult<CalibrationOutcome>
where
    M: ForwardModel,
    H: ObservationOperator,
{
    validate_background(xb)?;
    let state_dim = xb.len();
    let obs_dim = observations.obs_dim();
    let prepared = errors.prepare(state_dim, obs_dim, opts.model_assumption)?;
    let observed = obs_op
        .observe(xb.view())
        .map_err(|source| OptError::ObservationDomain { state: 0, source })?;
    if observed.len() != obs_dim {
        return Err(OptError::ObservationDimMismatch { expected: obs_dim, found: observed.len() });
    }

    let terms = CostTerms {
        background: xb.view(),
        observations,
        errors: &prepared,
        assumption: opts.model_assumption,
    };
    let problem = VariationalProblem::new(model, obs_op, terms, opts.gradient)
        .with_control(ControlTransform::relative_to(xb))
        .normalized()
        .inspect_err(|e| {
            tracing::warn!(error = %e, class = ?e.class(), "calibration failed at the background");
        })?;
    tracing::debug!(
        state_dim,
        obs_dim,
        n_steps = observations.n_steps(),
        gradient = ?problem.gradient_method(),
        assumption = ?opts.model_assumption,
        cost_scale = problem.cost_scale(),
        "starting calibration"
    );

    let u0 = problem.control().origin();
    let out = minimize(&problem, u0, &opts.minimizer_options()).inspect_err(|e| {
        tracing::warn!(error = %e, class = ?e.class(), "calibration failed");
    })?;
    let counters = problem.counts();

    let analysis = problem.control().to_state(&out.x_hat);
    let breakdown = problem.with_evaluation(&analysis, |eval| Ok(eval.breakdown))?;
    let intermediate = match &out.history {
        Some(history) => {
            let physical = to_physical(history, problem.control(), problem.cost_scale());
            IntermediateRecords::from_history(&physical, opts, |x| {
                Ok(problem.evaluate(x)?.breakdown)
            })?
        }
        None => IntermediateRecords::default(),
    };

    tracing::info!(
        iterations = out.iterations,
        cost = breakdown.total(),
        jb = breakdown.jb,
        jo = breakdown.jo,
        jq = breakdown.jq,
        terminal = ?out.terminal,
        forward_calls = counters.forward_calls,
        cost_evals = counters.cost_evals,
        gradient_evals = counters.gradient_evals,
        "calibration finished"
    );

    Ok(CalibrationOutcome {
        background_minus_analysis: xb - &analysis,
        analysis,
        cost: breakdown.total(),
        breakdown,
        terminal: out.terminal,
        status: out.status,
        iterations: out.iterations,
        fn_evals: out.fn_evals,
        counters,
        grad_norm: out.grad_norm,
        intermediate,
    })
}

/// Recorded iterates with states and costs in model units.
fn to_physical(
    history: &[IterationRecord], control: &ControlTransform, cost_scale: f64,
) -> Vec<IterationRecord> {
    history
        .iter()
        .map(|r| IterationRecord {
            state: control.to_state(&r.state),
            cost: r.cost * cost_scale,
            ..r.clone()
        })
        .collect()
}

fn validate_background(xb: &Theta) -> OptResult<()> {
    if xb.is_empty() {
        return Err(OptError::EmptyBackground);
    }
    if let Some((index, &value)) = xb.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(OptError::NonFiniteBackground { index, value });
    }
    Ok(())
}
