//! Integration tests for SEIRD 4D-Var calibration.
//!
//! Purpose
//! -------
//! - Validate the end-to-end pipeline: from an observation window (synthetic
//!   or loaded from disk), through error preparation and L-BFGS
//!   minimization, to the calibrated state and its residual report.
//! - Exercise the realistic epidemic regime (tens of millions of
//!   susceptibles, per-day rates) alongside small convex surrogates.
//!
//! Coverage
//! --------
//! - `assimilation::trajectory`: rollout length and initial-state identity.
//! - `assimilation::cost`: non-negativity and a vanishing background term
//!   at the background.
//! - `assimilation::adjoint` vs finite differences through the public
//!   `VariationalProblem` objective.
//! - `assimilation::calibrate`: self-generated recovery, recovery from a
//!   perturbed background at population scale, domain failures at the
//!   background and at later iterates, dimension failures, monotone
//!   recorded costs.
//! - `assimilation::inspect_residuals` and `data::load_series`.
//!
//! Exclusions
//! ----------
//! - Low-level validation of covariances, options, and argmin wiring; those
//!   are covered by unit tests.
use approx::assert_relative_eq;
use ndarray::{Array1, Array2, ArrayView1, array, s};
use seird_4dvar::{
    assimilation::{
        CalibrationOptions, ErrorModel, ErrorSpec, GradientMethod, ModelAssumption,
        ObservationSeries, calibrate,
        cost::CostTerms,
        inspect_residuals,
        problem::{ResolvedGradient, VariationalProblem},
        rollout, synthesize_observations,
    },
    data::{SeriesSpec, load_series},
    model::{
        CompartmentObservation, FnForwardModel, FnObservation, ForwardModel, ModelError,
        ModelResult, SeirdModel,
    },
    optimization::{
        errors::{ErrorClass, OptError},
        minimizer::{FdScheme, Objective, TerminalState, Theta, Tolerances},
    },
};
use std::io::Write;

/// Background state of the mortality calibration:
/// `[S, E, I, R, D, α, β, ε, γ]`.
fn background() -> Theta {
    array![39_900_000.0, 10_000.0, 10_000.0, 80_000.0, 2_300.0, 0.006, 0.45, 0.125, 0.33]
}

/// Same epidemic with compartments as population fractions, for gradient
/// checks where an absolute finite-difference step is meaningful.
fn scaled_state() -> Theta {
    array![0.97, 0.01, 0.01, 0.01, 0.0, 0.01, 0.45, 0.125, 0.33]
}

fn background_errors() -> ErrorModel {
    ErrorModel::new(ErrorSpec::Diagonal(Array1::ones(9)), ErrorSpec::Scalar(1.0))
}

#[test]
// Purpose
// -------
// Calibrating against noise-free observations generated from the
// background recovers the background rates.
//
// Given
// -----
// - 100 daily deaths synthesized by rolling the background forward.
// - Default options: adjoint gradient, More–Thuente L-BFGS.
//
// Expect
// ------
// - `Converged`, rates within 1e-9 relative of the originals, zero cost,
//   and zero residuals at the analysis.
fn self_generated_series_recovers_rates() {
    // Arrange
    let model = SeirdModel::new();
    let obs_op = CompartmentObservation::deceased();
    let xb = background();
    let obs = synthesize_observations(&model, &obs_op, xb.view(), 100).unwrap();

    // Act
    let out = calibrate(
        &xb,
        &obs,
        &model,
        &obs_op,
        &background_errors(),
        &CalibrationOptions::default(),
    )
    .unwrap();
    let report = inspect_residuals(&model, &obs_op, out.analysis.view(), &obs).unwrap();

    // Assert
    assert_eq!(out.terminal, TerminalState::Converged);
    for i in 5..9 {
        assert_relative_eq!(out.analysis[i], xb[i], max_relative = 1e-9);
    }
    assert!(out.cost.abs() < 1e-9);
    assert!(out.background_minus_analysis.iter().all(|d| d.abs() < 1e-6));
    assert_eq!(report.n_steps(), 100);
    assert!(report.cumulative_abs_error < 1e-6);
    assert!(out.counters.forward_calls >= 100);
}

#[test]
// Purpose
// -------
// Calibration recovers the transmission rate from a perturbed background
// at population scale.
//
// Given
// -----
// - 100 daily deaths synthesized from the background.
// - A first guess with β lowered by 5%, everything else unchanged.
// - Up to 1000 iterations, recorded costs.
//
// Expect
// ------
// - `Converged` after at least one iteration.
// - The cost drops by three orders of magnitude from the first guess.
// - β is recovered to within 0.01 (the first guess is 0.0225 off).
fn perturbed_background_recovers_transmission_rate() {
    // Arrange
    let model = SeirdModel::new();
    let obs_op = CompartmentObservation::deceased();
    let truth = background();
    let obs = synthesize_observations(&model, &obs_op, truth.view(), 100).unwrap();
    let mut xb = truth.clone();
    xb[6] *= 0.95;
    let opts = CalibrationOptions {
        tols: Tolerances::new(Some(1e-6), None, Some(1000)).unwrap(),
        ..CalibrationOptions::default()
    }
    .with_stored(["CostFunctionJ"])
    .unwrap();

    // Act
    let out = calibrate(&xb, &obs, &model, &obs_op, &background_errors(), &opts).unwrap();

    // Assert
    assert_eq!(out.terminal, TerminalState::Converged, "{}", out.status);
    assert!(out.iterations >= 1);
    let first = out.intermediate.cost_j.as_ref().unwrap()[0];
    assert!(first > 0.0);
    assert!(out.cost < 1e-3 * first, "cost {} from {first}", out.cost);
    assert!((out.analysis[6] - truth[6]).abs() < 0.01, "beta {}", out.analysis[6]);
    assert!(out.analysis.iter().all(|v| v.is_finite()));
}

#[test]
// Purpose
// -------
// A model that fails only away from the background still reports a
// domain error with its step index, not a solver exit.
//
// Given
// -----
// - x_{t+1} = 1.1 xₜ, undefined for inputs above 2.5.
// - Observations from x = 1.8 over 5 steps; their best fit leaves the
//   domain at the last step. The background x = 1 stays inside it.
//
// Expect
// ------
// - `Err` in the `Domain` class, raised after the first step.
fn model_failing_at_later_iterates_is_a_domain_error() {
    // Arrange
    let growth = FnForwardModel::new(|x: ArrayView1<'_, f64>| -> ModelResult<Array1<f64>> {
        Ok(&x * 1.1)
    });
    let fenced = FnForwardModel::new(|x: ArrayView1<'_, f64>| -> ModelResult<Array1<f64>> {
        if x[0] > 2.5 {
            return Err(ModelError::Custom { reason: "growth above capacity".into() });
        }
        Ok(&x * 1.1)
    });
    let obs_op = FnObservation::new(|x: ArrayView1<'_, f64>| -> ModelResult<Array1<f64>> {
        Ok(x.to_owned())
    });
    let obs = synthesize_observations(&growth, &obs_op, array![1.8].view(), 5).unwrap();
    let errors = ErrorModel::new(ErrorSpec::Scalar(1.0), ErrorSpec::Scalar(1.0));

    // Act
    let err = calibrate(&array![1.0], &obs, &fenced, &obs_op, &errors, &CalibrationOptions::default())
        .unwrap_err();

    // Assert
    assert_eq!(err.class(), ErrorClass::Domain, "{err}");
    assert!(matches!(err, OptError::Domain { step, .. } if step >= 1), "{err:?}");
}

#[test]
// Purpose
// -------
// A state with no living population is a domain error, never NaN.
//
// Given
// -----
// - All compartments zero, rates unchanged.
//
// Expect
// ------
// - The model step returns `ZeroPopulation`.
// - `calibrate` aborts with a `Domain` class error at step 0.
fn zero_population_is_a_domain_error() {
    // Arrange
    let model = SeirdModel::new();
    let obs_op = CompartmentObservation::deceased();
    let mut xb = background();
    xb.slice_mut(s![0..5]).fill(0.0);
    let obs = ObservationSeries::from_scalars(Array1::from_elem(10, 2_300.0)).unwrap();

    // Act
    let step = model.step(xb.view());
    let err = calibrate(
        &xb,
        &obs,
        &model,
        &obs_op,
        &background_errors(),
        &CalibrationOptions::default(),
    )
    .unwrap_err();

    // Assert
    assert_eq!(step.unwrap_err(), ModelError::ZeroPopulation);
    assert_eq!(err.class(), ErrorClass::Domain);
    assert!(matches!(err, OptError::Domain { step: 0, .. }));
}

#[test]
// Purpose
// -------
// Error specifications are checked against the problem dimensions before
// the model is ever called.
//
// Given
// -----
// - 50 observations, background error of length 9, evolution error of
//   length 5, under both model assumptions.
// - A forward model that fails if invoked.
//
// Expect
// ------
// - `ErrorSpecDimMismatch` in the `Dimension` class both times.
fn mismatched_evolution_error_is_a_dimension_error() {
    // Arrange
    let xb = background();
    let obs = ObservationSeries::from_scalars(Array1::linspace(2_300.0, 9_000.0, 50)).unwrap();
    let errors = background_errors().with_evolution(ErrorSpec::Diagonal(Array1::ones(5)));
    let untouchable = FnForwardModel::new(|_: ArrayView1<'_, f64>| -> ModelResult<Array1<f64>> {
        Err(ModelError::Custom { reason: "model must not run".into() })
    });
    let obs_op = CompartmentObservation::deceased();

    for assumption in [ModelAssumption::Perfect, ModelAssumption::Imperfect] {
        let opts = CalibrationOptions { model_assumption: assumption, ..CalibrationOptions::default() };

        // Act
        let err = calibrate(&xb, &obs, &untouchable, &obs_op, &errors, &opts).unwrap_err();

        // Assert
        assert_eq!(err.class(), ErrorClass::Dimension, "{assumption:?}");
        assert!(matches!(
            err,
            OptError::ErrorSpecDimMismatch { kind: "evolution", expected: 9, found: (5, 1) }
        ));
    }
}

#[test]
fn rollout_has_one_more_state_than_steps() {
    let model = SeirdModel::new();
    let x0 = background();

    for k in [0, 1, 7, 100] {
        let traj = rollout(&model, x0.view(), k).unwrap();
        assert_eq!(traj.n_states(), k + 1);
        assert_eq!(traj.initial(), x0.view());
    }
}

#[test]
// Purpose
// -------
// The cost is non-negative everywhere and its background term vanishes at
// the background.
//
// Given
// -----
// - Deaths synthesized from a perturbed truth, full background covariance.
// - Several evaluation points including `xb`.
//
// Expect
// ------
// - `J ≥ 0` at every point; `Jb(xb) == 0` exactly; `Jo(xb) > 0`.
fn cost_is_non_negative_and_background_term_vanishes() {
    // Arrange
    let model = SeirdModel::new();
    let obs_op = CompartmentObservation::deceased();
    let xb = scaled_state();
    let mut truth = xb.clone();
    truth[6] = 0.5;
    let obs = synthesize_observations(&model, &obs_op, truth.view(), 30).unwrap();
    let mut b = Array2::from_diag(&Array1::from_elem(9, 0.5));
    b[[6, 7]] = 0.1;
    b[[7, 6]] = 0.1;
    let errors = ErrorModel::new(ErrorSpec::Full(b), ErrorSpec::Scalar(1e-4))
        .prepare(9, 1, ModelAssumption::Perfect)
        .unwrap();
    let terms = CostTerms {
        background: xb.view(),
        observations: &obs,
        errors: &errors,
        assumption: ModelAssumption::Perfect,
    };

    // Act
    let at_background = terms.evaluate(&model, &obs_op, &xb).unwrap();
    let others = [truth.clone(), &xb * 1.1, &xb * 0.9]
        .map(|x| terms.evaluate(&model, &obs_op, &x).unwrap().breakdown);

    // Assert
    assert_eq!(at_background.breakdown.jb, 0.0);
    assert!(at_background.breakdown.jo > 0.0);
    for b in others {
        assert!(b.total() >= 0.0 && b.jb >= 0.0 && b.jo >= 0.0);
    }
}

#[test]
// Purpose
// -------
// The adjoint and finite-difference gradients of the same objective agree.
//
// Given
// -----
// - Two problems over identical terms, one forced to the adjoint and one to
//   central differences; three sample points.
//
// Expect
// ------
// - Component-wise agreement within 1e-4 relative to the largest component.
fn adjoint_and_finite_difference_gradients_agree() {
    // Arrange
    let model = SeirdModel::new();
    let obs_op = CompartmentObservation::deceased();
    let xb = scaled_state();
    let mut truth = xb.clone();
    truth[5] = 0.012;
    truth[8] = 0.3;
    let obs = synthesize_observations(&model, &obs_op, truth.view(), 25).unwrap();
    let errors = ErrorModel::new(ErrorSpec::Scalar(1.0), ErrorSpec::Scalar(1e-8))
        .prepare(9, 1, ModelAssumption::Perfect)
        .unwrap();
    let terms = CostTerms {
        background: xb.view(),
        observations: &obs,
        errors: &errors,
        assumption: ModelAssumption::Perfect,
    };
    let adjoint = VariationalProblem::new(&model, &obs_op, terms, GradientMethod::Adjoint);
    let fd = VariationalProblem::new(
        &model,
        &obs_op,
        terms,
        GradientMethod::FiniteDifference(FdScheme::Central),
    );
    let mut shifted = xb.clone();
    shifted[6] = 0.48;

    for x in [xb.clone(), truth.clone(), shifted] {
        // Act
        let ga = adjoint.grad(&x).unwrap();
        let gf = fd.grad(&x).unwrap();

        // Assert
        let scale = gf.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        for (a, f) in ga.iter().zip(gf.iter()) {
            assert!((a - f).abs() <= 1e-4 * scale, "adjoint {a} vs finite difference {f}");
        }
    }
    assert_eq!(adjoint.gradient_method(), ResolvedGradient::Adjoint);
    assert_eq!(fd.gradient_method(), ResolvedGradient::FiniteDifference(FdScheme::Central));
}

#[test]
// Purpose
// -------
// Accepted iterates never increase the cost on a convex surrogate.
//
// Given
// -----
// - A three-component diagonal linear model observed in full, background
//   away from the truth, both line searches, every iterate recorded.
//
// Expect
// ------
// - Recorded costs never increase beyond the line-search slack, the
//   optimum matches the reported cost, and every analysis component lies
//   between background and truth.
fn recorded_costs_decrease_on_convex_surrogate() {
    // Arrange
    let model = FnForwardModel::new(|x: ArrayView1<'_, f64>| -> ModelResult<Array1<f64>> {
        Ok(array![0.95 * x[0], 0.8 * x[1], 0.6 * x[2]])
    });
    let obs_op = FnObservation::new(|x: ArrayView1<'_, f64>| -> ModelResult<Array1<f64>> {
        Ok(x.to_owned())
    });
    let truth = array![3.0, 2.0, 1.0];
    let xb = array![1.0, 1.0, 1.5];
    let obs = synthesize_observations(&model, &obs_op, truth.view(), 12).unwrap();
    let errors = ErrorModel::new(ErrorSpec::Scalar(4.0), ErrorSpec::Scalar(0.25));

    for line_searcher in ["MoreThuente", "HagerZhang"] {
        let opts = CalibrationOptions {
            line_searcher: line_searcher.parse().unwrap(),
            ..CalibrationOptions::default()
        }
        .with_stored(["CostFunctionJ", "IndexOfOptimum", "GradientNorm"])
        .unwrap();

        // Act
        let out = calibrate(&xb, &obs, &model, &obs_op, &errors, &opts).unwrap();

        // Assert
        assert!(out.converged(), "{line_searcher}: {}", out.status);
        let costs = out.intermediate.cost_j.as_ref().unwrap();
        assert!(costs.len() >= 2);
        for pair in costs.windows(2) {
            let slack = 1e-6 * pair[0].abs().max(1.0);
            assert!(pair[1] <= pair[0] + slack, "{line_searcher}: {pair:?}");
        }
        let best = out.intermediate.index_of_optimum.unwrap();
        assert_relative_eq!(costs[best], out.cost, max_relative = 1e-12);
        for i in 0..3 {
            let (lo, hi) = if xb[i] < truth[i] { (xb[i], truth[i]) } else { (truth[i], xb[i]) };
            assert!(out.analysis[i] > lo && out.analysis[i] < hi, "component {i}");
        }
    }
}

#[test]
// Purpose
// -------
// A series loaded from daily counts on disk reproduces the cumulative
// trajectory, and residual inspection reports it as an exact fit.
//
// Given
// -----
// - Daily death increments of a 40-step synthetic run written as
//   `country,code,day,value` rows interleaved with another region.
//
// Expect
// ------
// - The loaded 30-step tail matches the synthetic cumulative deaths.
// - Residuals of the generating state against that tail are negligible.
fn loaded_series_matches_synthetic_deaths() {
    // Arrange
    let model = SeirdModel::new();
    let obs_op = CompartmentObservation::deceased();
    let xb = background();
    let cumulative = synthesize_observations(&model, &obs_op, xb.view(), 40).unwrap();
    let deaths: Vec<f64> = cumulative.values().column(0).to_vec();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let mut previous = 0.0;
    for (day, &total) in deaths.iter().enumerate() {
        writeln!(file, "Poland,POL,{day},{}", total - previous).unwrap();
        writeln!(file, "Germany,DEU,{day},1").unwrap();
        previous = total;
    }
    file.flush().unwrap();

    // Act
    let loaded = load_series(file.path(), &SeriesSpec::default().with_window(30)).unwrap();
    let window = ObservationSeries::from_scalars(loaded.clone()).unwrap();
    let start = rollout(&model, xb.view(), 10).unwrap().state(10).to_owned();
    let report = inspect_residuals(&model, &obs_op, start.view(), &window).unwrap();

    // Assert
    assert_eq!(loaded.len(), 30);
    for (l, d) in loaded.iter().zip(&deaths[10..]) {
        assert_relative_eq!(*l, *d, max_relative = 1e-12);
    }
    assert!(report.max_abs_error() < 1e-6);
}
