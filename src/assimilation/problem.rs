//! assimilation::problem — the variational cost as a minimizer objective.
//!
//! Purpose
//! -------
//! Bind the model functions, observations, and prepared errors of one
//! calibration into an [`Objective`] the L-BFGS driver can minimize.
//!
//! Key behaviors
//! -------------
//! - Costs and adjoint gradients at the same `x` share one cached
//!   [`Evaluation`], so there is no recomputation drift within an iteration.
//! - [`GradientMethod::Auto`] is resolved once at construction by trying
//!   both Jacobians at the background.
//! - The objective is minimized over control variables `u` with
//!   `x = offset + scale ⊙ u` (see [`ControlTransform`]) and a cost divided
//!   by a constant `c`. [`VariationalProblem::normalized`] picks `c` so the
//!   first steepest-descent step has unit length in `u`.
//! - Finite differences perturb `u`, so steps are relative to each
//!   component's scale.
//! - Finite-difference perturbations bypass the cache so the accepted
//!   iterate's trajectory stays cached.
//! - Model calls and objective evaluations are counted per problem.
//!
//! Invariants & assumptions
//! ------------------------
//! - One problem serves exactly one calibration; counters start at zero.
//! - The cache key is exact equality of the state `x`.
//! - With the default identity transform and `c = 1`, `u` is `x` and the
//!   objective is `J` itself.
use crate::{
    assimilation::{
        adjoint::{adjoint_gradient, supports_adjoint},
        control::ControlTransform,
        cost::{CostTerms, Evaluation},
        counters::{Counted, EvalCounts},
        options::GradientMethod,
    },
    model::traits::{ForwardModel, ObservationOperator},
    optimization::{
        errors::{OptError, OptResult},
        minimizer::{Cost, FdScheme, Grad, Objective, Theta, fd_gradient},
    },
};
use std::cell::{Cell, RefCell};

/// Gradient method after resolving [`GradientMethod::Auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedGradient {
    Adjoint,
    FiniteDifference(FdScheme),
}

/// Variational cost over one observation window.
pub struct VariationalProblem<'a, M, H> {
    model: Counted<&'a M>,
    obs_op: Counted<&'a H>,
    terms: CostTerms<'a>,
    gradient: ResolvedGradient,
    control: ControlTransform,
    cost_scale: f64,
    cache: RefCell<Option<Evaluation>>,
    cost_evals: Cell<u64>,
    gradient_evals: Cell<u64>,
}

impl<'a, M, H> VariationalProblem<'a, M, H>
where
    M: ForwardModel,
    H: ObservationOperator,
{
    pub fn new(model: &'a M, obs_op: &'a H, terms: CostTerms<'a>, method: GradientMethod) -> Self {
        let gradient = match method {
            GradientMethod::Adjoint => ResolvedGradient::Adjoint,
            GradientMethod::FiniteDifference(scheme) => ResolvedGradient::FiniteDifference(scheme),
            GradientMethod::Auto => {
                if supports_adjoint(model, obs_op, terms.background) {
                    ResolvedGradient::Adjoint
                } else {
                    ResolvedGradient::FiniteDifference(FdScheme::Central)
                }
            }
        };
        Self {
            model: Counted::new(model),
            obs_op: Counted::new(obs_op),
            control: ControlTransform::identity(terms.background.len()),
            cost_scale: 1.0,
            terms,
            gradient,
            cache: RefCell::new(None),
            cost_evals: Cell::new(0),
            gradient_evals: Cell::new(0),
        }
    }

    /// Minimize over `u` with `x = control.to_state(u)`.
    pub fn with_control(mut self, control: ControlTransform) -> Self {
        self.control = control;
        self
    }

    /// Divide the cost by `‖∇ᵤJ‖` at the control origin.
    ///
    /// The gradient is evaluated with `c = 1` and counts as one gradient
    /// evaluation. A zero or non-finite norm keeps `c = 1`.
    ///
    /// # Errors
    /// Propagates model and validation errors from the gradient evaluation.
    pub fn normalized(mut self) -> OptResult<Self> {
        self.cost_scale = 1.0;
        let g = self.grad(&self.control.origin())?;
        let norm = g.dot(&g).sqrt();
        if norm.is_finite() && norm > 0.0 {
            self.cost_scale = norm;
        }
        tracing::debug!(cost_scale = self.cost_scale, "cost normalized");
        Ok(self)
    }

    pub fn gradient_method(&self) -> ResolvedGradient {
        self.gradient
    }

    pub fn control(&self) -> &ControlTransform {
        &self.control
    }

    /// The constant `c` dividing `J` in the objective.
    pub fn cost_scale(&self) -> f64 {
        self.cost_scale
    }

    pub fn terms(&self) -> &CostTerms<'a> {
        &self.terms
    }

    /// Snapshot of the invocation counters.
    pub fn counts(&self) -> EvalCounts {
        EvalCounts {
            forward_calls: self.model.calls(),
            observation_calls: self.obs_op.calls(),
            cost_evals: self.cost_evals.get(),
            gradient_evals: self.gradient_evals.get(),
        }
    }

    /// Evaluate at `x` without touching the cache.
    pub fn evaluate(&self, x: &Theta) -> OptResult<Evaluation> {
        self.terms.evaluate(&self.model, &self.obs_op, x)
    }

    /// Run `f` on the cached evaluation at `x`, computing it first if needed.
    pub fn with_evaluation<R>(
        &self, x: &Theta, f: impl FnOnce(&Evaluation) -> OptResult<R>,
    ) -> OptResult<R> {
        let hit = matches!(&*self.cache.borrow(), Some(eval) if eval.x == *x);
        if !hit {
            let eval = self.evaluate(x)?;
            *self.cache.borrow_mut() = Some(eval);
        }
        let cache = self.cache.borrow();
        match cache.as_ref() {
            Some(eval) => f(eval),
            None => Err(OptError::UnknownError),
        }
    }
}

impl<'a, M, H> Objective for VariationalProblem<'a, M, H>
where
    M: ForwardModel,
    H: ObservationOperator,
{
    /// `J(to_state(u)) / c`.
    fn value(&self, u: &Theta) -> OptResult<Cost> {
        self.cost_evals.set(self.cost_evals.get() + 1);
        let x = self.control.to_state(u);
        self.with_evaluation(&x, |eval| Ok(eval.breakdown.total() / self.cost_scale))
    }

    fn check(&self, u: &Theta) -> OptResult<()> {
        let expected = self.control.dim();
        if u.len() != expected {
            return Err(OptError::GradientDimMismatch { expected, found: u.len() });
        }
        if let Some((index, &value)) = u.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(OptError::NonFiniteBackground { index, value });
        }
        Ok(())
    }

    fn grad(&self, u: &Theta) -> OptResult<Grad> {
        self.gradient_evals.set(self.gradient_evals.get() + 1);
        match self.gradient {
            ResolvedGradient::Adjoint => {
                let x = self.control.to_state(u);
                let gx = self.with_evaluation(&x, |eval| {
                    adjoint_gradient(&self.model, &self.obs_op, &self.terms, eval)
                })?;
                Ok(self.control.gradient_to_control(&gx)? / self.cost_scale)
            }
            ResolvedGradient::FiniteDifference(scheme) => {
                let cost = |v: &Theta| {
                    let x = self.control.to_state(v);
                    Ok(self.evaluate(&x)?.breakdown.total() / self.cost_scale)
                };
                fd_gradient(u, cost, scheme)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assimilation::{
            covariance::{ErrorModel, ErrorSpec},
            options::ModelAssumption,
            trajectory::synthesize_observations,
        },
        model::{CompartmentObservation, FnObservation, ModelResult, SeirdModel},
    };
    use ndarray::{Array1, ArrayView1, array};

    fn x0() -> Theta {
        array![0.97, 0.01, 0.01, 0.01, 0.0, 0.01, 0.45, 0.125, 0.33]
    }

    #[test]
    // Purpose
    // -------
    // Cost and adjoint gradient at the same point share one rollout.
    //
    // Given
    // -----
    // - A 10-step window; `value` then `grad` then `value` at the same x.
    //
    // Expect
    // ------
    // - 10 forward calls in total; counters report 2 costs and 1 gradient.
    fn cost_and_gradient_share_cached_evaluation() {
        // Arrange
        let model = SeirdModel::new();
        let obs_op = CompartmentObservation::deceased();
        let x = x0();
        let obs = synthesize_observations(&model, &obs_op, x.view(), 10).unwrap();
        let errors = ErrorModel::new(ErrorSpec::Scalar(1.0), ErrorSpec::Scalar(1e-6))
            .prepare(9, 1, ModelAssumption::Perfect)
            .unwrap();
        let terms = CostTerms {
            background: x.view(),
            observations: &obs,
            errors: &errors,
            assumption: ModelAssumption::Perfect,
        };
        let problem = VariationalProblem::new(&model, &obs_op, terms, GradientMethod::Auto);

        // Act
        let j1 = problem.value(&x).unwrap();
        let g = problem.grad(&x).unwrap();
        let j2 = problem.value(&x).unwrap();

        // Assert
        assert_eq!(problem.gradient_method(), ResolvedGradient::Adjoint);
        assert_eq!(j1, j2);
        assert_eq!(g.len(), 9);
        let counts = problem.counts();
        assert_eq!(counts.forward_calls, 10);
        assert_eq!(counts.observation_calls, 10);
        assert_eq!(counts.cost_evals, 2);
        assert_eq!(counts.gradient_evals, 1);
    }

    #[test]
    fn auto_falls_back_to_finite_differences_without_jacobian() {
        let model = SeirdModel::new();
        let obs_op = FnObservation::new(|x: ArrayView1<'_, f64>| -> ModelResult<Array1<f64>> {
            Ok(array![x[4]])
        });
        let x = x0();
        let obs = synthesize_observations(&model, &obs_op, x.view(), 5).unwrap();
        let errors = ErrorModel::new(ErrorSpec::Scalar(1.0), ErrorSpec::Scalar(1.0))
            .prepare(9, 1, ModelAssumption::Perfect)
            .unwrap();
        let terms = CostTerms {
            background: x.view(),
            observations: &obs,
            errors: &errors,
            assumption: ModelAssumption::Perfect,
        };

        let problem = VariationalProblem::new(&model, &obs_op, terms, GradientMethod::Auto);
        let g = problem.grad(&x).unwrap();

        assert_eq!(
            problem.gradient_method(),
            ResolvedGradient::FiniteDifference(FdScheme::Central)
        );
        assert!(g.iter().all(|v| v.abs() < 1e-6));
        // 2 · 9 perturbed rollouts of 5 steps each.
        assert_eq!(problem.counts().forward_calls, 90);
    }

    #[test]
    fn check_rejects_wrong_length() {
        let model = SeirdModel::new();
        let obs_op = CompartmentObservation::deceased();
        let x = x0();
        let obs = synthesize_observations(&model, &obs_op, x.view(), 2).unwrap();
        let errors = ErrorModel::new(ErrorSpec::Scalar(1.0), ErrorSpec::Scalar(1.0))
            .prepare(9, 1, ModelAssumption::Perfect)
            .unwrap();
        let terms = CostTerms {
            background: x.view(),
            observations: &obs,
            errors: &errors,
            assumption: ModelAssumption::Perfect,
        };
        let problem = VariationalProblem::new(&model, &obs_op, terms, GradientMethod::Adjoint);

        assert!(problem.check(&array![1.0, 2.0]).is_err());
        assert!(problem.check(&x).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Normalization makes the first steepest-descent step unit-sized in the
    // relative controls without changing the physical cost.
    //
    // Given
    // -----
    // - A SEIRD background at population scale with β lowered by 5%, and
    //   30 observations from the unperturbed state.
    //
    // Expect
    // ------
    // - ‖∇ᵤ(J/c)‖ = 1 at the origin and c · value(0) = J(xb).
    // - The normalization gradient is counted.
    fn normalized_relative_controls_have_unit_initial_gradient() {
        // Arrange
        let model = SeirdModel::new();
        let obs_op = CompartmentObservation::deceased();
        let truth = array![39_900_000.0, 10_000.0, 10_000.0, 80_000.0, 2_300.0, 0.006, 0.45, 0.125, 0.33];
        let obs = synthesize_observations(&model, &obs_op, truth.view(), 30).unwrap();
        let mut xb = truth.clone();
        xb[6] *= 0.95;
        let errors = ErrorModel::new(ErrorSpec::Diagonal(Array1::ones(9)), ErrorSpec::Scalar(1.0))
            .prepare(9, 1, ModelAssumption::Perfect)
            .unwrap();
        let terms = CostTerms {
            background: xb.view(),
            observations: &obs,
            errors: &errors,
            assumption: ModelAssumption::Perfect,
        };
        let raw = terms.evaluate(&model, &obs_op, &xb).unwrap().breakdown.total();

        // Act
        let problem = VariationalProblem::new(&model, &obs_op, terms, GradientMethod::Adjoint)
            .with_control(ControlTransform::relative_to(&xb))
            .normalized()
            .unwrap();
        let origin = problem.control().origin();
        let g = problem.grad(&origin).unwrap();
        let j = problem.value(&origin).unwrap();

        // Assert
        assert!(problem.cost_scale() > 1.0);
        assert!((g.dot(&g).sqrt() - 1.0).abs() < 1e-12);
        assert!((j * problem.cost_scale() - raw).abs() <= 1e-12 * raw);
        assert_eq!(problem.counts().gradient_evals, 2);
    }

    #[test]
    // Purpose
    // -------
    // Finite differences in relative controls match the adjoint at
    // population scale, where absolute steps are lost in rounding.
    //
    // Given
    // -----
    // - The scaled-up background with β lowered by 0.1%, 20 observations.
    //
    // Expect
    // ------
    // - Central differences agree with the adjoint to 1e-4 of the largest
    //   component.
    fn relative_finite_differences_match_adjoint_at_population_scale() {
        // Arrange
        let model = SeirdModel::new();
        let obs_op = CompartmentObservation::deceased();
        let truth = array![39_900_000.0, 10_000.0, 10_000.0, 80_000.0, 2_300.0, 0.006, 0.45, 0.125, 0.33];
        let obs = synthesize_observations(&model, &obs_op, truth.view(), 20).unwrap();
        let mut xb = truth.clone();
        xb[6] *= 0.999;
        let errors = ErrorModel::new(ErrorSpec::Diagonal(Array1::ones(9)), ErrorSpec::Scalar(1.0))
            .prepare(9, 1, ModelAssumption::Perfect)
            .unwrap();
        let terms = CostTerms {
            background: xb.view(),
            observations: &obs,
            errors: &errors,
            assumption: ModelAssumption::Perfect,
        };
        let control = ControlTransform::relative_to(&xb);
        let adjoint = VariationalProblem::new(&model, &obs_op, terms, GradientMethod::Adjoint)
            .with_control(control.clone());
        let central = VariationalProblem::new(
            &model,
            &obs_op,
            terms,
            GradientMethod::FiniteDifference(FdScheme::Central),
        )
        .with_control(control.clone());

        // Act
        let ga = adjoint.grad(&control.origin()).unwrap();
        let gf = central.grad(&control.origin()).unwrap();

        // Assert
        let max = ga.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(max > 0.0);
        for (a, f) in ga.iter().zip(gf.iter()) {
            assert!((a - f).abs() <= 1e-4 * max, "adjoint {a} vs finite difference {f}");
        }
    }
}
