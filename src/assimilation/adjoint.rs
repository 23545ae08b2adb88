//! assimilation::adjoint — exact cost gradient by a backward sweep.
//!
//! Purpose
//! -------
//! Compute `∇J(x)` with one backward pass over a cached trajectory using
//! the tangent-linear operators of the forward model and the observation
//! operator.
//!
//! Key behaviors
//! -------------
//! - With `dₜ = yₜ − H(x_{t+1})` and `rₜ = x_{t+1} − xₜ`, the local
//!   sensitivity of `J` to trajectory state `xₜ` is
//!   `−2 Hₜᵀ Ri d_{t−1}` (for `t ≥ 1`) plus, under an imperfect model,
//!   `2 Qi r_{t−1}` (for `t ≥ 1`) and `−2 Qi rₜ` (for `t < n`).
//! - The sweep `λₙ = localₙ`, `λₜ = Mₜᵀ λ_{t+1} + localₜ` ends with
//!   `∇J = λ₀ + 2 Bi (x − xb)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The evaluation passed in must belong to the same `x` the gradient is
//!   requested for; the engine's cache guarantees this.
//! - Jacobians are `N × N` for the model and `obs_dim × N` for the
//!   observation operator; any other shape is a dimension error.
use crate::{
    assimilation::{
        covariance::ErrorKind,
        cost::{CostTerms, Evaluation},
        options::ModelAssumption,
    },
    model::{
        errors::ModelError,
        traits::{ForwardModel, ObservationOperator},
    },
    optimization::{
        errors::{OptError, OptResult},
        minimizer::types::Grad,
    },
};
use ndarray::{Array1, Array2, ArrayView1};

const FORWARD: &str = "forward model";
const OBSERVATION: &str = "observation";

/// Whether both model functions provide Jacobians at `x`.
///
/// Only `JacobianNotImplemented` counts as unsupported; any other failure
/// is left for the cost evaluation to report.
pub fn supports_adjoint<M, H>(model: &M, obs_op: &H, x: ArrayView1<'_, f64>) -> bool
where
    M: ForwardModel,
    H: ObservationOperator,
{
    let unsupported = |res: Result<Array2<f64>, ModelError>| {
        matches!(res, Err(ModelError::JacobianNotImplemented))
    };
    !(unsupported(model.jacobian(x)) || unsupported(obs_op.jacobian(x)))
}

/// Gradient of `J` at `eval.x` by the adjoint method.
///
/// # Errors
/// - [`OptError::JacobianUnavailable`] when a Jacobian is not implemented.
/// - [`OptError::Domain`] / [`OptError::ObservationDomain`] when a
///   Jacobian evaluation fails.
/// - [`OptError::JacobianShapeMismatch`] for wrongly shaped Jacobians.
pub fn adjoint_gradient<M, H>(
    model: &M, obs_op: &H, terms: &CostTerms<'_>, eval: &Evaluation,
) -> OptResult<Grad>
where
    M: ForwardModel,
    H: ObservationOperator,
{
    let trajectory = &eval.trajectory;
    let n = trajectory.n_steps();
    let dim = trajectory.state_dim();
    let obs_dim = terms.observations.obs_dim();
    let states = trajectory.states();

    let ri = terms.errors.inv_weight(ErrorKind::Observation)?;
    let qi = match terms.assumption {
        ModelAssumption::Perfect => None,
        ModelAssumption::Imperfect => Some(terms.errors.inv_weight(ErrorKind::Evolution)?),
    };
    let innovations = eval.innovations(terms.observations);

    let mut lambda: Array1<f64> = Array1::zeros(dim);
    for t in (0..=n).rev() {
        let mut local: Array1<f64> = Array1::zeros(dim);
        if t >= 1 {
            let h = obs_op.jacobian(states.row(t)).map_err(|source| match source {
                ModelError::JacobianNotImplemented => {
                    OptError::JacobianUnavailable { operator: OBSERVATION }
                }
                source => OptError::ObservationDomain { state: t, source },
            })?;
            check_shape(&h, (obs_dim, dim), OBSERVATION)?;
            let weighted = ri.apply(innovations.row(t - 1));
            local.scaled_add(-2.0, &h.t().dot(&weighted));
        }
        if let Some(qi) = qi {
            if t >= 1 {
                let r_prev = &states.row(t) - &states.row(t - 1);
                local.scaled_add(2.0, &qi.apply(r_prev.view()));
            }
            if t < n {
                let r_next = &states.row(t + 1) - &states.row(t);
                local.scaled_add(-2.0, &qi.apply(r_next.view()));
            }
        }
        lambda = if t < n {
            let m = model.jacobian(states.row(t)).map_err(|source| match source {
                ModelError::JacobianNotImplemented => {
                    OptError::JacobianUnavailable { operator: FORWARD }
                }
                source => OptError::Domain { step: t, source },
            })?;
            check_shape(&m, (dim, dim), FORWARD)?;
            m.t().dot(&lambda) + local
        } else {
            local
        };
    }

    let bi = terms.errors.inv_weight(ErrorKind::Background)?;
    let departure = &eval.x - &terms.background;
    lambda.scaled_add(2.0, &bi.apply(departure.view()));
    Ok(lambda)
}

fn check_shape(
    jac: &Array2<f64>, expected: (usize, usize), operator: &'static str,
) -> OptResult<()> {
    if jac.dim() != expected {
        return Err(OptError::JacobianShapeMismatch { operator, expected, found: jac.dim() });
    }
    Ok(())
}
