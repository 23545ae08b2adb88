//! Model-function interfaces consumed by the assimilation engine.
//!
//! - [`ForwardModel`]: advances a state vector by one time step.
//! - [`ObservationOperator`]: maps a state to the observable space.
//!
//! Both traits are pure: implementations must not keep per-call mutable
//! state. The engine wraps them in counting decorators when it needs
//! invocation diagnostics.
//!
//! Shape convention: the engine calls observation operators
//! **trajectory-in, matrix-out**. [`ObservationOperator::observe_states`]
//! receives an `n_states × N` matrix (one state per row, time-ordered) and
//! returns an `n_states × obs_dim` matrix with rows in the same order. A
//! scalar observation is a one-column matrix, never a flat vector.
use crate::model::errors::{ModelError, ModelResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// One-step evolution operator `x_{t+1} = M(x_t)`.
///
/// Required:
/// - `step`: evaluate `M` at `state`. Invalid inputs are reported as
///   [`ModelError`], never as NaN outputs.
///
/// Optional:
/// - `jacobian`: tangent-linear operator `∂M/∂x` at `state` as an `N × N`
///   matrix (row = output component, column = input component). When absent
///   the engine differentiates the cost numerically.
pub trait ForwardModel {
    fn step(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>>;

    fn jacobian(&self, _state: ArrayView1<'_, f64>) -> ModelResult<Array2<f64>> {
        Err(ModelError::JacobianNotImplemented)
    }
}

/// Observation operator `y = H(x)`.
///
/// Required:
/// - `observe`: map one state to an `obs_dim` vector.
///
/// Optional:
/// - `observe_states`: stacked version over a trajectory; the default maps
///   `observe` over the rows.
/// - `jacobian`: `∂H/∂x` at `state` as an `obs_dim × N` matrix.
pub trait ObservationOperator {
    fn observe(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>>;

    fn observe_states(&self, states: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        let mut rows: Vec<Array1<f64>> = Vec::with_capacity(states.nrows());
        for state in states.rows() {
            rows.push(self.observe(state)?);
        }
        let obs_dim = rows.first().map_or(0, |r| r.len());
        let mut out = Array2::zeros((rows.len(), obs_dim));
        for (t, row) in rows.iter().enumerate() {
            if row.len() != obs_dim {
                return Err(ModelError::StateLengthMismatch { expected: obs_dim, actual: row.len() });
            }
            out.row_mut(t).assign(row);
        }
        Ok(out)
    }

    fn jacobian(&self, _state: ArrayView1<'_, f64>) -> ModelResult<Array2<f64>> {
        Err(ModelError::JacobianNotImplemented)
    }
}

impl<T: ForwardModel + ?Sized> ForwardModel for &T {
    fn step(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>> {
        (**self).step(state)
    }

    fn jacobian(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array2<f64>> {
        (**self).jacobian(state)
    }
}

impl<T: ObservationOperator + ?Sized> ObservationOperator for &T {
    fn observe(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>> {
        (**self).observe(state)
    }

    fn observe_states(&self, states: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        (**self).observe_states(states)
    }

    fn jacobian(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array2<f64>> {
        (**self).jacobian(state)
    }
}
