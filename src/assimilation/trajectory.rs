//! assimilation::trajectory — forward rollout and trajectory observation.
//!
//! Purpose
//! -------
//! Produce the sequence of model states implied by a candidate control
//! vector and map it to observation space.
//!
//! Key behaviors
//! -------------
//! - [`rollout`] applies the forward model `n_steps` times and keeps every
//!   state, the initial one included.
//! - [`observe_trajectory`] applies the observation operator to every
//!   state after the initial one, trajectory-in, matrix-out.
//! - [`synthesize_observations`] builds a noise-free series from a known
//!   state, for twin experiments and tests.
//!
//! Invariants & assumptions
//! ------------------------
//! - A trajectory over `n` steps has exactly `n + 1` rows; row 0 is `x0`.
//! - Model failures carry the 0-based index of the step whose *input* was
//!   invalid; nothing is truncated or clamped.
use crate::{
    assimilation::series::ObservationSeries,
    model::{
        errors::ModelError,
        traits::{ForwardModel, ObservationOperator},
    },
    optimization::errors::{OptError, OptResult},
};
use ndarray::{Array2, ArrayView1, ArrayView2, s};

/// `(n_steps + 1) × N` matrix of model states.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    states: Array2<f64>,
}

impl Trajectory {
    pub fn states(&self) -> ArrayView2<'_, f64> {
        self.states.view()
    }

    /// States after the initial one, i.e. those paired with observations.
    pub fn observed_states(&self) -> ArrayView2<'_, f64> {
        self.states.slice(s![1.., ..])
    }

    pub fn state(&self, t: usize) -> ArrayView1<'_, f64> {
        self.states.row(t)
    }

    pub fn initial(&self) -> ArrayView1<'_, f64> {
        self.states.row(0)
    }

    pub fn n_states(&self) -> usize {
        self.states.nrows()
    }

    pub fn n_steps(&self) -> usize {
        self.states.nrows() - 1
    }

    pub fn state_dim(&self) -> usize {
        self.states.ncols()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.states
    }
}

/// Apply `model` to `x0` `n_steps` times.
///
/// # Errors
/// - [`OptError::Domain`] with the failing step when the model rejects its
///   input or produces a non-finite component.
/// - [`OptError::StateDimMismatch`] when a step changes the state length.
pub fn rollout<M: ForwardModel>(
    model: &M, x0: ArrayView1<'_, f64>, n_steps: usize,
) -> OptResult<Trajectory> {
    let dim = x0.len();
    let mut states = Array2::zeros((n_steps + 1, dim));
    states.row_mut(0).assign(&x0);
    for step in 0..n_steps {
        let next = model
            .step(states.row(step))
            .map_err(|source| OptError::Domain { step, source })?;
        if next.len() != dim {
            return Err(OptError::StateDimMismatch { step, expected: dim, found: next.len() });
        }
        if let Some((index, &value)) = next.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(OptError::Domain {
                step,
                source: ModelError::NonFiniteOutput { index, value },
            });
        }
        states.row_mut(step + 1).assign(&next);
    }
    Ok(Trajectory { states })
}

/// Observe every state after the initial one.
///
/// Returns an `n_steps × obs_dim` matrix whose row `t` is `H(x_{t+1})`.
///
/// # Errors
/// - [`OptError::ObservationDomain`] with the trajectory index of the first
///   state the operator rejects.
/// - [`OptError::ObservationDimMismatch`] when the output width differs
///   from `obs_dim`.
pub fn observe_trajectory<H: ObservationOperator>(
    obs_op: &H, trajectory: &Trajectory, obs_dim: usize,
) -> OptResult<Array2<f64>> {
    let observed = trajectory.observed_states();
    let predicted = obs_op.observe_states(observed).map_err(|source| {
        // Locate the offending state on the error path only.
        let offset = observed.rows().into_iter().position(|row| obs_op.observe(row).is_err());
        OptError::ObservationDomain { state: offset.map_or(1, |i| i + 1), source }
    })?;
    if predicted.nrows() != observed.nrows() || predicted.ncols() != obs_dim {
        return Err(OptError::ObservationDimMismatch { expected: obs_dim, found: predicted.ncols() });
    }
    Ok(predicted)
}

/// Noise-free observations of the trajectory started at `x0`.
///
/// # Errors
/// Propagates rollout and observation errors; returns
/// [`OptError::EmptyObservations`] when `n_steps == 0`.
pub fn synthesize_observations<M, H>(
    model: &M, obs_op: &H, x0: ArrayView1<'_, f64>, n_steps: usize,
) -> OptResult<ObservationSeries>
where
    M: ForwardModel,
    H: ObservationOperator,
{
    let trajectory = rollout(model, x0, n_steps)?;
    let values = obs_op.observe_states(trajectory.observed_states()).map_err(|source| {
        OptError::ObservationDomain { state: 1, source }
    })?;
    ObservationSeries::new(values)
}
