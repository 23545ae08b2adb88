//! Engine-owned invocation counters.
//!
//! Models stay free of mutable state; the engine wraps them in
//! [`Counted`] for the lifetime of one calibration and reads the totals
//! back into [`EvalCounts`].
use crate::model::{
    errors::ModelResult,
    traits::{ForwardModel, ObservationOperator},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::cell::Cell;

/// Evaluation totals reported in a calibration outcome.
///
/// - `forward_calls`: forward-model steps evaluated.
/// - `observation_calls`: states passed through the observation operator.
/// - `cost_evals`: cost evaluations requested by the minimizer.
/// - `gradient_evals`: gradient evaluations requested by the minimizer.
///
/// Jacobian evaluations are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalCounts {
    pub forward_calls: u64,
    pub observation_calls: u64,
    pub cost_evals: u64,
    pub gradient_evals: u64,
}

/// Counting decorator around a model function.
#[derive(Debug, Default)]
pub struct Counted<T> {
    inner: T,
    calls: Cell<u64>,
}

impl<T> Counted<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, calls: Cell::new(0) }
    }

    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn bump(&self, n: u64) {
        self.calls.set(self.calls.get() + n);
    }
}

impl<T: ForwardModel> ForwardModel for Counted<T> {
    fn step(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>> {
        self.bump(1);
        self.inner.step(state)
    }

    fn jacobian(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array2<f64>> {
        self.inner.jacobian(state)
    }
}

impl<T: ObservationOperator> ObservationOperator for Counted<T> {
    fn observe(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>> {
        self.bump(1);
        self.inner.observe(state)
    }

    fn observe_states(&self, states: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        self.bump(states.nrows() as u64);
        self.inner.observe_states(states)
    }

    fn jacobian(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array2<f64>> {
        self.inner.jacobian(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assimilation::trajectory::{observe_trajectory, rollout},
        model::{CompartmentObservation, SeirdModel},
    };
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Counters see one call per step and one per observed state, and the
    // wrapped model itself is unchanged.
    //
    // Given
    // -----
    // - A 7-step SEIRD rollout observed through the deceased compartment.
    //
    // Expect
    // ------
    // - 7 forward calls and 7 observation calls.
    fn counters_track_steps_and_observed_states() {
        // Arrange
        let model = Counted::new(SeirdModel::new());
        let obs_op = Counted::new(CompartmentObservation::deceased());
        let x0 = array![1000.0, 10.0, 10.0, 0.0, 0.0, 0.01, 0.4, 0.2, 0.1];

        // Act
        let traj = rollout(&model, x0.view(), 7).unwrap();
        observe_trajectory(&obs_op, &traj, 1).unwrap();

        // Assert
        assert_eq!(model.calls(), 7);
        assert_eq!(obs_op.calls(), 7);
        assert!(model.jacobian(x0.view()).is_ok());
        assert_eq!(model.calls(), 7);
    }
}
