//! minimizer::observer — per-iteration recording through argmin's observer hook.
//!
//! [`IterationRecorder`] is attached to the executor with
//! `ObserverMode::Always`. It copies the accepted state, its cost, and the
//! gradient norm into shared storage the caller reads back after the run.
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::types::{Cost, MinState, Theta},
};
use argmin::core::{Error, KV, State, observers::Observe};
use argmin_math::ArgminL2Norm;
use std::sync::{Arc, Mutex};

/// Snapshot of one accepted minimizer iterate.
///
/// Iteration `0` is the initial state after solver initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: u64,
    pub state: Theta,
    pub cost: Cost,
    pub grad_norm: Option<f64>,
}

/// Observer that appends an [`IterationRecord`] on init and every iteration.
///
/// Cloning shares the underlying storage, so one clone goes to the executor
/// and the other stays with the caller.
#[derive(Debug, Clone, Default)]
pub struct IterationRecorder {
    records: Arc<Mutex<Vec<IterationRecord>>>,
}

impl IterationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded iterates.
    ///
    /// # Errors
    /// [`OptError::ObserverPoisoned`] if a panic poisoned the lock.
    pub fn take(&self) -> OptResult<Vec<IterationRecord>> {
        let mut guard = self.records.lock().map_err(|_| OptError::ObserverPoisoned)?;
        Ok(std::mem::take(&mut *guard))
    }

    fn record(&self, state: &MinState) -> Result<(), Error> {
        // Solvers may report an iteration before any parameter is set.
        let Some(param) = state.get_param() else {
            return Ok(());
        };
        let record = IterationRecord {
            iteration: state.get_iter(),
            state: param.clone(),
            cost: state.get_cost(),
            grad_norm: state.get_gradient().map(|g| g.l2_norm()),
        };
        let mut guard = self.records.lock().map_err(|_| OptError::ObserverPoisoned)?;
        guard.push(record);
        Ok(())
    }
}

impl Observe<MinState> for IterationRecorder {
    fn observe_init(&mut self, _name: &str, state: &MinState, _kv: &KV) -> Result<(), Error> {
        self.record(state)
    }

    fn observe_iter(&mut self, state: &MinState, _kv: &KV) -> Result<(), Error> {
        self.record(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Records written through one clone are visible through another, and
    // states without parameters are skipped.
    //
    // Given
    // -----
    // - An empty state and a state holding x = (3, 4), cost 2, ∇ = (0, 1).
    //
    // Expect
    // ------
    // - Exactly one record with grad_norm 1; a second take is empty.
    fn recorder_shares_storage_between_clones() {
        // Arrange
        let recorder = IterationRecorder::new();
        let mut handle = recorder.clone();
        let empty = MinState::new();
        let filled = MinState::new().param(array![3.0, 4.0]).cost(2.0).gradient(array![0.0, 1.0]);

        // Act
        handle.observe_init("L-BFGS", &empty, &KV::new()).unwrap();
        handle.observe_iter(&filled, &KV::new()).unwrap();
        let records = recorder.take().unwrap();

        // Assert
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, array![3.0, 4.0]);
        assert_eq!(records[0].cost, 2.0);
        assert_eq!(records[0].grad_norm, Some(1.0));
        assert!(recorder.take().unwrap().is_empty());
    }
}
