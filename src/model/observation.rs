//! Component-selecting observation operator.
//!
//! [`CompartmentObservation`] projects a state onto a single component,
//! e.g. the deceased compartment when calibrating against cumulative
//! deaths. Its Jacobian is the constant unit row `e_index`.
use crate::model::{
    errors::{ModelError, ModelResult},
    seird::{IDX_D, STATE_DIM},
    traits::ObservationOperator,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, array};

/// Observes one component of the state vector as a length-1 observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompartmentObservation {
    pub index: usize,
    pub state_dim: usize,
}

impl CompartmentObservation {
    pub fn new(index: usize, state_dim: usize) -> ModelResult<Self> {
        if index >= state_dim {
            return Err(ModelError::ComponentOutOfRange { index, dim: state_dim });
        }
        Ok(Self { index, state_dim })
    }

    /// Cumulative deaths in a SEIRD state.
    pub fn deceased() -> Self {
        Self { index: IDX_D, state_dim: STATE_DIM }
    }

    fn check_len(&self, len: usize) -> ModelResult<()> {
        if len != self.state_dim {
            return Err(ModelError::StateLengthMismatch { expected: self.state_dim, actual: len });
        }
        Ok(())
    }
}

impl ObservationOperator for CompartmentObservation {
    fn observe(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>> {
        self.check_len(state.len())?;
        Ok(array![state[self.index]])
    }

    fn observe_states(&self, states: ArrayView2<'_, f64>) -> ModelResult<Array2<f64>> {
        self.check_len(states.ncols())?;
        let column = states.column(self.index).to_owned();
        Ok(column.insert_axis(ndarray::Axis(1)))
    }

    fn jacobian(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array2<f64>> {
        self.check_len(state.len())?;
        let mut jac = Array2::zeros((1, self.state_dim));
        jac[[0, self.index]] = 1.0;
        Ok(jac)
    }
}
