//! Observation series compared against a model trajectory.
use crate::optimization::errors::{OptError, OptResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Observed values, one row per forward step.
///
/// Row `t` is compared with the trajectory state reached after `t + 1`
/// steps; the initial state is never observed. Construction guarantees at
/// least one row, at least one column, and finite entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    values: Array2<f64>,
}

impl ObservationSeries {
    /// Wrap an `n_steps × obs_dim` matrix.
    ///
    /// # Errors
    /// - [`OptError::EmptyObservations`] for zero rows or columns.
    /// - [`OptError::NonFiniteObservation`] for the first NaN/±∞ entry.
    pub fn new(values: Array2<f64>) -> OptResult<Self> {
        if values.nrows() == 0 || values.ncols() == 0 {
            return Err(OptError::EmptyObservations);
        }
        if let Some(((step, component), &value)) =
            values.indexed_iter().find(|(_, v)| !v.is_finite())
        {
            return Err(OptError::NonFiniteObservation { step, component, value });
        }
        Ok(Self { values })
    }

    /// Scalar series (e.g. cumulative deaths) as a one-column series.
    pub fn from_scalars(values: Array1<f64>) -> OptResult<Self> {
        Self::new(values.insert_axis(Axis(1)))
    }

    /// Number of forward steps the series covers.
    pub fn n_steps(&self) -> usize {
        self.values.nrows()
    }

    pub fn obs_dim(&self) -> usize {
        self.values.ncols()
    }

    pub fn row(&self, step: usize) -> ArrayView1<'_, f64> {
        self.values.row(step)
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.values
    }
}
