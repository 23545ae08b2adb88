//! Closure adapters for user-supplied model functions.
//!
//! Callers that only have plain functions (no Jacobians) wrap them in
//! [`FnForwardModel`] / [`FnObservation`]. Gradients for such models are
//! computed by finite differences.
use crate::model::{
    errors::ModelResult,
    traits::{ForwardModel, ObservationOperator},
};
use ndarray::{Array1, ArrayView1};

/// Forward model backed by `Fn(ArrayView1<f64>) -> ModelResult<Array1<f64>>`.
pub struct FnForwardModel<F> {
    f: F,
}

impl<F> FnForwardModel<F>
where
    F: Fn(ArrayView1<'_, f64>) -> ModelResult<Array1<f64>>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ForwardModel for FnForwardModel<F>
where
    F: Fn(ArrayView1<'_, f64>) -> ModelResult<Array1<f64>>,
{
    fn step(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>> {
        (self.f)(state)
    }
}

/// Observation operator backed by `Fn(ArrayView1<f64>) -> ModelResult<Array1<f64>>`.
pub struct FnObservation<F> {
    f: F,
}

impl<F> FnObservation<F>
where
    F: Fn(ArrayView1<'_, f64>) -> ModelResult<Array1<f64>>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ObservationOperator for FnObservation<F>
where
    F: Fn(ArrayView1<'_, f64>) -> ModelResult<Array1<f64>>,
{
    fn observe(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>> {
        (self.f)(state)
    }
}
