//! Residual inspection of a state against an observation series.
//!
//! Re-runs the forward model from a given state (typically an analysis)
//! and compares the predicted observables with the observed ones step by
//! step.
use crate::{
    assimilation::{
        series::ObservationSeries,
        trajectory::{observe_trajectory, rollout},
    },
    model::traits::{ForwardModel, ObservationOperator},
    optimization::errors::OptResult,
};
use ndarray::{Array2, ArrayView1};

/// Predicted vs observed values, one row per forward step.
///
/// `residual = predicted − observed`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualReport {
    pub predicted: Array2<f64>,
    pub observed: Array2<f64>,
    pub residual: Array2<f64>,
    /// `Σ |residual|` over all steps and components.
    pub cumulative_abs_error: f64,
}

impl ResidualReport {
    pub fn n_steps(&self) -> usize {
        self.residual.nrows()
    }

    /// `(step, predicted, observed, residual)` rows.
    pub fn rows(
        &self,
    ) -> impl Iterator<Item = (usize, ArrayView1<'_, f64>, ArrayView1<'_, f64>, ArrayView1<'_, f64>)>
    {
        (0..self.n_steps()).map(move |t| {
            (t, self.predicted.row(t), self.observed.row(t), self.residual.row(t))
        })
    }

    /// Largest absolute residual over all steps and components.
    pub fn max_abs_error(&self) -> f64 {
        self.residual.iter().fold(0.0, |m, r| m.max(r.abs()))
    }
}

/// Roll `x` forward over the series length and compare with `observations`.
///
/// # Errors
/// Propagates rollout and observation errors.
pub fn inspect_residuals<M, H>(
    model: &M, obs_op: &H, x: ArrayView1<'_, f64>, observations: &ObservationSeries,
) -> OptResult<ResidualReport>
where
    M: ForwardModel,
    H: ObservationOperator,
{
    let trajectory = rollout(model, x, observations.n_steps())?;
    let predicted = observe_trajectory(obs_op, &trajectory, observations.obs_dim())?;
    let observed = observations.values().to_owned();
    let residual = &predicted - &observed;
    let cumulative_abs_error = residual.iter().map(|r| r.abs()).sum();
    Ok(ResidualReport { predicted, observed, residual, cumulative_abs_error })
}
