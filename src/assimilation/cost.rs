//! assimilation::cost — 4D-Var cost assembly.
//!
//! Purpose
//! -------
//! Evaluate
//!
//! ```text
//! J(x) = (x − xb)ᵀ Bi (x − xb)
//!      + Σₜ (yₜ − H(x_{t+1}))ᵀ Ri (yₜ − H(x_{t+1}))
//!      [+ Σₜ (x_{t+1} − xₜ)ᵀ Qi (x_{t+1} − xₜ)]
//! ```
//!
//! for a candidate control vector, keeping the trajectory and predictions
//! so the gradient at the same point can reuse them.
//!
//! Conventions
//! -----------
//! - There is no `½` factor on any term.
//! - The evolution term `Jq` is only assembled under
//!   [`ModelAssumption::Imperfect`]; otherwise it is reported as `0`.
use crate::{
    assimilation::{
        covariance::{ErrorKind, PreparedErrors},
        options::ModelAssumption,
        series::ObservationSeries,
        trajectory::{Trajectory, observe_trajectory, rollout},
    },
    model::traits::{ForwardModel, ObservationOperator},
    optimization::{
        errors::OptResult,
        minimizer::types::{Cost, Theta},
    },
};
use ndarray::{Array1, Array2, ArrayView1};

/// Background (`jb`), observation (`jo`), and evolution (`jq`) terms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostBreakdown {
    pub jb: f64,
    pub jo: f64,
    pub jq: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> Cost {
        self.jb + self.jo + self.jq
    }
}

/// Everything computed for one control vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub x: Theta,
    pub trajectory: Trajectory,
    /// `n_steps × obs_dim`; row `t` is `H(x_{t+1})`.
    pub predicted: Array2<f64>,
    pub breakdown: CostBreakdown,
}

impl Evaluation {
    /// Observation innovations `yₜ − H(x_{t+1})`, one row per step.
    pub fn innovations(&self, observations: &ObservationSeries) -> Array2<f64> {
        &observations.values() - &self.predicted
    }
}

/// Fixed inputs of the cost: background, observations, prepared errors,
/// and the model assumption.
#[derive(Debug, Clone, Copy)]
pub struct CostTerms<'a> {
    pub background: ArrayView1<'a, f64>,
    pub observations: &'a ObservationSeries,
    pub errors: &'a PreparedErrors,
    pub assumption: ModelAssumption,
}

impl<'a> CostTerms<'a> {
    /// Roll out `x`, observe the trajectory, and assemble `J`.
    ///
    /// # Errors
    /// Propagates rollout and observation errors.
    pub fn evaluate<M, H>(&self, model: &M, obs_op: &H, x: &Theta) -> OptResult<Evaluation>
    where
        M: ForwardModel,
        H: ObservationOperator,
    {
        let trajectory = rollout(model, x.view(), self.observations.n_steps())?;
        let predicted = observe_trajectory(obs_op, &trajectory, self.observations.obs_dim())?;
        let breakdown = self.breakdown(x, &trajectory, &predicted)?;
        Ok(Evaluation { x: x.clone(), trajectory, predicted, breakdown })
    }

    /// Assemble the cost terms from an existing trajectory and predictions.
    pub fn breakdown(
        &self, x: &Theta, trajectory: &Trajectory, predicted: &Array2<f64>,
    ) -> OptResult<CostBreakdown> {
        let jb = self.background_term(x)?;

        let ri = self.errors.inv_weight(ErrorKind::Observation)?;
        let innovations = &self.observations.values() - predicted;
        let jo: f64 = innovations.rows().into_iter().map(|d| ri.quadratic(d)).sum();

        let jq: f64 = match self.assumption {
            ModelAssumption::Perfect => 0.0,
            ModelAssumption::Imperfect => {
                let qi = self.errors.inv_weight(ErrorKind::Evolution)?;
                let states = trajectory.states();
                (0..trajectory.n_steps())
                    .map(|t| {
                        let r: Array1<f64> = &states.row(t + 1) - &states.row(t);
                        qi.quadratic(r.view())
                    })
                    .sum()
            }
        };
        Ok(CostBreakdown { jb, jo, jq })
    }

    /// `(x − xb)ᵀ Bi (x − xb)`.
    pub fn background_term(&self, x: &Theta) -> OptResult<f64> {
        let bi = self.errors.inv_weight(ErrorKind::Background)?;
        Ok(bi.quadratic((x - &self.background).view()))
    }
}
