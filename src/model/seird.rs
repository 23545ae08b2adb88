//! seird — discrete-time SEIRD compartmental model with pass-through rates.
//!
//! Purpose
//! -------
//! Provide the forward model used for epidemic calibration: one explicit
//! daily step of a Susceptible–Exposed–Infected–Recovered–Deceased system
//! whose transition rates travel inside the state vector, so that the
//! variational engine can estimate compartments and rates jointly.
//!
//! Key behaviors
//! -------------
//! - [`SeirdModel::step`] applies
//!   `S' = S − f`, `E' = E + f − εE`, `I' = I + εE − (α + γ)I`,
//!   `R' = R + γI`, `D' = D + αI` with `f = βSI/N`, `N = S + E + I + R`,
//!   and copies the four rates unchanged.
//! - [`SeirdModel::jacobian`] returns the exact tangent-linear operator of
//!   that step for adjoint gradients.
//! - [`SeirdState`] gives named access to the 9-component layout.
//!
//! Invariants & assumptions
//! ------------------------
//! - State layout is `[S, E, I, R, D, α, β, ε, γ]` (see the `IDX_*`
//!   constants); [`STATE_DIM`] is 9 for every call.
//! - `N = 0` makes the force of infection undefined and is reported as
//!   [`ModelError::ZeroPopulation`] instead of propagating NaN.
//! - Non-finite inputs are rejected before any arithmetic.
//!
//! Conventions
//! -----------
//! - Time step is one day; rates are per-day probabilities.
//! - The deceased compartment is not part of `N`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover conservation of `S + E + I + R + D`, rate
//!   pass-through, the zero-population domain error, and the Jacobian
//!   against central differences.
use crate::model::{
    errors::{ModelError, ModelResult},
    traits::ForwardModel,
};
use ndarray::{Array1, Array2, ArrayView1};

/// Number of components in a SEIRD state vector.
pub const STATE_DIM: usize = 9;
/// Number of dynamical compartments at the head of the state vector.
pub const N_COMPARTMENTS: usize = 5;

pub const IDX_S: usize = 0;
pub const IDX_E: usize = 1;
pub const IDX_I: usize = 2;
pub const IDX_R: usize = 3;
pub const IDX_D: usize = 4;
pub const IDX_ALPHA: usize = 5;
pub const IDX_BETA: usize = 6;
pub const IDX_EPS: usize = 7;
pub const IDX_GAMMA: usize = 8;

/// SEIRD forward model. Stateless; all inputs live in the state vector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeirdModel;

impl SeirdModel {
    pub fn new() -> Self {
        SeirdModel
    }
}

/// Named view over a 9-component SEIRD state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeirdState {
    pub susceptible: f64,
    pub exposed: f64,
    pub infected: f64,
    pub recovered: f64,
    pub deceased: f64,
    /// Death rate α.
    pub alpha: f64,
    /// Transmission rate β.
    pub beta: f64,
    /// Incubation rate ε.
    pub eps: f64,
    /// Recovery rate γ.
    pub gamma: f64,
}

impl SeirdState {
    /// Parse and validate a raw state vector.
    ///
    /// # Errors
    /// - [`ModelError::StateLengthMismatch`] if `state.len() != STATE_DIM`.
    /// - [`ModelError::NonFiniteState`] for the first NaN/±∞ component.
    pub fn from_view(state: ArrayView1<'_, f64>) -> ModelResult<Self> {
        if state.len() != STATE_DIM {
            return Err(ModelError::StateLengthMismatch {
                expected: STATE_DIM,
                actual: state.len(),
            });
        }
        for (index, &value) in state.iter().enumerate() {
            if !value.is_finite() {
                return Err(ModelError::NonFiniteState { index, value });
            }
        }
        Ok(SeirdState {
            susceptible: state[IDX_S],
            exposed: state[IDX_E],
            infected: state[IDX_I],
            recovered: state[IDX_R],
            deceased: state[IDX_D],
            alpha: state[IDX_ALPHA],
            beta: state[IDX_BETA],
            eps: state[IDX_EPS],
            gamma: state[IDX_GAMMA],
        })
    }

    /// Living population `N = S + E + I + R`.
    pub fn population(&self) -> f64 {
        self.susceptible + self.exposed + self.infected + self.recovered
    }

    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(vec![
            self.susceptible,
            self.exposed,
            self.infected,
            self.recovered,
            self.deceased,
            self.alpha,
            self.beta,
            self.eps,
            self.gamma,
        ])
    }

    fn checked_population(&self) -> ModelResult<f64> {
        let n = self.population();
        if n == 0.0 {
            return Err(ModelError::ZeroPopulation);
        }
        Ok(n)
    }
}

impl ForwardModel for SeirdModel {
    fn step(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array1<f64>> {
        let x = SeirdState::from_view(state)?;
        let n = x.checked_population()?;
        let infection = x.susceptible * x.beta * x.infected / n;

        let next = SeirdState {
            susceptible: x.susceptible - infection,
            exposed: x.exposed + infection - x.eps * x.exposed,
            infected: x.infected + x.eps * x.exposed - (x.alpha + x.gamma) * x.infected,
            recovered: x.recovered + x.gamma * x.infected,
            deceased: x.deceased + x.alpha * x.infected,
            ..x
        };
        Ok(next.to_array())
    }

    /// Exact tangent-linear operator of [`SeirdModel::step`].
    ///
    /// With `f = βSI/N` the partials of the force of infection are
    /// `f_S = βI(N − S)/N²`, `f_E = f_R = −βSI/N²`, `f_I = βS(N − I)/N²`,
    /// `f_β = SI/N`; every other entry follows from linear terms. Rate rows
    /// are identity rows.
    fn jacobian(&self, state: ArrayView1<'_, f64>) -> ModelResult<Array2<f64>> {
        let x = SeirdState::from_view(state)?;
        let n = x.checked_population()?;
        let n2 = n * n;
        let (s, e, i) = (x.susceptible, x.exposed, x.infected);

        let f_s = x.beta * i * (n - s) / n2;
        let f_e = -x.beta * s * i / n2;
        let f_i = x.beta * s * (n - i) / n2;
        let f_r = f_e;
        let f_beta = s * i / n;

        let mut jac = Array2::<f64>::eye(STATE_DIM);

        // S' = S − f
        jac[[IDX_S, IDX_S]] = 1.0 - f_s;
        jac[[IDX_S, IDX_E]] = -f_e;
        jac[[IDX_S, IDX_I]] = -f_i;
        jac[[IDX_S, IDX_R]] = -f_r;
        jac[[IDX_S, IDX_BETA]] = -f_beta;

        // E' = E + f − εE
        jac[[IDX_E, IDX_S]] = f_s;
        jac[[IDX_E, IDX_E]] = 1.0 + f_e - x.eps;
        jac[[IDX_E, IDX_I]] = f_i;
        jac[[IDX_E, IDX_R]] = f_r;
        jac[[IDX_E, IDX_BETA]] = f_beta;
        jac[[IDX_E, IDX_EPS]] = -e;

        // I' = I + εE − (α + γ)I
        jac[[IDX_I, IDX_E]] = x.eps;
        jac[[IDX_I, IDX_I]] = 1.0 - (x.alpha + x.gamma);
        jac[[IDX_I, IDX_ALPHA]] = -i;
        jac[[IDX_I, IDX_EPS]] = e;
        jac[[IDX_I, IDX_GAMMA]] = -i;

        // R' = R + γI
        jac[[IDX_R, IDX_I]] = x.gamma;
        jac[[IDX_R, IDX_GAMMA]] = i;

        // D' = D + αI
        jac[[IDX_D, IDX_I]] = x.alpha;
        jac[[IDX_D, IDX_ALPHA]] = i;

        Ok(jac)
    }
}
