//! assimilation::control — mapping between model states and control variables.
//!
//! Purpose
//! -------
//! SEIRD control vectors mix compartments near `4e7` with rates near `0.1`.
//! L-BFGS and finite differences both assume unit-sized variables, so the
//! minimizer works on a control vector `u` instead of the state `x`:
//!
//! `x = offset + scale ⊙ u`
//!
//! Key behaviors
//! -------------
//! - [`ControlTransform::relative_to`] measures every component relative to
//!   the background, `x = xb ⊙ (1 + u)`, so `u = 0` is the background and a
//!   unit step changes each component by its own magnitude.
//! - [`ControlTransform::identity`] leaves `x` untouched.
//! - Gradients map with the chain rule, `∇ᵤJ = scale ⊙ ∇ₓJ`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every scale entry is finite and strictly positive; zero background
//!   components fall back to an absolute scale of 1.
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{Grad, Theta},
};
use ndarray::Array1;

/// Affine map `x = offset + scale ⊙ u`.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlTransform {
    offset: Theta,
    scale: Theta,
}

impl ControlTransform {
    pub fn identity(dim: usize) -> Self {
        Self { offset: Array1::zeros(dim), scale: Array1::ones(dim) }
    }

    /// Controls relative to `xb`: `x = xb + |xb| ⊙ u`.
    pub fn relative_to(xb: &Theta) -> Self {
        let scale = xb.mapv(|v| if v != 0.0 && v.is_finite() { v.abs() } else { 1.0 });
        Self { offset: xb.clone(), scale }
    }

    pub fn dim(&self) -> usize {
        self.offset.len()
    }

    pub fn scale(&self) -> &Theta {
        &self.scale
    }

    /// The control vector that maps onto `offset`.
    pub fn origin(&self) -> Theta {
        Array1::zeros(self.dim())
    }

    pub fn to_state(&self, u: &Theta) -> Theta {
        &self.offset + &(&self.scale * u)
    }

    pub fn to_control(&self, x: &Theta) -> Theta {
        (x - &self.offset) / &self.scale
    }

    /// Chain rule for a state-space gradient.
    ///
    /// # Errors
    /// [`OptError::GradientDimMismatch`] when `g` has the wrong length.
    pub fn gradient_to_control(&self, g: &Grad) -> OptResult<Grad> {
        if g.len() != self.dim() {
            return Err(OptError::GradientDimMismatch { expected: self.dim(), found: g.len() });
        }
        Ok(&self.scale * g)
    }
}
