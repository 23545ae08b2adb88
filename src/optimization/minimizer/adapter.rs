//! Adapter that exposes an [`Objective`] as an `argmin` problem.
//!
//! The objective is already a cost to minimize, so values and gradients pass
//! through unchanged. If the objective provides no gradient, the adapter
//! finite-differences the cost closure with the configured scheme.
//!
//! argmin's L-BFGS turns an error raised inside its line search into a
//! textual `SolverExit`. The adapter therefore keeps the first typed error in
//! a slot owned by the caller, so the runner can return it unchanged.
use crate::optimization::{
    errors::OptError,
    minimizer::{
        finite_diff::fd_gradient,
        traits::{FdScheme, Objective},
        types::{Cost, Grad, Theta},
        validation::{validate_grad, validate_value},
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use std::cell::RefCell;

/// Bridges an [`Objective`] to `argmin`'s `CostFunction` and `Gradient`.
///
/// - `CostFunction::cost` returns `J(x)` after a finiteness check.
/// - `Gradient::gradient` returns the objective's gradient, or a
///   finite-difference gradient of `J` when the objective reports
///   [`OptError::GradientNotImplemented`].
/// - The first error from either method is also stored in `failure`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: Objective> {
    pub f: &'a F,
    pub fd_scheme: FdScheme,
    failure: &'a RefCell<Option<OptError>>,
}

impl<'a, F: Objective> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, fd_scheme: FdScheme, failure: &'a RefCell<Option<OptError>>) -> Self {
        Self { f, fd_scheme, failure }
    }

    /// Slot holding the first error raised by the objective, if any.
    pub fn failure(&self) -> &'a RefCell<Option<OptError>> {
        self.failure
    }

    fn record(&self, err: OptError) -> Error {
        let mut slot = self.failure.borrow_mut();
        if slot.is_none() {
            *slot = Some(err.clone());
        }
        err.into()
    }

    fn checked_cost(&self, x: &Theta) -> Result<Cost, OptError> {
        let output = self.f.value(x)?;
        validate_value(output)?;
        Ok(output)
    }

    fn checked_gradient(&self, x: &Theta) -> Result<Grad, OptError> {
        match self.f.grad(x) {
            Ok(g) => {
                validate_grad(&g, x.len())?;
                Ok(g)
            }
            Err(OptError::GradientNotImplemented) => {
                fd_gradient(x, |p: &Theta| self.checked_cost(p), self.fd_scheme)
            }
            Err(e) => Err(e),
        }
    }
}

impl<'a, F: Objective> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate `J(x)`.
    ///
    /// # Errors
    /// Propagates any `OptError` from the objective; returns
    /// `NonFiniteCost` if the value is NaN or infinite.
    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        self.checked_cost(x).map_err(|e| self.record(e))
    }
}

impl<'a, F: Objective> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate `∇J(x)`.
    ///
    /// # Errors
    /// - Propagates objective errors other than `GradientNotImplemented`.
    /// - Propagates the first error raised by a finite-difference evaluation.
    /// - Returns validation errors for wrong length or non-finite entries.
    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        self.checked_gradient(x).map_err(|e| self.record(e))
    }
}
