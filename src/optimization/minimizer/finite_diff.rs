//! minimizer::finite_diff — finite-difference gradients with error capture.
//!
//! Purpose
//! -------
//! Approximate `∇J(x)` numerically for objectives that provide no analytic
//! gradient, while keeping the `finitediff` API and its infallible closure
//! signature out of the rest of the crate.
//!
//! Key behaviors
//! -------------
//! - [`fd_gradient`] evaluates a fallible cost closure with the requested
//!   [`FdScheme`], capturing the first error raised by any perturbed
//!   evaluation and returning it instead of a gradient.
//! - The resulting gradient is checked with [`validate_grad`] before being
//!   handed back.
//!
//! Invariants & assumptions
//! ------------------------
//! - There is no silent fallback from central to forward differences: a
//!   failed evaluation is an error for the whole gradient.
//! - The step size is `finitediff`'s absolute `sqrt(EPSILON)`, so `theta`
//!   must be roughly unit-scaled. The assimilation layer differences its
//!   background-relative controls, never raw populations.
//!
//! Testing notes
//! -------------
//! - Unit tests compare against analytic gradients of a quadratic and
//!   confirm that closure errors surface unchanged.
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{
        traits::FdScheme,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Finite-difference gradient of `func` at `theta`.
///
/// The `finitediff` closures must return `f64`, so an error from `func` is
/// stored in a local slot and the closure returns `NaN`. After
/// differencing, a captured error is returned as-is.
///
/// # Errors
/// - Any `OptError` raised by `func` during a perturbed evaluation.
/// - [`OptError::GradientDimMismatch`] / [`OptError::InvalidGradient`] from
///   [`validate_grad`].
pub fn fd_gradient<G>(theta: &Theta, func: G, scheme: FdScheme) -> OptResult<Grad>
where
    G: Fn(&Theta) -> OptResult<Cost>,
{
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let cost_func = |x: &Theta| -> f64 {
        match func(x) {
            Ok(val) => val,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };

    let fd_grad = match scheme {
        FdScheme::Central => theta.central_diff(&cost_func),
        FdScheme::Forward => theta.forward_diff(&cost_func),
    };
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}
