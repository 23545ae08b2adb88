//! Configuration for [`crate::assimilation::calibrate`].
//!
//! - [`CalibrationOptions`]: tolerances, line search, L-BFGS memory,
//!   gradient method, model assumption, supplementary records, verbosity.
//! - [`GradientMethod`]: adjoint, finite differences, or automatic choice.
//! - [`ModelAssumption`]: strong-constraint or imperfect-model cost.
//! - [`StoredQuantity`]: per-iteration quantities kept in the outcome.
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{FdScheme, LineSearcher, MinimizerOptions, Tolerances},
};
use std::{collections::BTreeSet, str::FromStr};

/// How `∇J` is computed.
///
/// - `Auto`: adjoint when both model functions provide Jacobians, central
///   finite differences otherwise.
/// - `Adjoint`: backward sweep through the model and observation Jacobians;
///   fails with `JacobianUnavailable` if either is missing.
/// - `FiniteDifference(scheme)`: numerical gradient of the full cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GradientMethod {
    #[default]
    Auto,
    Adjoint,
    FiniteDifference(FdScheme),
}

/// Whether the model is assumed exact.
///
/// - `Perfect`: strong constraint; the evolution error is validated when
///   supplied but does not enter the cost.
/// - `Imperfect`: adds `Σ (x_{t+1} − x_t)ᵀ Qi (x_{t+1} − x_t)`; requires an
///   evolution error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelAssumption {
    #[default]
    Perfect,
    Imperfect,
}

/// Per-iteration quantities that can be kept in the outcome.
///
/// Parsing accepts the names `"CurrentState"`, `"CostFunctionJ"`,
/// `"CostFunctionJb"`, `"CostFunctionJo"`, `"GradientNorm"`,
/// `"IndexOfOptimum"` (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoredQuantity {
    CurrentState,
    CostFunctionJ,
    CostFunctionJb,
    CostFunctionJo,
    GradientNorm,
    IndexOfOptimum,
}

impl FromStr for StoredQuantity {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "currentstate" => Ok(StoredQuantity::CurrentState),
            "costfunctionj" => Ok(StoredQuantity::CostFunctionJ),
            "costfunctionjb" => Ok(StoredQuantity::CostFunctionJb),
            "costfunctionjo" => Ok(StoredQuantity::CostFunctionJo),
            "gradientnorm" => Ok(StoredQuantity::GradientNorm),
            "indexofoptimum" => Ok(StoredQuantity::IndexOfOptimum),
            _ => Err(OptError::InvalidStoredQuantity { name: s.to_string() }),
        }
    }
}

/// Calibration configuration.
///
/// Default:
/// - `tols`: `tol_grad = 1e-6`, `max_iter = 100`
/// - `line_searcher`: `MoreThuente`
/// - `lbfgs_mem`: `None`
/// - `gradient`: `Auto`
/// - `model_assumption`: `Perfect`
/// - `store`: empty
/// - `verbose`: `false`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub lbfgs_mem: Option<usize>,
    pub gradient: GradientMethod,
    pub model_assumption: ModelAssumption,
    pub store: BTreeSet<StoredQuantity>,
    pub verbose: bool,
}

impl CalibrationOptions {
    /// Create validated calibration options.
    ///
    /// # Errors
    /// - [`OptError::InvalidLBFGSMem`] if `lbfgs_mem == Some(0)`.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
        gradient: GradientMethod, model_assumption: ModelAssumption,
        store: impl IntoIterator<Item = StoredQuantity>, verbose: bool,
    ) -> OptResult<Self> {
        if lbfgs_mem == Some(0) {
            return Err(OptError::InvalidLBFGSMem {
                mem: 0,
                reason: "L-BFGS memory must be greater than zero.",
            });
        }
        Ok(Self {
            tols,
            line_searcher,
            lbfgs_mem,
            gradient,
            model_assumption,
            store: store.into_iter().collect(),
            verbose,
        })
    }

    /// Parse ADAO-style names into the stored set.
    ///
    /// # Errors
    /// [`OptError::InvalidStoredQuantity`] for the first unknown name.
    pub fn with_stored<'s>(mut self, names: impl IntoIterator<Item = &'s str>) -> OptResult<Self> {
        for name in names {
            self.store.insert(name.parse()?);
        }
        Ok(self)
    }

    pub fn stores(&self, quantity: StoredQuantity) -> bool {
        self.store.contains(&quantity)
    }

    /// Options handed to the minimizer.
    pub fn minimizer_options(&self) -> MinimizerOptions {
        let fd_scheme = match self.gradient {
            GradientMethod::FiniteDifference(scheme) => scheme,
            GradientMethod::Auto | GradientMethod::Adjoint => FdScheme::Central,
        };
        MinimizerOptions {
            tols: self.tols,
            line_searcher: self.line_searcher,
            fd_scheme,
            lbfgs_mem: self.lbfgs_mem,
            record_iterations: !self.store.is_empty(),
            verbose: self.verbose,
        }
    }
}
