//! assimilation::covariance — error specifications and their precisions.
//!
//! Purpose
//! -------
//! Describe background, evolution, and observation errors as variances or
//! covariances and turn them, once per calibration, into the inverse
//! weights `Bi`, `Qi`, `Ri` used by the cost and its gradient.
//!
//! Key behaviors
//! -------------
//! - [`ErrorSpec::precision`] validates a specification against the vector
//!   length it weights and prepares a [`Precision`].
//! - Full covariances are Cholesky-factorized with `nalgebra`; applying the
//!   precision is a triangular solve, never an explicit inverse.
//! - [`ErrorModel::prepare`] validates all three specs eagerly and returns
//!   [`PreparedErrors`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Variances are finite and strictly positive; full matrices are square,
//!   symmetric (relative tolerance `1e-10`), and positive definite.
//! - A supplied evolution spec is validated even under a perfect model.
use crate::{
    assimilation::options::ModelAssumption,
    optimization::errors::{OptError, OptResult},
};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use ndarray::{Array1, Array2, ArrayView1};

const SYMMETRY_RTOL: f64 = 1e-10;

/// Which error a specification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Background,
    Evolution,
    Observation,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Background => "background",
            ErrorKind::Evolution => "evolution",
            ErrorKind::Observation => "observation",
        }
    }
}

/// Error covariance given as variances.
///
/// - `Scalar(σ²)`: isotropic, any dimension.
/// - `Diagonal(σ²ᵢ)`: independent components; length must match.
/// - `Full(C)`: dense symmetric positive-definite covariance.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSpec {
    Scalar(f64),
    Diagonal(Array1<f64>),
    Full(Array2<f64>),
}

impl ErrorSpec {
    /// Validate against `dim` and prepare the inverse weighting.
    ///
    /// # Errors
    /// - [`OptError::ErrorSpecDimMismatch`] for a wrong length or shape.
    /// - [`OptError::InvalidVariance`] for non-finite or non-positive
    ///   variances (diagonal entries of a full matrix included).
    /// - [`OptError::AsymmetricCovariance`] /
    ///   [`OptError::CovarianceNotPositiveDefinite`] for bad full matrices.
    pub fn precision(&self, dim: usize, kind: ErrorKind) -> OptResult<Precision> {
        let label = kind.label();
        match self {
            ErrorSpec::Scalar(variance) => {
                check_variance(*variance, 0, label)?;
                Ok(Precision::Isotropic { inv_variance: 1.0 / variance, dim })
            }
            ErrorSpec::Diagonal(variances) => {
                if variances.len() != dim {
                    return Err(OptError::ErrorSpecDimMismatch {
                        kind: label,
                        expected: dim,
                        found: (variances.len(), 1),
                    });
                }
                for (index, &v) in variances.iter().enumerate() {
                    check_variance(v, index, label)?;
                }
                Ok(Precision::Diagonal(variances.mapv(|v| 1.0 / v)))
            }
            ErrorSpec::Full(cov) => {
                if cov.dim() != (dim, dim) {
                    return Err(OptError::ErrorSpecDimMismatch {
                        kind: label,
                        expected: dim,
                        found: cov.dim(),
                    });
                }
                for index in 0..dim {
                    check_variance(cov[[index, index]], index, label)?;
                }
                for row in 0..dim {
                    for col in (row + 1)..dim {
                        let (a, b) = (cov[[row, col]], cov[[col, row]]);
                        let scale = a.abs().max(b.abs()).max(1.0);
                        if !a.is_finite() || !b.is_finite() || (a - b).abs() > SYMMETRY_RTOL * scale
                        {
                            return Err(OptError::AsymmetricCovariance { kind: label, row, col });
                        }
                    }
                }
                let matrix = DMatrix::from_fn(dim, dim, |i, j| cov[[i, j]]);
                let factor = Cholesky::new(matrix)
                    .ok_or(OptError::CovarianceNotPositiveDefinite { kind: label })?;
                Ok(Precision::Full(factor))
            }
        }
    }
}

fn check_variance(value: f64, index: usize, kind: &'static str) -> OptResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OptError::InvalidVariance { kind, index, value });
    }
    Ok(())
}

/// Prepared inverse weight `C⁻¹`.
#[derive(Debug, Clone)]
pub enum Precision {
    Isotropic { inv_variance: f64, dim: usize },
    Diagonal(Array1<f64>),
    Full(Cholesky<f64, Dyn>),
}

impl Precision {
    /// Length of the vectors this precision weights.
    pub fn dim(&self) -> usize {
        match self {
            Precision::Isotropic { dim, .. } => *dim,
            Precision::Diagonal(inv) => inv.len(),
            Precision::Full(factor) => factor.l_dirty().nrows(),
        }
    }

    /// `C⁻¹ r`.
    pub fn apply(&self, r: ArrayView1<'_, f64>) -> Array1<f64> {
        match self {
            Precision::Isotropic { inv_variance, .. } => r.mapv(|v| v * inv_variance),
            Precision::Diagonal(inv) => &r * inv,
            Precision::Full(factor) => {
                let rhs = DVector::from_iterator(r.len(), r.iter().copied());
                let sol = factor.solve(&rhs);
                Array1::from_iter(sol.iter().copied())
            }
        }
    }

    /// `rᵀ C⁻¹ r`.
    pub fn quadratic(&self, r: ArrayView1<'_, f64>) -> f64 {
        match self {
            Precision::Isotropic { inv_variance, .. } => inv_variance * r.dot(&r),
            Precision::Diagonal(inv) => r.iter().zip(inv.iter()).map(|(v, w)| v * v * w).sum(),
            Precision::Full(_) => r.dot(&self.apply(r)),
        }
    }
}

/// Background, optional evolution, and observation error specifications.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorModel {
    pub background: ErrorSpec,
    pub evolution: Option<ErrorSpec>,
    pub observation: ErrorSpec,
}

impl ErrorModel {
    pub fn new(background: ErrorSpec, observation: ErrorSpec) -> Self {
        Self { background, evolution: None, observation }
    }

    pub fn with_evolution(mut self, evolution: ErrorSpec) -> Self {
        self.evolution = Some(evolution);
        self
    }

    /// Validate every specification and prepare the precisions.
    ///
    /// Background and evolution errors weight state vectors of length
    /// `state_dim`; the observation error weights rows of length `obs_dim`.
    ///
    /// # Errors
    /// - Any error from [`ErrorSpec::precision`].
    /// - [`OptError::MissingEvolutionError`] under
    ///   [`ModelAssumption::Imperfect`] without an evolution spec.
    pub fn prepare(
        &self, state_dim: usize, obs_dim: usize, assumption: ModelAssumption,
    ) -> OptResult<PreparedErrors> {
        let background = self.background.precision(state_dim, ErrorKind::Background)?;
        let evolution = self
            .evolution
            .as_ref()
            .map(|spec| spec.precision(state_dim, ErrorKind::Evolution))
            .transpose()?;
        let observation = self.observation.precision(obs_dim, ErrorKind::Observation)?;
        if assumption == ModelAssumption::Imperfect && evolution.is_none() {
            return Err(OptError::MissingEvolutionError);
        }
        Ok(PreparedErrors { background, evolution, observation })
    }
}

/// Validated precisions for one calibration.
#[derive(Debug, Clone)]
pub struct PreparedErrors {
    background: Precision,
    evolution: Option<Precision>,
    observation: Precision,
}

impl PreparedErrors {
    /// Inverse weight for `kind`.
    ///
    /// # Errors
    /// [`OptError::MissingEvolutionError`] when asking for an evolution
    /// precision that was never supplied.
    pub fn inv_weight(&self, kind: ErrorKind) -> OptResult<&Precision> {
        match kind {
            ErrorKind::Background => Ok(&self.background),
            ErrorKind::Evolution => self.evolution.as_ref().ok_or(OptError::MissingEvolutionError),
            ErrorKind::Observation => Ok(&self.observation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // The three representations agree when they describe the same matrix.
    //
    // Given
    // -----
    // - Variance 4 in every component as Scalar, Diagonal, and Full.
    // - r = (1, -2, 2).
    //
    // Expect
    // ------
    // - `apply` = r / 4 and `quadratic` = 9 / 4 for all three.
    fn representations_agree_on_isotropic_covariance() {
        // Arrange
        let r = array![1.0, -2.0, 2.0];
        let specs = [
            ErrorSpec::Scalar(4.0),
            ErrorSpec::Diagonal(array![4.0, 4.0, 4.0]),
            ErrorSpec::Full(Array2::eye(3) * 4.0),
        ];

        for spec in specs {
            // Act
            let p = spec.precision(3, ErrorKind::Background).unwrap();

            // Assert
            assert_eq!(p.dim(), 3);
            let applied = p.apply(r.view());
            for (a, b) in applied.iter().zip(r.iter()) {
                assert_relative_eq!(*a, b / 4.0, max_relative = 1e-12);
            }
            assert_relative_eq!(p.quadratic(r.view()), 9.0 / 4.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn full_covariance_uses_cholesky_solve() {
        let cov = array![[2.0, 1.0], [1.0, 2.0]];
        let p = ErrorSpec::Full(cov.clone()).precision(2, ErrorKind::Observation).unwrap();
        let r = array![1.0, 0.0];

        let solved = p.apply(r.view());

        // C · C⁻¹ r = r
        let back = cov.dot(&solved);
        assert_relative_eq!(back[0], 1.0, max_relative = 1e-12);
        assert_relative_eq!(back[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.quadratic(r.view()), 2.0 / 3.0, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Invalid specifications are rejected with the matching error.
    //
    // Given
    // -----
    // - Negative scalar, short diagonal, asymmetric and indefinite matrices.
    //
    // Expect
    // ------
    // - `InvalidVariance`, `ErrorSpecDimMismatch`, `AsymmetricCovariance`,
    //   `CovarianceNotPositiveDefinite`.
    fn invalid_specs_are_rejected() {
        let kind = ErrorKind::Evolution;

        assert!(matches!(
            ErrorSpec::Scalar(-1.0).precision(3, kind),
            Err(OptError::InvalidVariance { kind: "evolution", .. })
        ));
        assert_eq!(
            ErrorSpec::Diagonal(array![1.0, 1.0]).precision(3, kind).unwrap_err(),
            OptError::ErrorSpecDimMismatch { kind: "evolution", expected: 3, found: (2, 1) }
        );
        assert!(matches!(
            ErrorSpec::Full(array![[1.0, 0.5], [0.0, 1.0]]).precision(2, kind),
            Err(OptError::AsymmetricCovariance { row: 0, col: 1, .. })
        ));
        assert!(matches!(
            ErrorSpec::Full(array![[1.0, 2.0], [2.0, 1.0]]).precision(2, kind),
            Err(OptError::CovarianceNotPositiveDefinite { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `prepare` validates the evolution spec even for a perfect model and
    // requires one for an imperfect model.
    //
    // Given
    // -----
    // - A mismatched evolution spec under `Perfect`.
    // - No evolution spec under `Imperfect`.
    //
    // Expect
    // ------
    // - `ErrorSpecDimMismatch` and `MissingEvolutionError` respectively.
    fn prepare_checks_evolution_error() {
        let base = ErrorModel::new(ErrorSpec::Diagonal(Array1::ones(9)), ErrorSpec::Scalar(1.0));
        let mismatched = base.clone().with_evolution(ErrorSpec::Diagonal(Array1::ones(4)));

        assert!(matches!(
            mismatched.prepare(9, 1, ModelAssumption::Perfect),
            Err(OptError::ErrorSpecDimMismatch { kind: "evolution", .. })
        ));
        assert!(matches!(
            base.prepare(9, 1, ModelAssumption::Imperfect),
            Err(OptError::MissingEvolutionError)
        ));

        let prepared = base.prepare(9, 1, ModelAssumption::Perfect).unwrap();
        assert!(prepared.inv_weight(ErrorKind::Evolution).is_err());
        assert_eq!(prepared.inv_weight(ErrorKind::Background).unwrap().dim(), 9);
    }
}
