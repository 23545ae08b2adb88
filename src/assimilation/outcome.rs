//! Result types returned by [`crate::assimilation::calibrate`].
use crate::{
    assimilation::{
        cost::CostBreakdown,
        counters::EvalCounts,
        options::{CalibrationOptions, StoredQuantity},
    },
    optimization::{
        errors::OptResult,
        minimizer::{FnEvalMap, IterationRecord, TerminalState, Theta},
    },
};

/// Result of one calibration.
///
/// - `analysis`: calibrated control vector (best accepted iterate).
/// - `background_minus_analysis`: `xb − analysis`.
/// - `cost` / `breakdown`: `J` at the analysis and its terms.
/// - `terminal`: `Converged` or `MaxIterReached`.
/// - `status`: argmin's termination status as text.
/// - `iterations`, `fn_evals`: minimizer counters.
/// - `counters`: engine-side invocation counts for this run.
/// - `grad_norm`: norm of the last gradient, if available. It is measured
///   in the normalized control variables the minimizer works on, so it
///   starts near 1 and is comparable with the gradient tolerance.
/// - `intermediate`: per-iteration records that were requested. States and
///   costs are physical; gradient norms are normalized like `grad_norm`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOutcome {
    pub analysis: Theta,
    pub background_minus_analysis: Theta,
    pub cost: f64,
    pub breakdown: CostBreakdown,
    pub terminal: TerminalState,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub counters: EvalCounts,
    pub grad_norm: Option<f64>,
    pub intermediate: IntermediateRecords,
}

impl CalibrationOutcome {
    pub fn converged(&self) -> bool {
        self.terminal == TerminalState::Converged
    }
}

/// Per-iteration quantities, present only when requested.
///
/// Entry `k` of every vector belongs to the same recorded iterate; entry
/// `0` is the background.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntermediateRecords {
    pub current_state: Option<Vec<Theta>>,
    pub cost_j: Option<Vec<f64>>,
    pub cost_jb: Option<Vec<f64>>,
    pub cost_jo: Option<Vec<f64>>,
    pub grad_norm: Option<Vec<Option<f64>>>,
    pub index_of_optimum: Option<usize>,
}

impl IntermediateRecords {
    /// Select the requested quantities from the minimizer history.
    ///
    /// `breakdown` recomputes the cost terms for a recorded state; it is only
    /// called when `CostFunctionJb` or `CostFunctionJo` is requested.
    pub fn from_history(
        history: &[IterationRecord], opts: &CalibrationOptions,
        mut breakdown: impl FnMut(&Theta) -> OptResult<CostBreakdown>,
    ) -> OptResult<Self> {
        let mut records = IntermediateRecords::default();
        if opts.stores(StoredQuantity::CurrentState) {
            records.current_state = Some(history.iter().map(|r| r.state.clone()).collect());
        }
        if opts.stores(StoredQuantity::CostFunctionJ) {
            records.cost_j = Some(history.iter().map(|r| r.cost).collect());
        }
        if opts.stores(StoredQuantity::CostFunctionJb) || opts.stores(StoredQuantity::CostFunctionJo)
        {
            let terms = history.iter().map(|r| breakdown(&r.state)).collect::<OptResult<Vec<_>>>()?;
            if opts.stores(StoredQuantity::CostFunctionJb) {
                records.cost_jb = Some(terms.iter().map(|b| b.jb).collect());
            }
            if opts.stores(StoredQuantity::CostFunctionJo) {
                records.cost_jo = Some(terms.iter().map(|b| b.jo).collect());
            }
        }
        if opts.stores(StoredQuantity::GradientNorm) {
            records.grad_norm = Some(history.iter().map(|r| r.grad_norm).collect());
        }
        if opts.stores(StoredQuantity::IndexOfOptimum) {
            records.index_of_optimum = index_of_optimum(history);
        }
        Ok(records)
    }
}

/// Index of the lowest recorded cost; ties keep the earliest.
fn index_of_optimum(history: &[IterationRecord]) -> Option<usize> {
    history
        .iter()
        .enumerate()
        .filter(|(_, r)| r.cost.is_finite())
        .min_by(|(_, a), (_, b)| a.cost.total_cmp(&b.cost))
        .map(|(i, _)| i)
}
