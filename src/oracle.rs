//! Policy/value oracle consulted at expansion time.
//!
//! An oracle looks at a position and returns a prior probability for each of
//! its legal actions plus a value estimate for the side to move. In practice
//! it wraps a trained network; [`UniformOracle`] is a model-free stand-in.
//!
//! The engine holds the oracle to a strict contract, see
//! [`checked_priors`].

use thiserror::Error;
use tracing::debug;

use crate::constants::PRIOR_SUM_TOLERANCE;
use crate::error::{MctsError, Result};
use crate::game::GameState;

/// Failures inside the oracle itself (as opposed to contract violations).
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("model error: {0}")]
    ModelError(String),
}

/// Oracle output for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// `priors[i]` is the prior of `legal[i]` for the `legal` slice that was
    /// passed to [`PolicyValueOracle::evaluate`].
    pub priors: Vec<f64>,

    /// Value estimate for the side to move, in [-1, 1].
    pub value: f64,
}

/// Supplies move priors and a value estimate for a position.
///
/// Called at most once per expansion and never for a terminal position.
pub trait PolicyValueOracle<G: GameState> {
    fn evaluate(
        &self,
        fingerprint: &G::Fingerprint,
        legal: &[G::Action],
    ) -> std::result::Result<Evaluation, OracleError>;
}

/// Equal priors over the legal actions and a neutral value.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformOracle;

impl UniformOracle {
    pub fn new() -> Self {
        Self
    }
}

impl<G: GameState> PolicyValueOracle<G> for UniformOracle {
    fn evaluate(
        &self,
        _fingerprint: &G::Fingerprint,
        legal: &[G::Action],
    ) -> std::result::Result<Evaluation, OracleError> {
        if legal.is_empty() {
            return Ok(Evaluation {
                priors: Vec::new(),
                value: 0.0,
            });
        }
        let p = 1.0 / legal.len() as f64;
        Ok(Evaluation {
            priors: vec![p; legal.len()],
            value: 0.0,
        })
    }
}

/// Validate an oracle evaluation against the legal actions it was asked
/// about and return the priors to store.
///
/// Every legal action needs a prior in [0, 1], the value must lie in
/// [-1, 1], and the priors must sum to 1. A sum off by no more than
/// [`PRIOR_SUM_TOLERANCE`] is renormalised; anything further is rejected.
pub fn checked_priors(eval: &Evaluation, num_legal: usize) -> Result<Vec<f64>> {
    if eval.priors.len() != num_legal {
        return Err(MctsError::OracleContractViolation(format!(
            "expected {num_legal} priors, got {}",
            eval.priors.len()
        )));
    }
    if let Some((i, p)) = eval
        .priors
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p < 0.0 || **p > 1.0)
    {
        return Err(MctsError::OracleContractViolation(format!(
            "prior {p} for legal action #{i} is outside [0, 1]"
        )));
    }
    if !eval.value.is_finite() || eval.value.abs() > 1.0 {
        return Err(MctsError::OracleContractViolation(format!(
            "value {} is outside [-1, 1]",
            eval.value
        )));
    }

    let sum: f64 = eval.priors.iter().sum();
    if (sum - 1.0).abs() > PRIOR_SUM_TOLERANCE {
        return Err(MctsError::OracleContractViolation(format!(
            "priors sum to {sum}, not 1"
        )));
    }
    if sum != 1.0 {
        debug!(sum, "renormalising oracle priors");
    }
    Ok(eval.priors.iter().map(|p| p / sum).collect())
}
