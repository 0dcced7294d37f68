//! The prediction capability the reporter talks to.

use crate::encoder::FeatureRow;
use crate::error::ClassifierError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary attrition outcome; `Leave` is class `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Stay,
    Leave,
}

impl Outcome {
    pub fn class(self) -> usize {
        match self {
            Outcome::Stay => 0,
            Outcome::Leave => 1,
        }
    }

    pub fn from_class(class: usize) -> Option<Outcome> {
        match class {
            0 => Some(Outcome::Stay),
            1 => Some(Outcome::Leave),
            _ => None,
        }
    }

    /// Human-facing verdict text.
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Stay => "Likely to Stay",
            Outcome::Leave => "Likely to Leave",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Stay => f.write_str("Stay"),
            Outcome::Leave => f.write_str("Leave"),
        }
    }
}

/// A trained binary predictor. Implementations are read-only after loading,
/// so one handle can serve any number of sessions.
pub trait Classifier: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> Result<Outcome, ClassifierError>;

    /// `[P(stay), P(leave)]`, or `None` when the model has no probability output.
    fn predict_probability(&self, _row: &FeatureRow) -> Result<Option<[f64; 2]>, ClassifierError> {
        Ok(None)
    }
}
