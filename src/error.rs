//! Error types shared by the collector, encoder, reporter and trainer.

use crate::question::Field;
use thiserror::Error;

/// A raw answer that failed its question's predicate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

/// A complete answer set that cannot be mapped onto the classifier's schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("missing answer for {0}")]
    MissingField(Field),

    #[error("{field} expects a {expected} value")]
    TypeMismatch { field: Field, expected: &'static str },

    #[error("unknown category {value:?} for {field}")]
    UnknownCategory { field: Field, value: String },
}

/// Failure inside the classifier capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    #[error("feature row has {actual} columns, model expects {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AttritionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("prediction unavailable: {0}")]
    ClassifierUnavailable(#[from] ClassifierError),

    #[error("session is already completed; reset it to start over")]
    SessionCompleted,

    #[error("session is not completed yet")]
    NotCompleted,

    #[error("session was already reported; reset it before predicting again")]
    AlreadyReported,

    #[error("invalid questionnaire: {0}")]
    Questionnaire(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training failed: {0}")]
    Training(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to encode model: {0}")]
    ModelEncode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode model: {0}")]
    ModelDecode(#[from] rmp_serde::decode::Error),
}

pub type Result<T> = std::result::Result<T, AttritionError>;
