//! # attrition 💼
//!
//! Predict whether an employee is likely to stay or leave, using a logistic
//! regression model trained on tabular HR data.
//!
//! Answers are gathered either all at once (a form) or one question at a time
//! through a [`Collector`], encoded through the [`FeatureSchema`] stored with
//! the model, and turned into a [`Verdict`] by a [`Reporter`].
//!
//! ## Features
//! - Guided question sequence with per-field validation and re-prompting
//! - Ordinal or one-hot categorical encoding, learned at training time
//! - Logistic regression via [`linfa-logistic`](https://crates.io/crates/linfa-logistic)
//! - Label + confidence prediction
//! - Model persistence with `rmp-serde` (MessagePack)
//! - Auto-retrain when the CSV is updated
//!
//! ## Example
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use attrition::{
//!     AttritionModel, Collector, CollectorEvent, Questionnaire, Reporter, TrainConfig,
//! };
//!
//! let model = AttritionModel::load_or_train_if_stale(
//!     Path::new("model.msgpack"),
//!     Path::new("data/employee_data.csv"),
//!     &TrainConfig::default(),
//! )?;
//! let reporter = Reporter::from_model(Arc::new(model));
//!
//! let mut session = Collector::new(Arc::new(Questionnaire::default_questions()));
//! for answer in ["34", "Female", "IT", "Masters", "6", "2", "52,000"] {
//!     if let CollectorEvent::Completed(_) = session.submit(answer)? {
//!         println!("{}", reporter.report(&mut session)?);
//!     }
//! }
//! # Ok::<(), attrition::AttritionError>(())
//! ```

pub mod classifier;
pub mod collector;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod model;
pub mod question;
pub mod reporter;

pub use classifier::{Classifier, Outcome};
pub use collector::{AnswerSet, Collector, CollectorEvent, CollectorState};
pub use dataset::{EmployeeRecord, load_csv, train_test_split};
pub use encoder::{CategoryEncoding, ColumnSpec, FeatureRow, FeatureSchema, UnknownCategory};
pub use error::{AttritionError, ClassifierError, EncodingError, ValidationError};
pub use model::{AttritionModel, EvaluationReport, TrainConfig};
pub use question::{Field, FieldKind, Question, Questionnaire, Value};
pub use reporter::{Reporter, Verdict};
