//! Turns a completed session into a stay/leave verdict.

use crate::classifier::{Classifier, Outcome};
use crate::collector::Collector;
use crate::encoder::{FeatureRow, FeatureSchema};
use crate::error::{AttritionError, Result};
use crate::model::AttritionModel;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub outcome: Outcome,
    /// Highest class probability, when the classifier reports probabilities.
    pub confidence: Option<f64>,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        self.outcome.label()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prediction: {}", self.label())?;
        if let Some(c) = self.confidence {
            write!(f, " (confidence: {c:.2})")?;
        }
        Ok(())
    }
}

/// Holds the classifier handle and the schema it was trained with.
#[derive(Clone)]
pub struct Reporter {
    schema: FeatureSchema,
    classifier: Arc<dyn Classifier>,
}

impl Reporter {
    pub fn new(schema: FeatureSchema, classifier: Arc<dyn Classifier>) -> Self {
        Reporter { schema, classifier }
    }

    pub fn from_model(model: Arc<AttritionModel>) -> Self {
        let schema = model.schema().clone();
        Reporter::new(schema, model)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Predicts one already-encoded row.
    pub fn verdict(&self, row: &FeatureRow) -> Result<Verdict> {
        let outcome = self.classifier.predict(row).inspect_err(|e| {
            error!(error = %e, "classifier failed");
        })?;
        let confidence = self
            .classifier
            .predict_probability(row)?
            .map(|[stay, leave]| stay.max(leave));
        Ok(Verdict { outcome, confidence })
    }

    /// Predicts for a completed session. Each completed session is reported
    /// at most once; after that the collector must be reset.
    pub fn report(&self, collector: &mut Collector) -> Result<Verdict> {
        let answers = collector.claim_answers()?;
        let row = self.schema.encode(answers)?;
        collector.mark_reported();

        let verdict = self.verdict(&row)?;
        info!(outcome = %verdict.outcome, confidence = ?verdict.confidence, "reported verdict");
        Ok(verdict)
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter").field("schema", &self.schema).finish_non_exhaustive()
    }
}

/// Prediction was impossible; shown to the user instead of a verdict.
pub const UNAVAILABLE: &str = "Prediction unavailable.";

pub fn is_unavailable(err: &AttritionError) -> bool {
    matches!(err, AttritionError::ClassifierUnavailable(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectorEvent;
    use crate::encoder::ColumnSpec;
    use crate::error::ClassifierError;
    use crate::question::{Field, FieldKind, GENDERS, Question, Questionnaire};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        class: Outcome,
        proba: Option<[f64; 2]>,
        calls: AtomicUsize,
    }

    impl Classifier for Fixed {
        fn predict(&self, _row: &FeatureRow) -> std::result::Result<Outcome, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.class)
        }

        fn predict_probability(
            &self,
            _row: &FeatureRow,
        ) -> std::result::Result<Option<[f64; 2]>, ClassifierError> {
            Ok(self.proba)
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn predict(&self, _row: &FeatureRow) -> std::result::Result<Outcome, ClassifierError> {
            Err(ClassifierError::Backend("model file is corrupt".into()))
        }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec![
            ColumnSpec::Numeric {
                field: Field::Age,
                mean: 0.0,
                std_dev: 1.0,
            },
            ColumnSpec::Ordinal {
                field: Field::Gender,
                categories: vec!["Female".into(), "Male".into()],
            },
        ])
    }

    fn completed_collector() -> Collector {
        let questions = Questionnaire::new(vec![
            Question {
                field: Field::Age,
                prompt: "Age?",
                kind: FieldKind::IntegerRange { min: 18, max: 65 },
                error_message: "18-65",
            },
            Question {
                field: Field::Gender,
                prompt: "Gender?",
                kind: FieldKind::Categorical { choices: GENDERS },
                error_message: "Male/Female",
            },
        ])
        .unwrap();
        let mut c = Collector::new(Arc::new(questions));
        c.submit("40").unwrap();
        assert!(matches!(c.submit("female").unwrap(), CollectorEvent::Completed(_)));
        c
    }

    fn fixed(class: Outcome, proba: Option<[f64; 2]>) -> Arc<Fixed> {
        Arc::new(Fixed {
            class,
            proba,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn leave_with_probability_pair() {
        let reporter = Reporter::new(schema(), fixed(Outcome::Leave, Some([0.3, 0.7])));
        let verdict = reporter.report(&mut completed_collector()).unwrap();
        assert_eq!(verdict.label(), "Likely to Leave");
        assert_eq!(verdict.confidence, Some(0.7));
        assert_eq!(verdict.to_string(), "Prediction: Likely to Leave (confidence: 0.70)");
    }

    #[test]
    fn confidence_is_absent_without_probabilities() {
        let reporter = Reporter::new(schema(), fixed(Outcome::Stay, None));
        let verdict = reporter.verdict(&FeatureRow::new(vec![40.0, 0.0])).unwrap();
        assert_eq!(verdict.confidence, None);
        assert_eq!(verdict.to_string(), "Prediction: Likely to Stay");
    }

    #[test]
    fn second_report_is_rejected_without_predicting() {
        let classifier = fixed(Outcome::Stay, Some([0.8, 0.2]));
        let reporter = Reporter::new(schema(), classifier.clone());
        let mut c = completed_collector();

        reporter.report(&mut c).unwrap();
        assert!(matches!(reporter.report(&mut c), Err(AttritionError::AlreadyReported)));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);

        c.reset();
        c.submit("30").unwrap();
        c.submit("Male").unwrap();
        reporter.report(&mut c).unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn incomplete_session_is_rejected() {
        let reporter = Reporter::new(schema(), fixed(Outcome::Stay, None));
        let mut c = completed_collector();
        c.reset();
        c.submit("30").unwrap();
        assert!(matches!(reporter.report(&mut c), Err(AttritionError::NotCompleted)));
    }

    #[test]
    fn encoding_failure_leaves_session_unreported() {
        let schema = FeatureSchema::new(vec![ColumnSpec::Ordinal {
            field: Field::Gender,
            categories: vec!["F".into(), "M".into()],
        }]);
        let reporter = Reporter::new(schema, fixed(Outcome::Stay, None));
        let mut c = completed_collector();
        assert!(matches!(reporter.report(&mut c), Err(AttritionError::Encoding(_))));
        assert!(!c.is_reported());
    }

    #[test]
    fn classifier_failure_is_unavailable() {
        let reporter = Reporter::new(schema(), Arc::new(Broken));
        let mut c = completed_collector();
        let err = reporter.report(&mut c).unwrap_err();
        assert!(is_unavailable(&err));
        assert!(c.is_reported());
    }
}
