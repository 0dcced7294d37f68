//! Logistic-regression attrition model: training, evaluation and persistence.

use crate::classifier::{Classifier, Outcome};
use crate::dataset::{self, EmployeeRecord};
use crate::encoder::{CategoryEncoding, FeatureRow, FeatureSchema, UnknownCategory};
use crate::error::{AttritionError, ClassifierError, Result};
use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use rmp_serde::{decode::from_read, encode::write_named};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::SystemTime;
use tracing::{info, warn};

/// Knobs for [`AttritionModel::train`]. Saved with the model so a stale
/// model is retrained the way it was first built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub max_iterations: u64,
    /// L2 regularization strength.
    pub alpha: f64,
    pub encoding: CategoryEncoding,
    pub unknown: UnknownCategory,
    /// Oversample the minority class to match the majority before fitting.
    pub balance_classes: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            test_ratio: 0.3,
            seed: 42,
            max_iterations: 2000,
            alpha: 1.0,
            encoding: CategoryEncoding::OneHot,
            unknown: UnknownCategory::Ignore,
            balance_classes: true,
        }
    }
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub outcome: Outcome,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
}

impl EvaluationReport {
    /// Scores `(actual, predicted)` pairs.
    pub fn from_pairs(pairs: &[(Outcome, Outcome)]) -> Self {
        let ratio = |num: usize, den: usize| {
            if den == 0 { 0.0 } else { num as f64 / den as f64 }
        };

        let correct = pairs.iter().filter(|(a, p)| a == p).count();
        let classes = [Outcome::Stay, Outcome::Leave]
            .into_iter()
            .map(|outcome| {
                let tp = pairs
                    .iter()
                    .filter(|(a, p)| *a == outcome && *p == outcome)
                    .count();
                let predicted = pairs.iter().filter(|(_, p)| *p == outcome).count();
                let support = pairs.iter().filter(|(a, _)| *a == outcome).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    outcome,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        EvaluationReport {
            accuracy: ratio(correct, pairs.len()),
            classes,
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>10} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>10} {:>10.3} {:>10.3} {:>10.3} {:>10}",
                c.outcome.to_string(),
                c.precision,
                c.recall,
                c.f1,
                c.support
            )?;
        }
        let total: usize = self.classes.iter().map(|c| c.support).sum();
        write!(
            f,
            "{:>10} {:>10} {:>10} {:>10.3} {:>10}",
            "accuracy", "", "", self.accuracy, total
        )
    }
}

/// Trained classifier together with the feature schema it expects.
#[derive(Serialize, Deserialize)]
pub struct AttritionModel {
    schema: FeatureSchema,
    model: FittedLogisticRegression<f64, usize>,
    config: TrainConfig,
    evaluation: Option<EvaluationReport>,
}

impl AttritionModel {
    /// Fits on every record given, without holding any out.
    pub fn fit(records: &[EmployeeRecord], config: &TrainConfig) -> Result<Self> {
        let schema = FeatureSchema::fit(records, config.encoding, config.unknown)?;

        let balanced;
        let rows = if config.balance_classes {
            balanced = dataset::oversample_minority(records);
            &balanced[..]
        } else {
            records
        };
        let x = schema.encode_records(rows)?;
        let y: Array1<usize> = rows.iter().map(|r| r.attrition.class()).collect();

        let model = LogisticRegression::default()
            .alpha(config.alpha)
            .max_iterations(config.max_iterations)
            .fit(&Dataset::new(x, y))
            .map_err(|e| AttritionError::Training(e.to_string()))?;

        Ok(AttritionModel {
            schema,
            model,
            config: config.clone(),
            evaluation: None,
        })
    }

    /// Stratified split, fit on the training part, score the held-out part.
    pub fn train(records: &[EmployeeRecord], config: &TrainConfig) -> Result<Self> {
        let split = dataset::train_test_split(records, config.test_ratio, config.seed);
        info!(
            train = split.train.len(),
            test = split.test.len(),
            encoding = %config.encoding,
            "training logistic regression"
        );

        let mut model = AttritionModel::fit(&split.train, config)?;
        if !split.test.is_empty() {
            let report = model.evaluate(&split.test)?;
            info!(accuracy = report.accuracy, "held-out evaluation");
            model.evaluation = Some(report);
        }
        Ok(model)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Held-out scores recorded at training time.
    pub fn evaluation(&self) -> Option<&EvaluationReport> {
        self.evaluation.as_ref()
    }

    pub fn evaluate(&self, records: &[EmployeeRecord]) -> Result<EvaluationReport> {
        let x: Array2<f64> = self.schema.encode_records(records)?;
        let predicted: Array1<usize> = self.model.predict(&x);
        let pairs: Vec<(Outcome, Outcome)> = records
            .iter()
            .zip(predicted.iter())
            .map(|(r, &class)| {
                let predicted = Outcome::from_class(class).unwrap_or(Outcome::Stay);
                (r.attrition, predicted)
            })
            .collect();
        Ok(EvaluationReport::from_pairs(&pairs))
    }

    /// linfa-logistic treats the more frequent training label as the
    /// positive class, so `Leave` is not necessarily the one it scores.
    fn leave_is_positive(&self) -> bool {
        self.model.labels().pos.class == Outcome::Leave.class()
    }

    /// The `n` features with the largest absolute coefficient, positive
    /// values pushing towards `Leave`.
    pub fn top_features(&self, n: usize) -> Vec<(String, f64)> {
        let sign = if self.leave_is_positive() { 1.0 } else { -1.0 };
        let mut features: Vec<(String, f64)> = self
            .schema
            .feature_names()
            .into_iter()
            .zip(self.model.params().iter().map(|w| sign * w))
            .collect();
        features.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        features.truncate(n);
        features
    }

    fn check_width(&self, row: &FeatureRow) -> std::result::Result<(), ClassifierError> {
        if row.len() != self.schema.width() {
            return Err(ClassifierError::WidthMismatch {
                expected: self.schema.width(),
                actual: row.len(),
            });
        }
        Ok(())
    }

    /// Load a saved model if up-to-date, or retrain if the CSV is newer.
    ///
    /// A stale model is retrained with its own saved configuration; `config`
    /// is used only when there is no readable model yet.
    pub fn load_or_train_if_stale(
        model_path: &Path,
        csv_path: &Path,
        config: &TrainConfig,
    ) -> Result<Self> {
        let model_mtime = model_path
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let csv_mtime = csv_path
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let should_retrain = !model_path.exists() || csv_mtime > model_mtime;

        if should_retrain {
            info!(csv = %csv_path.display(), "training model (CSV is newer or model missing)");
            let config = match model_path.exists() {
                true => match AttritionModel::load_from_file(model_path) {
                    Ok(previous) => {
                        info!(
                            encoding = %previous.config.encoding,
                            "reusing the stale model's configuration"
                        );
                        previous.config
                    }
                    Err(e) => {
                        warn!(error = %e, "stale model is unreadable, using the requested config");
                        config.clone()
                    }
                },
                false => config.clone(),
            };
            let records = dataset::load_csv(csv_path)?;
            let model = AttritionModel::train(&records, &config)?;
            model.save_to_file(model_path)?;
            Ok(model)
        } else {
            info!(model = %model_path.display(), "loading up-to-date model");
            AttritionModel::load_from_file(model_path)
        }
    }

    /// Saves the model to a binary `.msgpack` file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_named(&mut writer, self)?;
        info!(path = %path.display(), "saved model");
        Ok(())
    }

    /// Loads the model from a binary `.msgpack` file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(from_read(reader)?)
    }
}

impl Classifier for AttritionModel {
    fn predict(&self, row: &FeatureRow) -> std::result::Result<Outcome, ClassifierError> {
        self.check_width(row)?;
        let classes: Array1<usize> = self.model.predict(&row.to_array());
        let class = classes
            .get(0)
            .copied()
            .ok_or_else(|| ClassifierError::Backend("model returned no prediction".into()))?;
        Outcome::from_class(class)
            .ok_or_else(|| ClassifierError::Backend(format!("unexpected class {class}")))
    }

    fn predict_probability(
        &self,
        row: &FeatureRow,
    ) -> std::result::Result<Option<[f64; 2]>, ClassifierError> {
        self.check_width(row)?;
        let p_positive = self
            .model
            .predict_probabilities(&row.to_array())
            .get(0)
            .copied()
            .ok_or_else(|| ClassifierError::Backend("model returned no probability".into()))?;
        let p_leave = if self.leave_is_positive() {
            p_positive
        } else {
            1.0 - p_positive
        };
        Ok(Some([1.0 - p_leave, p_leave]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_scores_each_class() {
        use Outcome::{Leave, Stay};
        let pairs = [(Stay, Stay), (Stay, Leave), (Leave, Leave), (Leave, Leave)];
        let report = EvaluationReport::from_pairs(&pairs);
        assert_eq!(report.accuracy, 0.75);

        let stay = &report.classes[0];
        assert_eq!(stay.precision, 1.0);
        assert_eq!(stay.recall, 0.5);
        assert_eq!(stay.support, 2);

        let leave = &report.classes[1];
        assert!((leave.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(leave.recall, 1.0);
        assert!(report.to_string().contains("accuracy"));
    }

    #[test]
    fn empty_report_is_zero_not_nan() {
        let report = EvaluationReport::from_pairs(&[]);
        assert_eq!(report.accuracy, 0.0);
        assert!(report.classes.iter().all(|c| c.f1 == 0.0));
    }

    /// Leavers earn less and are less satisfied than stayers.
    fn separable(leavers: usize, stayers: usize) -> Vec<EmployeeRecord> {
        let person = |i: usize, attrition: Outcome| {
            let leave = attrition == Outcome::Leave;
            EmployeeRecord {
                age: 25.0 + (i % 30) as f64,
                gender: if i % 2 == 0 { "Male" } else { "Female" }.into(),
                department: "IT".into(),
                education: "Masters".into(),
                years_at_company: (i % 10) as f64,
                job_satisfaction: if leave { 1.0 + (i % 2) as f64 } else { 4.0 + (i % 2) as f64 },
                monthly_income: if leave { 20_000.0 } else { 70_000.0 } + (i * 250) as f64,
                attrition,
            }
        };
        (0..leavers)
            .map(|i| person(i, Outcome::Leave))
            .chain((0..stayers).map(|i| person(i, Outcome::Stay)))
            .collect()
    }

    fn assert_oriented(records: &[EmployeeRecord]) {
        let config = TrainConfig {
            balance_classes: false,
            ..TrainConfig::default()
        };
        let model = AttritionModel::fit(records, &config).unwrap();

        for r in records {
            let row = model.schema().encode_record(r).unwrap();
            let [stay, leave] = model.predict_probability(&row).unwrap().unwrap();
            assert!((stay + leave - 1.0).abs() < 1e-12);
            let by_probability = if leave >= 0.5 { Outcome::Leave } else { Outcome::Stay };
            assert_eq!(model.predict(&row).unwrap(), by_probability);
        }

        let income = model
            .top_features(usize::MAX)
            .into_iter()
            .find(|(name, _)| name == "MonthlyIncome")
            .unwrap();
        assert!(income.1 < 0.0, "higher income should push towards staying");
    }

    #[test]
    fn probabilities_are_oriented_when_stayers_dominate() {
        assert_oriented(&separable(10, 40));
    }

    #[test]
    fn probabilities_are_oriented_when_leavers_dominate() {
        assert_oriented(&separable(40, 10));
    }

    #[test]
    fn training_config_is_saved_with_the_model() {
        let config = TrainConfig {
            encoding: CategoryEncoding::Ordinal,
            ..TrainConfig::default()
        };
        let model = AttritionModel::fit(&separable(10, 30), &config).unwrap();
        assert_eq!(model.config(), &config);
    }
}
