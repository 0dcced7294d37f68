//! Maps answer sets onto the numeric row layout the classifier was trained on.
//!
//! The layout is learned once from the training records and stored with the
//! model, so inference always reproduces the training-time column order.

use crate::collector::AnswerSet;
use crate::dataset::EmployeeRecord;
use crate::error::{AttritionError, EncodingError, Result};
use crate::question::{Field, Value};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How categorical columns are turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryEncoding {
    /// One integer code per category, in sorted category order.
    Ordinal,
    /// One indicator column per category.
    OneHot,
}

impl fmt::Display for CategoryEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryEncoding::Ordinal => f.write_str("ordinal"),
            CategoryEncoding::OneHot => f.write_str("one-hot"),
        }
    }
}

/// What a one-hot column does with a category it never saw in training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownCategory {
    Error,
    /// Emit an all-zero block.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnSpec {
    Numeric {
        field: Field,
        mean: f64,
        std_dev: f64,
    },
    Ordinal {
        field: Field,
        categories: Vec<String>,
    },
    OneHot {
        field: Field,
        categories: Vec<String>,
        unknown: UnknownCategory,
    },
}

fn lookup(
    categories: &[String],
    field: Field,
    value: &Value,
) -> std::result::Result<Option<usize>, EncodingError> {
    let raw = value.as_category().ok_or(EncodingError::TypeMismatch {
        field,
        expected: "categorical",
    })?;
    let raw = raw.trim();
    Ok(categories.iter().position(|c| c.eq_ignore_ascii_case(raw)))
}

impl ColumnSpec {
    pub fn field(&self) -> Field {
        match self {
            ColumnSpec::Numeric { field, .. }
            | ColumnSpec::Ordinal { field, .. }
            | ColumnSpec::OneHot { field, .. } => *field,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            ColumnSpec::OneHot { categories, .. } => categories.len(),
            _ => 1,
        }
    }

    fn encode_into(
        &self,
        answers: &AnswerSet,
        row: &mut Vec<f64>,
    ) -> std::result::Result<(), EncodingError> {
        let field = self.field();
        let value = answers.get(field).ok_or(EncodingError::MissingField(field))?;
        let unknown = || EncodingError::UnknownCategory {
            field,
            value: value.to_string(),
        };

        match self {
            ColumnSpec::Numeric { mean, std_dev, .. } => {
                let x = value.as_f64().ok_or(EncodingError::TypeMismatch {
                    field,
                    expected: "numeric",
                })?;
                row.push((x - mean) / std_dev);
            }
            ColumnSpec::Ordinal { categories, .. } => {
                let code = lookup(categories, field, value)?.ok_or_else(unknown)?;
                row.push(code as f64);
            }
            ColumnSpec::OneHot {
                categories,
                unknown: policy,
                ..
            } => {
                let hit = lookup(categories, field, value)?;
                if hit.is_none() && *policy == UnknownCategory::Error {
                    return Err(unknown());
                }
                row.extend((0..categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
            }
        }
        Ok(())
    }
}

/// A single encoded sample, in schema column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow(Vec<f64>);

impl FeatureRow {
    pub fn new(values: Vec<f64>) -> Self {
        FeatureRow(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `1 × n` matrix, the shape linfa models predict on.
    pub fn to_array(&self) -> Array2<f64> {
        Array1::from_vec(self.0.clone()).insert_axis(Axis(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<ColumnSpec>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        FeatureSchema { columns }
    }

    /// Learns categories and numeric scaling from training records.
    ///
    /// Ordinal schemas keep dataset column order. One-hot schemas place the
    /// categorical blocks first, followed by the numeric columns.
    pub fn fit(
        records: &[EmployeeRecord],
        encoding: CategoryEncoding,
        unknown: UnknownCategory,
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(AttritionError::Dataset("no records to fit a schema on".into()));
        }

        let column_for = |field: Field| -> ColumnSpec {
            if field.is_categorical() {
                let categories: BTreeSet<String> = records
                    .iter()
                    .filter_map(|r| r.value(field).as_category().map(str::to_string))
                    .collect();
                let categories: Vec<String> = categories.into_iter().collect();
                match encoding {
                    CategoryEncoding::Ordinal => ColumnSpec::Ordinal { field, categories },
                    CategoryEncoding::OneHot => ColumnSpec::OneHot {
                        field,
                        categories,
                        unknown,
                    },
                }
            } else {
                let xs: Vec<f64> = records.iter().filter_map(|r| r.value(field).as_f64()).collect();
                let n = xs.len() as f64;
                let mean = xs.iter().sum::<f64>() / n;
                let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                let std_dev = if var > 0.0 { var.sqrt() } else { 1.0 };
                ColumnSpec::Numeric { field, mean, std_dev }
            }
        };

        let order: Vec<Field> = match encoding {
            CategoryEncoding::Ordinal => Field::ALL.to_vec(),
            CategoryEncoding::OneHot => {
                let (cat, num): (Vec<Field>, Vec<Field>) =
                    Field::ALL.into_iter().partition(|f| f.is_categorical());
                cat.into_iter().chain(num).collect()
            }
        };

        Ok(FeatureSchema {
            columns: order.into_iter().map(column_for).collect(),
        })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.iter().map(ColumnSpec::width).sum()
    }

    /// Column names after expansion, e.g. `Department_IT` for one-hot blocks.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|col| match col {
                ColumnSpec::OneHot {
                    field, categories, ..
                } => categories.iter().map(|c| format!("{field}_{c}")).collect(),
                other => vec![other.field().to_string()],
            })
            .collect()
    }

    pub fn encode(&self, answers: &AnswerSet) -> std::result::Result<FeatureRow, EncodingError> {
        let mut row = Vec::with_capacity(self.width());
        for col in &self.columns {
            col.encode_into(answers, &mut row)?;
        }
        Ok(FeatureRow(row))
    }

    pub fn encode_record(
        &self,
        record: &EmployeeRecord,
    ) -> std::result::Result<FeatureRow, EncodingError> {
        self.encode(&record.to_answers())
    }

    /// Stacks the encoded records into an `n × width` matrix.
    pub fn encode_records(&self, records: &[EmployeeRecord]) -> Result<Array2<f64>> {
        let mut data = Vec::with_capacity(records.len() * self.width());
        for r in records {
            data.extend_from_slice(self.encode_record(r)?.values());
        }
        Array2::from_shape_vec((records.len(), self.width()), data)
            .map_err(|e| AttritionError::Training(format!("failed to build matrix: {e}")))
    }
}
