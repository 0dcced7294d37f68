//! Questions asked of the user, one per employee attribute.
//!
//! Each question carries a [`FieldKind`] that both validates raw text and
//! normalizes it into a typed [`Value`], so the collector never deals with
//! ad hoc predicates.

use crate::error::{AttritionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Employee attribute, named after its dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Age,
    Gender,
    Department,
    Education,
    YearsAtCompany,
    JobSatisfaction,
    MonthlyIncome,
}

impl Field {
    /// All fields in dataset column order.
    pub const ALL: [Field; 7] = [
        Field::Age,
        Field::Gender,
        Field::Department,
        Field::Education,
        Field::YearsAtCompany,
        Field::JobSatisfaction,
        Field::MonthlyIncome,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Age => "Age",
            Field::Gender => "Gender",
            Field::Department => "Department",
            Field::Education => "Education",
            Field::YearsAtCompany => "YearsAtCompany",
            Field::JobSatisfaction => "JobSatisfaction",
            Field::MonthlyIncome => "MonthlyIncome",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name.trim())
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, Field::Gender | Field::Department | Field::Education)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated, normalized answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Category(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            Value::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Value::Category(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Category(s) => f.write_str(s),
        }
    }
}

/// How a question's raw input is checked and converted.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    IntegerRange { min: i64, max: i64 },
    Categorical { choices: &'static [&'static str] },
    Decimal,
}

impl FieldKind {
    pub fn validate(&self, raw: &str) -> bool {
        self.normalize(raw).is_some()
    }

    /// Returns `None` when `raw` does not pass validation.
    pub fn normalize(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        match self {
            FieldKind::IntegerRange { min, max } => {
                if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let n: i64 = raw.parse().ok()?;
                (*min..=*max).contains(&n).then_some(Value::Integer(n))
            }
            FieldKind::Categorical { choices } => choices
                .iter()
                .find(|c| c.eq_ignore_ascii_case(raw))
                .map(|c| Value::Category((*c).to_string())),
            FieldKind::Decimal => {
                let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '_').collect();
                let digits = cleaned.chars().filter(char::is_ascii_digit).count();
                let dots = cleaned.chars().filter(|c| *c == '.').count();
                if digits == 0 || dots > 1 || digits + dots != cleaned.len() {
                    return None;
                }
                cleaned
                    .parse::<f64>()
                    .ok()
                    .filter(|x| x.is_finite())
                    .map(Value::Float)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub field: Field,
    pub prompt: &'static str,
    pub kind: FieldKind,
    pub error_message: &'static str,
}

impl Question {
    pub fn validate(&self, raw: &str) -> bool {
        self.kind.validate(raw)
    }

    pub fn normalize(&self, raw: &str) -> Option<Value> {
        self.kind.normalize(raw)
    }
}

pub const GENDERS: &[&str] = &["Male", "Female"];
pub const DEPARTMENTS: &[&str] = &["IT", "HR", "Finance"];
pub const EDUCATION_LEVELS: &[&str] = &["Graduate", "Masters", "PhD"];

/// Ordered, duplicate-free sequence of questions.
#[derive(Debug, Clone, PartialEq)]
pub struct Questionnaire {
    questions: Vec<Question>,
}

impl Questionnaire {
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        if questions.is_empty() {
            return Err(AttritionError::Questionnaire("no questions".into()));
        }
        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.field) {
                return Err(AttritionError::Questionnaire(format!(
                    "{} is asked more than once",
                    q.field
                )));
            }
        }
        Ok(Questionnaire { questions })
    }

    /// The full employee questionnaire used by the chat and the form.
    pub fn default_questions() -> Self {
        Questionnaire {
            questions: vec![
                Question {
                    field: Field::Age,
                    prompt: "Please enter age (18-65)",
                    kind: FieldKind::IntegerRange { min: 18, max: 65 },
                    error_message: "Enter a whole number between 18 and 65.",
                },
                Question {
                    field: Field::Gender,
                    prompt: "Gender? (Male/Female)",
                    kind: FieldKind::Categorical { choices: GENDERS },
                    error_message: "Type Male or Female.",
                },
                Question {
                    field: Field::Department,
                    prompt: "Department? (IT/HR/Finance)",
                    kind: FieldKind::Categorical { choices: DEPARTMENTS },
                    error_message: "Choose one: IT, HR, Finance.",
                },
                Question {
                    field: Field::Education,
                    prompt: "Education level? (Graduate/Masters/PhD)",
                    kind: FieldKind::Categorical {
                        choices: EDUCATION_LEVELS,
                    },
                    error_message: "Choose one: Graduate, Masters, PhD.",
                },
                Question {
                    field: Field::YearsAtCompany,
                    prompt: "Years at company? (0-40)",
                    kind: FieldKind::IntegerRange { min: 0, max: 40 },
                    error_message: "Enter a whole number between 0 and 40.",
                },
                Question {
                    field: Field::JobSatisfaction,
                    prompt: "Job satisfaction (1-5)",
                    kind: FieldKind::IntegerRange { min: 1, max: 5 },
                    error_message: "Enter a whole number between 1 and 5.",
                },
                Question {
                    field: Field::MonthlyIncome,
                    prompt: "Monthly income?",
                    kind: FieldKind::Decimal,
                    error_message: "Enter a numeric value (e.g., 45000).",
                },
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, step: usize) -> Option<&Question> {
        self.questions.get(step)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}
