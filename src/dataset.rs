//! Employee records: CSV loading, cleaning and train/test splitting.

use crate::classifier::Outcome;
use crate::collector::AnswerSet;
use crate::error::{AttritionError, Result};
use crate::question::{Field, Value};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// A CSV row as written, before cleaning.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Age")]
    age: Option<String>,
    #[serde(rename = "Gender")]
    gender: Option<String>,
    #[serde(rename = "Department")]
    department: Option<String>,
    #[serde(rename = "Education")]
    education: Option<String>,
    #[serde(rename = "YearsAtCompany")]
    years_at_company: Option<String>,
    #[serde(rename = "JobSatisfaction")]
    job_satisfaction: Option<String>,
    #[serde(rename = "MonthlyIncome")]
    monthly_income: Option<String>,
    #[serde(rename = "Attrition")]
    attrition: Option<String>,
}

/// A cleaned, fully typed employee row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub age: f64,
    pub gender: String,
    pub department: String,
    pub education: String,
    pub years_at_company: f64,
    pub job_satisfaction: f64,
    pub monthly_income: f64,
    pub attrition: Outcome,
}

impl EmployeeRecord {
    pub fn value(&self, field: Field) -> Value {
        match field {
            Field::Age => Value::Float(self.age),
            Field::Gender => Value::Category(self.gender.clone()),
            Field::Department => Value::Category(self.department.clone()),
            Field::Education => Value::Category(self.education.clone()),
            Field::YearsAtCompany => Value::Float(self.years_at_company),
            Field::JobSatisfaction => Value::Float(self.job_satisfaction),
            Field::MonthlyIncome => Value::Float(self.monthly_income),
        }
    }

    pub(crate) fn to_answers(&self) -> AnswerSet {
        let mut answers = AnswerSet::default();
        for field in Field::ALL {
            answers.insert(field, self.value(field));
        }
        answers
    }
}

/// "  yes " -> "Yes", "phd" -> "Phd".
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn text(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn number(v: Option<String>) -> Option<f64> {
    text(v)?.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Outcome of cleaning a raw row. Rows with gaps are dropped quietly, bad
/// labels are collected and reported.
enum Cleaned {
    Kept(EmployeeRecord),
    Dropped,
    BadLabel(String),
}

fn clean(raw: RawRecord) -> Cleaned {
    let Some(label) = text(raw.attrition) else {
        return Cleaned::Dropped;
    };
    let (
        Some(age),
        Some(gender),
        Some(department),
        Some(education),
        Some(years_at_company),
        Some(job_satisfaction),
        Some(monthly_income),
    ) = (
        number(raw.age),
        text(raw.gender),
        text(raw.department),
        text(raw.education),
        number(raw.years_at_company),
        number(raw.job_satisfaction),
        number(raw.monthly_income),
    )
    else {
        return Cleaned::Dropped;
    };

    let attrition = match title_case(&label).as_str() {
        "Yes" => Outcome::Leave,
        "No" => Outcome::Stay,
        _ => return Cleaned::BadLabel(label),
    };

    Cleaned::Kept(EmployeeRecord {
        age,
        gender,
        department,
        education,
        years_at_company,
        job_satisfaction,
        monthly_income,
        attrition,
    })
}

/// Reads and cleans employee records from any CSV source with a header row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<EmployeeRecord>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = vec![];
    let mut bad_labels = vec![];
    let mut dropped = 0usize;

    for (line, result) in rdr.deserialize::<RawRecord>().enumerate() {
        match clean(result?) {
            Cleaned::Kept(r) => records.push(r),
            Cleaned::Dropped => {
                debug!(row = line + 1, "dropping incomplete row");
                dropped += 1;
            }
            Cleaned::BadLabel(label) => {
                if !bad_labels.contains(&label) {
                    bad_labels.push(label);
                }
            }
        }
    }

    if !bad_labels.is_empty() {
        return Err(AttritionError::Dataset(format!(
            "unexpected labels in Attrition: {bad_labels:?}, expected Yes/No"
        )));
    }

    let distribution = class_distribution(&records);
    if distribution.len() < 2 {
        return Err(AttritionError::Dataset(format!(
            "need at least two classes in Attrition, got {distribution:?}"
        )));
    }

    info!(kept = records.len(), dropped, "loaded employee records");
    Ok(records)
}

/// Loads employee data from a CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<EmployeeRecord>> {
    let file = File::open(path)?;
    read_records(file)
}

pub fn class_distribution(records: &[EmployeeRecord]) -> BTreeMap<Outcome, usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry(r.attrition).or_insert(0) += 1;
    }
    counts
}

/// Repeats the rows of each smaller class, cycling through them, until every
/// class has as many rows as the largest one.
pub fn oversample_minority(records: &[EmployeeRecord]) -> Vec<EmployeeRecord> {
    let counts = class_distribution(records);
    let target = counts.values().copied().max().unwrap_or(0);

    let mut balanced = records.to_vec();
    for (&outcome, &count) in &counts {
        let class: Vec<&EmployeeRecord> =
            records.iter().filter(|r| r.attrition == outcome).collect();
        let extra = class.iter().cycle().take(target - count);
        balanced.extend(extra.map(|r| (*r).clone()));
    }
    debug!(before = records.len(), after = balanced.len(), "oversampled minority class");
    balanced
}

/// A helper type for holding train/test splits.
#[derive(Debug)]
pub struct DatasetSplit {
    pub train: Vec<EmployeeRecord>,
    pub test: Vec<EmployeeRecord>,
}

/// Splits each class separately so both sides keep the label ratio.
/// The same `seed` always yields the same split.
pub fn train_test_split(data: &[EmployeeRecord], test_ratio: f64, seed: u64) -> DatasetSplit {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = vec![];
    let mut test = vec![];

    for outcome in [Outcome::Stay, Outcome::Leave] {
        let mut class: Vec<EmployeeRecord> = data
            .iter()
            .filter(|r| r.attrition == outcome)
            .cloned()
            .collect();
        class.shuffle(&mut rng);

        let test_size = ((class.len() as f64) * test_ratio).round() as usize;
        let rest = class.split_off(test_size.min(class.len()));
        test.extend(class);
        train.extend(rest);
    }

    DatasetSplit { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Age,Gender,Department,Education,YearsAtCompany,JobSatisfaction,MonthlyIncome,Attrition
25,Male,IT,Graduate,1,2,30000,Yes
40,Female,HR,Masters,10,4,55000,no
33,Female,Finance,PhD,,3,48000,No
abc,Male,IT,Graduate,2,1,25000,Yes
51,Male,Finance,Masters,20,5,90000, NO
";

    #[test]
    fn drops_incomplete_rows_and_normalizes_labels() {
        let records = read_records(CSV.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].attrition, Outcome::Leave);
        assert_eq!(records[1].attrition, Outcome::Stay);
        assert_eq!(records[2].attrition, Outcome::Stay);
        assert_eq!(records[2].monthly_income, 90000.0);
    }

    #[test]
    fn unexpected_labels_are_rejected() {
        let csv = "\
Age,Gender,Department,Education,YearsAtCompany,JobSatisfaction,MonthlyIncome,Attrition
25,Male,IT,Graduate,1,2,30000,Maybe
40,Female,HR,Masters,10,4,55000,No
";
        let err = read_records(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Maybe"), "{err}");
    }

    #[test]
    fn single_class_is_rejected() {
        let csv = "\
Age,Gender,Department,Education,YearsAtCompany,JobSatisfaction,MonthlyIncome,Attrition
25,Male,IT,Graduate,1,2,30000,No
40,Female,HR,Masters,10,4,55000,No
";
        assert!(matches!(
            read_records(csv.as_bytes()),
            Err(AttritionError::Dataset(_))
        ));
    }

    #[test]
    fn split_is_stratified_and_seeded() {
        let base = read_records(CSV.as_bytes()).unwrap();
        let data: Vec<EmployeeRecord> = base.iter().cycle().take(30).cloned().collect();

        let a = train_test_split(&data, 0.3, 42);
        let b = train_test_split(&data, 0.3, 42);
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
        assert_eq!(a.train.len() + a.test.len(), 30);

        let test_counts = class_distribution(&a.test);
        assert_eq!(test_counts[&Outcome::Leave], 3);
        assert_eq!(test_counts[&Outcome::Stay], 6);
    }

    #[test]
    fn oversampling_evens_out_the_classes() {
        let base = read_records(CSV.as_bytes()).unwrap();
        let mut data = base.clone();
        data.extend(base.iter().filter(|r| r.attrition == Outcome::Stay).cloned());
        assert_eq!(class_distribution(&data)[&Outcome::Stay], 4);
        assert_eq!(class_distribution(&data)[&Outcome::Leave], 1);

        let balanced = oversample_minority(&data);
        let counts = class_distribution(&balanced);
        assert_eq!(counts[&Outcome::Stay], 4);
        assert_eq!(counts[&Outcome::Leave], 4);
        assert_eq!(&balanced[..data.len()], &data[..]);
        assert!(oversample_minority(&[]).is_empty());
    }

    #[test]
    fn title_case_matches_label_cleaning() {
        assert_eq!(title_case("  yes "), "Yes");
        assert_eq!(title_case("NO"), "No");
        assert_eq!(title_case("phd"), "Phd");
    }
}
