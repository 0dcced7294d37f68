//! Guided, one-question-at-a-time answer collection.

use crate::error::{AttritionError, Result, ValidationError};
use crate::question::{Field, Questionnaire, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Validated answers keyed by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSet {
    values: BTreeMap<Field, Value>,
}

impl AnswerSet {
    /// Validates every question of `questions` against the raw answers given
    /// for it, as a form submission would.
    pub fn from_raw<'a>(
        questions: &Questionnaire,
        raw: impl IntoIterator<Item = (Field, &'a str)>,
    ) -> std::result::Result<Self, ValidationError> {
        let raw: BTreeMap<Field, &str> = raw.into_iter().collect();
        let mut answers = AnswerSet::default();
        for q in questions.iter() {
            let input = raw.get(&q.field).copied().unwrap_or_default();
            let value = q.normalize(input).ok_or_else(|| ValidationError {
                field: q.field,
                message: q.error_message.to_string(),
            })?;
            answers.values.insert(q.field, value);
        }
        Ok(answers)
    }

    pub(crate) fn insert(&mut self, field: Field, value: Value) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values.get(&field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_complete(&self, questions: &Questionnaire) -> bool {
        questions.iter().all(|q| self.values.contains_key(&q.field))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &Value)> {
        self.values.iter().map(|(f, v)| (*f, v))
    }
}

/// Where a session stands. Replaced as a whole on every transition.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorState {
    Collecting { step: usize, answers: AnswerSet },
    Completed { answers: AnswerSet, reported: bool },
}

impl Default for CollectorState {
    fn default() -> Self {
        CollectorState::Collecting {
            step: 0,
            answers: AnswerSet::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectorEvent {
    /// Ask this question next. Also re-emitted for blank input.
    NextQuestion { field: Field, prompt: String },
    /// The answer was rejected; the same question stays current.
    Invalid { field: Field, message: String },
    Completed(AnswerSet),
}

impl CollectorState {
    fn advance(
        &self,
        questions: &Questionnaire,
        raw: &str,
    ) -> Result<(CollectorState, CollectorEvent)> {
        let CollectorState::Collecting { step, answers } = self else {
            return Err(AttritionError::SessionCompleted);
        };
        let question = questions
            .get(*step)
            .ok_or(AttritionError::SessionCompleted)?;

        if raw.trim().is_empty() {
            let event = CollectorEvent::NextQuestion {
                field: question.field,
                prompt: question.prompt.to_string(),
            };
            return Ok((self.clone(), event));
        }

        let Some(value) = question.normalize(raw) else {
            debug!(field = %question.field, "rejected answer");
            let event = CollectorEvent::Invalid {
                field: question.field,
                message: question.error_message.to_string(),
            };
            return Ok((self.clone(), event));
        };

        let mut answers = answers.clone();
        answers.insert(question.field, value);
        let step = step + 1;
        debug!(field = %question.field, step, "accepted answer");

        match questions.get(step) {
            Some(next) => Ok((
                CollectorState::Collecting {
                    step,
                    answers,
                },
                CollectorEvent::NextQuestion {
                    field: next.field,
                    prompt: next.prompt.to_string(),
                },
            )),
            None => Ok((
                CollectorState::Completed {
                    answers: answers.clone(),
                    reported: false,
                },
                CollectorEvent::Completed(answers),
            )),
        }
    }
}

/// One user's collection session over a shared questionnaire.
#[derive(Debug, Clone)]
pub struct Collector {
    questions: Arc<Questionnaire>,
    state: CollectorState,
}

impl Collector {
    pub fn new(questions: Arc<Questionnaire>) -> Self {
        Collector {
            questions,
            state: CollectorState::default(),
        }
    }

    pub fn state(&self) -> &CollectorState {
        &self.state
    }

    /// Prompt for the current question, or `None` once completed.
    pub fn current_prompt(&self) -> Option<&'static str> {
        match self.state {
            CollectorState::Collecting { step, .. } => self.questions.get(step).map(|q| q.prompt),
            CollectorState::Completed { .. } => None,
        }
    }

    pub fn step(&self) -> usize {
        match &self.state {
            CollectorState::Collecting { step, .. } => *step,
            CollectorState::Completed { .. } => self.questions.len(),
        }
    }

    pub fn answers(&self) -> &AnswerSet {
        match &self.state {
            CollectorState::Collecting { answers, .. } => answers,
            CollectorState::Completed { answers, .. } => answers,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, CollectorState::Completed { .. })
    }

    /// Feeds one raw answer to the current question.
    pub fn submit(&mut self, raw: &str) -> Result<CollectorEvent> {
        let (next, event) = self.state.advance(&self.questions, raw)?;
        self.state = next;
        Ok(event)
    }

    /// Back to the first question with no answers.
    pub fn reset(&mut self) {
        debug!("collector reset");
        self.state = CollectorState::default();
    }

    /// Hands out the completed answers exactly once.
    pub(crate) fn claim_answers(&self) -> Result<&AnswerSet> {
        match &self.state {
            CollectorState::Collecting { .. } => Err(AttritionError::NotCompleted),
            CollectorState::Completed { reported: true, .. } => {
                Err(AttritionError::AlreadyReported)
            }
            CollectorState::Completed { answers, .. } => Ok(answers),
        }
    }

    pub(crate) fn mark_reported(&mut self) {
        if let CollectorState::Completed { reported, .. } = &mut self.state {
            *reported = true;
        }
    }

    pub fn is_reported(&self) -> bool {
        matches!(self.state, CollectorState::Completed { reported: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{FieldKind, GENDERS, Question};

    fn age_gender() -> Arc<Questionnaire> {
        Arc::new(
            Questionnaire::new(vec![
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
            ])
            .unwrap(),
        )
    }

    #[test]
    fn age_then_gender_scenario() {
        let mut c = Collector::new(age_gender());

        let ev = c.submit("200").unwrap();
        assert_eq!(
            ev,
            CollectorEvent::Invalid {
                field: Field::Age,
                message: "Enter a whole number between 18 and 65.".into()
            }
        );
        assert_eq!(c.step(), 0);
        assert!(c.answers().is_empty());

        let ev = c.submit("40").unwrap();
        assert_eq!(
            ev,
            CollectorEvent::NextQuestion {
                field: Field::Gender,
                prompt: "Gender? (Male/Female)".into()
            }
        );
        assert_eq!(c.step(), 1);

        let CollectorEvent::Completed(answers) = c.submit("Female").unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(answers.get(Field::Age), Some(&Value::Integer(40)));
        assert_eq!(
            answers.get(Field::Gender),
            Some(&Value::Category("Female".into()))
        );
        assert!(c.is_completed());
    }

    #[test]
    fn blank_input_re_emits_current_prompt() {
        let mut c = Collector::new(age_gender());
        for blank in ["", "   ", "\n"] {
            let ev = c.submit(blank).unwrap();
            assert_eq!(
                ev,
                CollectorEvent::NextQuestion {
                    field: Field::Age,
                    prompt: "Please enter age (18-65)".into()
                }
            );
            assert_eq!(c.state(), &CollectorState::default());
        }
    }

    #[test]
    fn submit_after_completion_is_rejected() {
        let mut c = Collector::new(age_gender());
        c.submit("30").unwrap();
        c.submit("male").unwrap();
        assert!(matches!(
            c.submit("31"),
            Err(AttritionError::SessionCompleted)
        ));
        assert_eq!(c.answers().get(Field::Age), Some(&Value::Integer(30)));
    }

    #[test]
    fn reset_returns_to_first_question() {
        let mut c = Collector::new(age_gender());
        c.submit("30").unwrap();
        c.reset();
        assert_eq!(c.state(), &CollectorState::default());
        assert_eq!(c.current_prompt(), Some("Please enter age (18-65)"));

        c.submit("30").unwrap();
        c.submit("Male").unwrap();
        c.mark_reported();
        c.reset();
        assert_eq!(c.step(), 0);
        assert!(c.answers().is_empty());
        assert!(!c.is_reported());
    }

    #[test]
    fn claim_answers_only_once_completed() {
        let mut c = Collector::new(age_gender());
        assert!(matches!(c.claim_answers(), Err(AttritionError::NotCompleted)));
        c.submit("30").unwrap();
        c.submit("Male").unwrap();
        assert!(c.claim_answers().is_ok());
        c.mark_reported();
        assert!(matches!(
            c.claim_answers(),
            Err(AttritionError::AlreadyReported)
        ));
    }

    #[test]
    fn from_raw_names_the_failing_field() {
        let q = Questionnaire::default_questions();
        let err = AnswerSet::from_raw(
            &q,
            [
                (Field::Age, "30"),
                (Field::Gender, "Male"),
                (Field::Department, "Sales"),
            ],
        )
        .unwrap_err();
        assert_eq!(err.field, Field::Department);
    }
}
