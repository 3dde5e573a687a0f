//! Question type policy.
//!
//! Each question variant constrains its answer set differently. True/false
//! questions own exactly the two synthesized answers "True" and "False";
//! multiple-choice questions own at least two author-supplied answers. Both
//! require exactly one correct answer.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::{Answer, AnswerDraft, Question, QuestionDraft, QuestionKind};

pub const TRUE_LABEL: &str = "True";
pub const FALSE_LABEL: &str = "False";

/// Minimum number of answers on a multiple-choice question.
pub const MIN_CHOICES: usize = 2;

/// Read access to the fields the policy checks, for drafts and stored answers alike.
pub trait AnswerShape {
    fn text(&self) -> &str;
    fn is_correct(&self) -> bool;
    fn order(&self) -> Option<u32>;
}

impl AnswerShape for Answer {
    fn text(&self) -> &str {
        &self.text
    }

    fn is_correct(&self) -> bool {
        self.is_correct
    }

    fn order(&self) -> Option<u32> {
        Some(self.order)
    }
}

impl AnswerShape for AnswerDraft {
    fn text(&self) -> &str {
        &self.text
    }

    fn is_correct(&self) -> bool {
        self.is_correct
    }

    fn order(&self) -> Option<u32> {
        self.order
    }
}

/// Check that `answers` is a legal answer set for a question of `kind`.
///
/// An empty set is accepted for true/false questions, whose answers are
/// synthesized by [`materialize_default_answers`].
pub fn validate_answer_set<A: AnswerShape>(
    kind: QuestionKind,
    answers: &[A],
) -> Result<(), ValidationError> {
    match kind {
        QuestionKind::TrueFalse => {
            if answers.is_empty() {
                return Ok(());
            }
            if answers.len() != 2 {
                return Err(ValidationError::InvalidAnswerSet(format!(
                    "true/false questions have exactly 2 answers, got {}",
                    answers.len()
                )));
            }
            let labels: HashSet<&str> = answers.iter().map(|a| a.text()).collect();
            if !(labels.contains(TRUE_LABEL) && labels.contains(FALSE_LABEL)) {
                return Err(ValidationError::InvalidAnswerSet(
                    "true/false answers must be 'True' and 'False'".into(),
                ));
            }
        }
        QuestionKind::MultipleChoice => {
            if answers.len() < MIN_CHOICES {
                return Err(ValidationError::InvalidAnswerSet(format!(
                    "multiple choice questions must have at least {MIN_CHOICES} answers, got {}",
                    answers.len()
                )));
            }
        }
    }

    let correct = answers.iter().filter(|a| a.is_correct()).count();
    if correct != 1 {
        return Err(ValidationError::InvalidAnswerSet(format!(
            "exactly one answer must be marked correct, got {correct}"
        )));
    }

    if let Some(empty) = answers.iter().position(|a| a.text().trim().is_empty()) {
        return Err(ValidationError::InvalidAnswerSet(format!(
            "answer #{} has empty text",
            empty + 1
        )));
    }

    let mut seen = HashSet::new();
    for order in resolve_answer_orders(answers) {
        if !seen.insert(order) {
            return Err(ValidationError::InvalidAnswerSet(format!(
                "answer order {order} is used more than once"
            )));
        }
    }

    Ok(())
}

/// Answer orders after defaulting: an omitted order becomes the 0-based position.
pub fn resolve_answer_orders<A: AnswerShape>(answers: &[A]) -> Vec<u32> {
    answers
        .iter()
        .enumerate()
        .map(|(i, a)| a.order().unwrap_or(i as u32))
        .collect()
}

/// Synthesize the "True" (order 0) and "False" (order 1) answers of a new
/// true/false question.
///
/// Returns nothing for multiple-choice questions and for a true/false
/// question that already has answers.
pub fn materialize_default_answers(
    question: &Question,
    correct_answer: bool,
    existing: &[Answer],
) -> Vec<Answer> {
    if question.kind != QuestionKind::TrueFalse || !existing.is_empty() {
        return Vec::new();
    }
    vec![
        Answer::new(question.id, TRUE_LABEL, correct_answer, 0),
        Answer::new(question.id, FALSE_LABEL, !correct_answer, 1),
    ]
}

/// Build the answers a freshly created question owns.
pub fn build_answers(question: &Question, draft: &QuestionDraft) -> Vec<Answer> {
    match draft {
        QuestionDraft::TrueFalse { correct_answer, .. } => {
            materialize_default_answers(question, *correct_answer, &[])
        }
        QuestionDraft::MultipleChoice { answers, .. } => {
            let orders = resolve_answer_orders(answers);
            answers
                .iter()
                .zip(orders)
                .map(|(a, order)| Answer::new(question.id, a.text.clone(), a.is_correct, order))
                .collect()
        }
    }
}

/// Whether a selected answer scores. Correctness is fixed when the answer is authored.
pub fn is_selection_correct(answer: &Answer) -> bool {
    answer.is_correct
}

/// Whether authors may add or remove answers after creation.
pub fn answers_are_fixed(kind: QuestionKind) -> bool {
    kind == QuestionKind::TrueFalse
}
