//! Quiz composition validation.
//!
//! Everything here is pure: a draft is checked and turned into the record
//! graph it describes before anything reaches the store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::model::{
    Question, QuestionDetail, QuestionDraft, QuestionKind, Quiz, QuizDetail, QuizDraft,
    QuizStatus, UserId,
};
use crate::policy;

/// Maximum length of quiz titles and question texts.
pub const MAX_TEXT_LEN: usize = 255;

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::InvalidTitle("title is empty".into()));
    }
    if title.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::InvalidTitle(format!(
            "title is longer than {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_question_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::InvalidQuestionText("text is empty".into()));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::InvalidQuestionText(format!(
            "text is longer than {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

/// Reject publishing a quiz that has no questions.
pub fn check_publish(status: QuizStatus, question_count: usize) -> Result<(), ValidationError> {
    if status == QuizStatus::Published && question_count == 0 {
        return Err(ValidationError::EmptyQuizOnPublish);
    }
    Ok(())
}

/// Check that `order` is positive and not taken by a sibling question.
pub fn check_question_order(order: u32, sibling_orders: &[u32]) -> Result<(), ValidationError> {
    if order == 0 {
        return Err(ValidationError::InvalidQuestionOrder(
            "question order must be positive".into(),
        ));
    }
    if sibling_orders.contains(&order) {
        return Err(ValidationError::InvalidQuestionOrder(format!(
            "order {order} is already used by another question in this quiz"
        )));
    }
    Ok(())
}

/// Validate a single question draft against the orders its siblings use.
///
/// A draft without an explicit order is checked only against the policy; the
/// caller assigns it a free order.
pub fn validate_question(
    draft: &QuestionDraft,
    sibling_orders: &[u32],
) -> Result<(), ValidationError> {
    validate_question_text(draft.text())?;
    if let Some(order) = draft.order() {
        check_question_order(order, sibling_orders)?;
    }
    policy::validate_answer_set(draft.kind(), draft.answers())
}

/// Question orders after defaulting: an omitted order becomes the 1-based position.
pub fn resolve_question_orders(drafts: &[QuestionDraft]) -> Vec<u32> {
    drafts
        .iter()
        .enumerate()
        .map(|(i, d)| d.order().unwrap_or(i as u32 + 1))
        .collect()
}

/// Next free order after the given siblings.
pub fn next_question_order(sibling_orders: &[u32]) -> u32 {
    sibling_orders.iter().copied().max().unwrap_or(0) + 1
}

/// Validate a whole quiz draft before it may be saved.
pub fn validate_for_save(draft: &QuizDraft) -> Result<(), ValidationError> {
    validate_title(&draft.title)?;
    check_publish(draft.status, draft.questions.len())?;

    let orders = resolve_question_orders(&draft.questions);
    let mut seen: Vec<u32> = Vec::with_capacity(orders.len());
    for (question, order) in draft.questions.iter().zip(&orders) {
        validate_question_text(question.text())?;
        check_question_order(*order, &seen)?;
        policy::validate_answer_set(question.kind(), question.answers())?;
        seen.push(*order);
    }
    Ok(())
}

/// Build the record graph for one new question.
pub fn build_question(
    quiz: Uuid,
    author: &UserId,
    draft: &QuestionDraft,
    order: u32,
) -> QuestionDetail {
    let question = match draft.kind() {
        QuestionKind::TrueFalse => Question::true_false(quiz, author.clone(), draft.text(), order),
        QuestionKind::MultipleChoice => {
            Question::multiple_choice(quiz, author.clone(), draft.text(), order)
        }
    };
    let answers = policy::build_answers(&question, draft);
    QuestionDetail { question, answers }
}

/// Validate a quiz draft and build the full graph: quiz, questions and
/// answers, including synthesized true/false answers.
pub fn build_quiz_graph(
    author: &UserId,
    draft: &QuizDraft,
    slug: String,
    now: DateTime<Utc>,
) -> Result<QuizDetail, ValidationError> {
    validate_for_save(draft)?;

    let quiz = Quiz {
        id: Uuid::new_v4(),
        title: draft.title.trim().to_string(),
        description: draft.description.clone(),
        slug,
        status: draft.status,
        author: author.clone(),
        created: now,
        modified: now,
    };

    let orders = resolve_question_orders(&draft.questions);
    let mut questions: Vec<QuestionDetail> = draft
        .questions
        .iter()
        .zip(orders)
        .map(|(d, order)| build_question(quiz.id, author, d, order))
        .collect();
    questions.sort_by_key(|q| q.question.order);

    Ok(QuizDetail { quiz, questions })
}

/// Derive a URL-safe slug from a title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("quiz");
    }
    slug
}

/// First slug derived from `title` that is not in `taken`: `base`, `base-2`, `base-3`, ...
pub fn unique_slug(title: &str, taken: &HashSet<String>) -> String {
    let base = slugify(title);
    if !taken.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}
