//! Core data model types for quizforge.
//!
//! Persisted entities (`Quiz`, `Question`, `Answer`, `QuizAttempt`,
//! `QuestionAttempt`), the drafts authors submit, and the nested read
//! shapes returned to callers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable user reference supplied by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

/// Publication state of a quiz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    #[default]
    Draft,
    Published,
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizStatus::Draft => write!(f, "draft"),
            QuizStatus::Published => write!(f, "published"),
        }
    }
}

impl FromStr for QuizStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(QuizStatus::Draft),
            "published" | "publish" => Ok(QuizStatus::Published),
            other => Err(format!("unknown quiz status: {other}")),
        }
    }
}

/// A persisted quiz header. Questions are stored separately and owned by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Derived from the title at creation and never changed afterwards.
    pub slug: String,
    pub status: QuizStatus,
    pub author: UserId,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Quiz {
    pub fn is_published(&self) -> bool {
        self.status == QuizStatus::Published
    }
}

// ---------------------------------------------------------------------------
// Questions and answers
// ---------------------------------------------------------------------------

/// Discriminator for the two supported question variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    TrueFalse,
    MultipleChoice,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::TrueFalse => write!(f, "true_false"),
            QuestionKind::MultipleChoice => write!(f, "multiple_choice"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "true_false" | "truefalse" | "tf" | "boolean" => Ok(QuestionKind::TrueFalse),
            "multiple_choice" | "multiplechoice" | "mc" | "choice" => {
                Ok(QuestionKind::MultipleChoice)
            }
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// A persisted question. Variant-specific rules live in [`crate::policy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub quiz: Uuid,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub text: String,
    /// Positive and unique within the owning quiz.
    pub order: u32,
    pub author: UserId,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Question {
    /// New true/false question. Its answers come from
    /// [`crate::policy::materialize_default_answers`].
    pub fn true_false(quiz: Uuid, author: UserId, text: impl Into<String>, order: u32) -> Self {
        Self::with_kind(QuestionKind::TrueFalse, quiz, author, text.into(), order)
    }

    /// New multiple-choice question. Answers are supplied by the author.
    pub fn multiple_choice(
        quiz: Uuid,
        author: UserId,
        text: impl Into<String>,
        order: u32,
    ) -> Self {
        Self::with_kind(QuestionKind::MultipleChoice, quiz, author, text.into(), order)
    }

    fn with_kind(kind: QuestionKind, quiz: Uuid, author: UserId, text: String, order: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            quiz,
            kind,
            text,
            order,
            author,
            created: now,
            modified: now,
        }
    }
}

/// One selectable option of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub question: Uuid,
    pub text: String,
    pub is_correct: bool,
    /// Unique within the owning question.
    pub order: u32,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Answer {
    pub fn new(question: Uuid, text: impl Into<String>, is_correct: bool, order: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            question,
            text: text.into(),
            is_correct,
            order,
            created: now,
            modified: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Attempts
// ---------------------------------------------------------------------------

/// Lifecycle of a quiz attempt. There is no way back from `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    InProgress,
    Completed,
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::InProgress => write!(f, "in_progress"),
            AttemptState::Completed => write!(f, "completed"),
        }
    }
}

/// One taker's run through a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user: UserId,
    pub quiz: Uuid,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
    /// Unset until the first correct submission.
    #[serde(default)]
    pub score: Option<u32>,
}

impl QuizAttempt {
    pub fn new(user: UserId, quiz: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user,
            quiz,
            created: now,
            modified: now,
            completed: None,
            score: None,
        }
    }

    pub fn state(&self) -> AttemptState {
        if self.completed.is_some() {
            AttemptState::Completed
        } else {
            AttemptState::InProgress
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    /// Score with an unset value read as zero.
    pub fn score_value(&self) -> u32 {
        self.score.unwrap_or(0)
    }
}

/// One scored selection within an attempt. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAttempt {
    pub id: Uuid,
    pub quiz_attempt: Uuid,
    pub question: Uuid,
    pub answer_selected: Uuid,
    /// Copied from the selected answer when the submission is recorded.
    pub is_correct: bool,
    #[serde(default)]
    pub time_taken: Option<Duration>,
    pub created: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// A quiz as submitted by its author, with nested questions and answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: QuizStatus,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

/// A question as submitted by its author, tagged by question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionDraft {
    TrueFalse {
        text: String,
        #[serde(default)]
        order: Option<u32>,
        /// Which side is correct; the answers themselves are synthesized.
        correct_answer: bool,
    },
    MultipleChoice {
        text: String,
        #[serde(default)]
        order: Option<u32>,
        answers: Vec<AnswerDraft>,
    },
}

impl QuestionDraft {
    pub fn true_false(text: impl Into<String>, correct_answer: bool) -> Self {
        QuestionDraft::TrueFalse {
            text: text.into(),
            order: None,
            correct_answer,
        }
    }

    pub fn multiple_choice(text: impl Into<String>, answers: Vec<AnswerDraft>) -> Self {
        QuestionDraft::MultipleChoice {
            text: text.into(),
            order: None,
            answers,
        }
    }

    pub fn with_order(mut self, value: u32) -> Self {
        match &mut self {
            QuestionDraft::TrueFalse { order, .. } | QuestionDraft::MultipleChoice { order, .. } => {
                *order = Some(value)
            }
        }
        self
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionDraft::TrueFalse { .. } => QuestionKind::TrueFalse,
            QuestionDraft::MultipleChoice { .. } => QuestionKind::MultipleChoice,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            QuestionDraft::TrueFalse { text, .. } | QuestionDraft::MultipleChoice { text, .. } => {
                text
            }
        }
    }

    pub fn order(&self) -> Option<u32> {
        match self {
            QuestionDraft::TrueFalse { order, .. } | QuestionDraft::MultipleChoice { order, .. } => {
                *order
            }
        }
    }

    /// Caller-supplied answers; always empty for true/false drafts.
    pub fn answers(&self) -> &[AnswerDraft] {
        match self {
            QuestionDraft::TrueFalse { .. } => &[],
            QuestionDraft::MultipleChoice { answers, .. } => answers,
        }
    }
}

/// An answer as submitted by its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDraft {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub order: Option<u32>,
}

impl AnswerDraft {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
            order: None,
        }
    }
}

/// Partial update of a quiz header. The slug is not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<QuizStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionPatch {
    pub text: Option<String>,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerPatch {
    pub text: Option<String>,
    pub is_correct: Option<bool>,
    pub order: Option<u32>,
}

/// A taker's selection for one question of an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub attempt: Uuid,
    pub question: Uuid,
    pub answer: Uuid,
    #[serde(default)]
    pub time_taken: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Nested read shapes
// ---------------------------------------------------------------------------

/// A question with its answers in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}

impl QuestionDetail {
    pub fn correct_answer(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.is_correct)
    }
}

/// A quiz with its questions in order, each with its answers in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionDetail>,
}

impl QuizDetail {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question_by_order(&self, order: u32) -> Option<&QuestionDetail> {
        self.questions.iter().find(|q| q.question.order == order)
    }
}

/// An attempt with the submissions recorded against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub question_attempts: Vec<QuestionAttempt>,
}
