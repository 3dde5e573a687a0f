//! Error types for quiz authoring and attempt scoring.
//!
//! Every failure here is per-request: a returned error means nothing was
//! written. `StoreError` is defined in core so the services can classify
//! persistence failures without string matching.

use thiserror::Error;
use uuid::Uuid;

/// A structural rule that a quiz, question or answer set violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The answers do not fit the question type.
    #[error("invalid answer set: {0}")]
    InvalidAnswerSet(String),

    /// The question order is zero or collides with a sibling question.
    #[error("invalid question order: {0}")]
    InvalidQuestionOrder(String),

    /// A quiz cannot be published without questions.
    #[error("quizzes must have at least one question before publishing")]
    EmptyQuizOnPublish,

    #[error("invalid title: {0}")]
    InvalidTitle(String),

    #[error("invalid question text: {0}")]
    InvalidQuestionText(String),

    /// The author already owns a quiz with this title.
    #[error("a quiz titled '{0}' already exists for this author")]
    DuplicateTitle(String),

    /// The selected answer belongs to a different question.
    #[error("selected answer does not belong to the submitted question")]
    AnswerQuestionMismatch,

    /// The question belongs to a different quiz than the attempt.
    #[error("question does not belong to the attempted quiz")]
    QuestionQuizMismatch,
}

/// Errors returned by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (slug, submission pair, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The quiz slug is already used by another quiz.
    #[error("slug '{0}' is taken")]
    SlugTaken(String),

    /// An update or delete referenced a row that does not exist.
    #[error("missing record: {0}")]
    Missing(String),

    /// The write would leave a published quiz without questions.
    #[error("published quiz {0} must keep at least one question")]
    EmptyPublishedQuiz(Uuid),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the quiz and attempt services.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    #[error("question not found: {0}")]
    QuestionNotFound(Uuid),

    #[error("answer not found: {0}")]
    AnswerNotFound(Uuid),

    #[error("quiz attempt not found: {0}")]
    AttemptNotFound(Uuid),

    /// The actor does not own the entity it tried to mutate.
    #[error("forbidden: {actor} may not modify this {entity}")]
    Forbidden { actor: String, entity: &'static str },

    /// The question was already answered within this attempt.
    #[error("question {question} was already answered in attempt {attempt}")]
    DuplicateSubmission { attempt: Uuid, question: Uuid },

    /// The attempt is completed and accepts no further submissions.
    #[error("quiz attempt {0} is already completed")]
    AttemptCompleted(Uuid),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for QuizError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyPublishedQuiz(_) => ValidationError::EmptyQuizOnPublish.into(),
            other => QuizError::Store(other),
        }
    }
}

impl QuizError {
    /// Returns `true` for lookup failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QuizError::QuizNotFound(_)
                | QuizError::QuestionNotFound(_)
                | QuizError::AnswerNotFound(_)
                | QuizError::AttemptNotFound(_)
        )
    }

    /// Returns `true` if the request broke a structural rule.
    pub fn is_validation(&self) -> bool {
        matches!(self, QuizError::Validation(_))
    }

    /// Returns `true` if the request was rejected by the authorization guard.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, QuizError::Forbidden { .. })
    }
}
