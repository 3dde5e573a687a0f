//! Persistence collaborator trait.
//!
//! Implemented by `quizforge-store`. Every method is one atomic unit: a
//! multi-entity write either lands completely or not at all.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    Answer, Question, QuestionAttempt, QuestionDetail, Quiz, QuizAttempt, QuizDetail, UserId,
};

// ---------------------------------------------------------------------------
// Quiz store trait
// ---------------------------------------------------------------------------

/// Storage backend for quizzes, questions, answers and attempts.
///
/// List methods return rows in their canonical order: questions and answers
/// by `order`, quizzes and attempts newest first.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Human-readable backend name (e.g. "memory").
    fn name(&self) -> &str;

    // -- quizzes ------------------------------------------------------------

    /// Insert a quiz with all its questions and answers.
    ///
    /// Fails with `SlugTaken` if another quiz already uses the slug.
    async fn insert_quiz_graph(&self, graph: &QuizDetail) -> Result<(), StoreError>;

    async fn quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError>;

    async fn quiz_by_slug(&self, slug: &str) -> Result<Option<Quiz>, StoreError>;

    async fn quizzes(&self) -> Result<Vec<Quiz>, StoreError>;

    async fn quizzes_by_author(&self, author: &UserId) -> Result<Vec<Quiz>, StoreError>;

    /// Fails with `EmptyPublishedQuiz` when `quiz` is published but has no
    /// questions at the time of the write.
    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StoreError>;

    /// Delete a quiz with its questions, answers and attempts.
    async fn delete_quiz(&self, id: Uuid) -> Result<bool, StoreError>;

    // -- questions ----------------------------------------------------------

    /// Insert a question together with its answers.
    async fn insert_question(&self, question: &QuestionDetail) -> Result<(), StoreError>;

    async fn question(&self, id: Uuid) -> Result<Option<Question>, StoreError>;

    async fn questions_for_quiz(&self, quiz: Uuid) -> Result<Vec<Question>, StoreError>;

    async fn update_question(&self, question: &Question) -> Result<(), StoreError>;

    /// Delete a question with its answers and the submissions made against it.
    ///
    /// Fails with `EmptyPublishedQuiz` if it is the last question of a
    /// published quiz.
    async fn delete_question(&self, id: Uuid) -> Result<bool, StoreError>;

    // -- answers ------------------------------------------------------------

    async fn answer(&self, id: Uuid) -> Result<Option<Answer>, StoreError>;

    async fn answers_for_question(&self, question: Uuid) -> Result<Vec<Answer>, StoreError>;

    /// Replace the whole answer set of a question.
    ///
    /// Answers missing from `answers` are deleted with the submissions that
    /// selected them.
    async fn replace_answers(&self, question: Uuid, answers: &[Answer]) -> Result<(), StoreError>;

    // -- attempts -----------------------------------------------------------

    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError>;

    async fn attempt(&self, id: Uuid) -> Result<Option<QuizAttempt>, StoreError>;

    async fn attempts_for_user(&self, user: &UserId) -> Result<Vec<QuizAttempt>, StoreError>;

    async fn update_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError>;

    /// Delete an attempt with its question attempts.
    async fn delete_attempt(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn question_attempts(&self, attempt: Uuid) -> Result<Vec<QuestionAttempt>, StoreError>;

    /// Record a submission and bump the stored attempt's score if it is
    /// correct. Returns the attempt as it stands after the write.
    ///
    /// Fails with `Missing` if the attempt, question or selected answer no
    /// longer exists, and with `Conflict` if the (attempt, question) pair is
    /// already recorded.
    async fn commit_submission(
        &self,
        submission: &QuestionAttempt,
    ) -> Result<QuizAttempt, StoreError>;
}
