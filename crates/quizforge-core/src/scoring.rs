//! Attempt scoring engine.
//!
//! Records a taker's attempts and per-question selections and keeps the
//! running score. Submissions for one attempt are serialized through a
//! per-attempt lock, and the store applies each score increment to its own
//! row, so concurrent submissions and cascading deletes never lose an
//! update. Different attempts never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::auth::ensure_can_mutate;
use crate::error::{QuizError, StoreError, ValidationError};
use crate::model::{AttemptDetail, QuestionAttempt, QuizAttempt, Submission, UserId};
use crate::policy;
use crate::traits::QuizStore;

/// Taker-side operations on quiz attempts.
pub struct AttemptEngine {
    store: Arc<dyn QuizStore>,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl AttemptEngine {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Start a fresh attempt with an unset score.
    pub async fn start_attempt(
        &self,
        actor: &UserId,
        quiz_id: Uuid,
    ) -> Result<QuizAttempt, QuizError> {
        let quiz = self
            .store
            .quiz(quiz_id)
            .await?
            .ok_or_else(|| QuizError::QuizNotFound(quiz_id.to_string()))?;

        let attempt = QuizAttempt::new(actor.clone(), quiz.id);
        self.store.insert_attempt(&attempt).await?;
        tracing::info!(attempt = %attempt.id, quiz = %quiz.slug, user = %actor, "attempt started");
        Ok(attempt)
    }

    /// Record one selection and update the attempt's score.
    ///
    /// Each question may be answered at most once per attempt; a repeat is
    /// rejected with `DuplicateSubmission` and changes nothing.
    pub async fn submit_answer(
        &self,
        actor: &UserId,
        submission: &Submission,
    ) -> Result<QuestionAttempt, QuizError> {
        let attempt = self.attempt(submission.attempt).await?;
        ensure_can_mutate(actor, &attempt)?;

        let lock = self.lock_for(attempt.id);
        let result = {
            let _guard = lock.lock().await;
            self.record_submission(submission).await
        };
        self.release_lock(attempt.id, lock);
        result
    }

    async fn record_submission(
        &self,
        submission: &Submission,
    ) -> Result<QuestionAttempt, QuizError> {
        // Re-read under the lock: a concurrent call may have completed it.
        let attempt = self.attempt(submission.attempt).await?;
        if attempt.is_completed() {
            return Err(QuizError::AttemptCompleted(attempt.id));
        }

        let question = self
            .store
            .question(submission.question)
            .await?
            .ok_or(QuizError::QuestionNotFound(submission.question))?;
        if question.quiz != attempt.quiz {
            return Err(ValidationError::QuestionQuizMismatch.into());
        }

        let answer = self
            .store
            .answer(submission.answer)
            .await?
            .ok_or(QuizError::AnswerNotFound(submission.answer))?;
        if answer.question != question.id {
            return Err(ValidationError::AnswerQuestionMismatch.into());
        }

        let already_answered = self
            .store
            .question_attempts(attempt.id)
            .await?
            .iter()
            .any(|qa| qa.question == question.id);
        if already_answered {
            return Err(QuizError::DuplicateSubmission {
                attempt: attempt.id,
                question: question.id,
            });
        }

        let record = QuestionAttempt {
            id: Uuid::new_v4(),
            quiz_attempt: attempt.id,
            question: question.id,
            answer_selected: answer.id,
            is_correct: policy::is_selection_correct(&answer),
            time_taken: submission.time_taken,
            created: Utc::now(),
        };

        let attempt = match self.store.commit_submission(&record).await {
            Ok(attempt) => attempt,
            Err(StoreError::Conflict(_)) => {
                return Err(QuizError::DuplicateSubmission {
                    attempt: attempt.id,
                    question: question.id,
                })
            }
            Err(StoreError::Missing(_)) => return Err(self.vanished(&record).await),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            attempt = %attempt.id,
            question = %question.id,
            correct = record.is_correct,
            score = attempt.score_value(),
            "answer recorded"
        );
        Ok(record)
    }

    /// Name the row that disappeared between validation and commit.
    async fn vanished(&self, record: &QuestionAttempt) -> QuizError {
        tracing::debug!(attempt = %record.quiz_attempt, "submission target deleted concurrently");
        if !matches!(self.store.attempt(record.quiz_attempt).await, Ok(Some(_))) {
            QuizError::AttemptNotFound(record.quiz_attempt)
        } else if !matches!(self.store.question(record.question).await, Ok(Some(_))) {
            QuizError::QuestionNotFound(record.question)
        } else {
            QuizError::AnswerNotFound(record.answer_selected)
        }
    }

    /// Mark an attempt completed. No submissions are accepted afterwards.
    pub async fn complete_attempt(
        &self,
        actor: &UserId,
        attempt_id: Uuid,
    ) -> Result<QuizAttempt, QuizError> {
        let attempt = self.attempt(attempt_id).await?;
        ensure_can_mutate(actor, &attempt)?;

        let lock = self.lock_for(attempt.id);
        let result = {
            let _guard = lock.lock().await;
            self.mark_completed(attempt_id).await
        };
        self.release_lock(attempt.id, lock);
        let attempt = result?;

        tracing::info!(
            attempt = %attempt.id,
            user = %attempt.user,
            score = attempt.score_value(),
            "attempt completed"
        );
        Ok(attempt)
    }

    async fn mark_completed(&self, attempt_id: Uuid) -> Result<QuizAttempt, QuizError> {
        let mut attempt = self.attempt(attempt_id).await?;
        if attempt.is_completed() {
            return Err(QuizError::AttemptCompleted(attempt.id));
        }
        let now = Utc::now();
        attempt.completed = Some(now);
        attempt.modified = now;
        self.store.update_attempt(&attempt).await?;
        Ok(attempt)
    }

    /// An attempt with its submissions. Only its owner may retrieve it.
    pub async fn get_attempt(
        &self,
        actor: &UserId,
        attempt_id: Uuid,
    ) -> Result<AttemptDetail, QuizError> {
        let attempt = self.attempt(attempt_id).await?;
        ensure_can_mutate(actor, &attempt)?;
        let question_attempts = self.store.question_attempts(attempt.id).await?;
        Ok(AttemptDetail {
            attempt,
            question_attempts,
        })
    }

    /// The actor's own attempts, newest first.
    pub async fn list_attempts(&self, actor: &UserId) -> Result<Vec<AttemptDetail>, QuizError> {
        let mut out = Vec::new();
        for attempt in self.store.attempts_for_user(actor).await? {
            let question_attempts = self.store.question_attempts(attempt.id).await?;
            out.push(AttemptDetail {
                attempt,
                question_attempts,
            });
        }
        Ok(out)
    }

    pub async fn delete_attempt(&self, actor: &UserId, attempt_id: Uuid) -> Result<(), QuizError> {
        let attempt = self.attempt(attempt_id).await?;
        ensure_can_mutate(actor, &attempt)?;

        let lock = self.lock_for(attempt.id);
        let result = {
            let _guard = lock.lock().await;
            self.store.delete_attempt(attempt.id).await
        };
        self.release_lock(attempt.id, lock);
        result?;
        tracing::info!(attempt = %attempt.id, "attempt deleted");
        Ok(())
    }

    /// Number of attempts that currently have a submission lock.
    pub fn active_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn attempt(&self, id: Uuid) -> Result<QuizAttempt, QuizError> {
        self.store
            .attempt(id)
            .await?
            .ok_or(QuizError::AttemptNotFound(id))
    }

    fn lock_for(&self, attempt: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(attempt).or_default())
    }

    /// Drop the map entry once no other caller holds or waits on `lock`.
    fn release_lock(&self, attempt: Uuid, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the map and one is `lock`; clones are only
        // handed out under this mutex, so the count cannot grow meanwhile.
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(&attempt);
        }
    }
}
