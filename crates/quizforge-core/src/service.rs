//! Quiz authoring service.
//!
//! Every mutating call runs the authorization guard, then validation, and
//! only then touches the store, so a rejected request leaves no trace.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::ensure_can_mutate;
use crate::error::{QuizError, StoreError, ValidationError};
use crate::model::{
    Answer, AnswerDraft, AnswerPatch, Question, QuestionDetail, QuestionDraft, QuestionPatch,
    Quiz, QuizDetail, QuizDraft, QuizPatch, UserId,
};
use crate::policy;
use crate::traits::QuizStore;
use crate::validate;

/// How often `create_quiz` picks a new slug after losing a race for one.
const SLUG_RETRIES: usize = 8;

/// Author-side operations on quizzes, questions and answers.
pub struct QuizService {
    store: Arc<dyn QuizStore>,
}

impl QuizService {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn QuizStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Quizzes
    // -----------------------------------------------------------------------

    /// Create a quiz with its nested questions and answers in one unit.
    pub async fn create_quiz(
        &self,
        actor: &UserId,
        draft: &QuizDraft,
    ) -> Result<QuizDetail, QuizError> {
        validate::validate_for_save(draft)?;
        self.ensure_title_free(actor, &draft.title, None).await?;

        let mut retries = 0;
        let graph = loop {
            let taken: HashSet<String> = self
                .store
                .quizzes()
                .await?
                .into_iter()
                .map(|q| q.slug)
                .collect();
            let slug = validate::unique_slug(&draft.title, &taken);
            let graph = validate::build_quiz_graph(actor, draft, slug, Utc::now())?;

            match self.store.insert_quiz_graph(&graph).await {
                Ok(()) => break graph,
                Err(StoreError::SlugTaken(slug)) if retries < SLUG_RETRIES => {
                    retries += 1;
                    tracing::debug!(%slug, retries, "slug claimed concurrently, picking another");
                }
                Err(e) => return Err(e.into()),
            }
        };
        tracing::info!(
            slug = %graph.quiz.slug,
            status = %graph.quiz.status,
            questions = graph.questions.len(),
            author = %actor,
            "quiz created"
        );
        Ok(graph)
    }

    pub async fn get_quiz(&self, slug: &str) -> Result<QuizDetail, QuizError> {
        let quiz = self.quiz_by_slug(slug).await?;
        self.detail(quiz).await
    }

    pub async fn get_quiz_by_id(&self, id: Uuid) -> Result<QuizDetail, QuizError> {
        let quiz = self
            .store
            .quiz(id)
            .await?
            .ok_or_else(|| QuizError::QuizNotFound(id.to_string()))?;
        self.detail(quiz).await
    }

    /// All quizzes, newest first.
    pub async fn list_quizzes(&self) -> Result<Vec<QuizDetail>, QuizError> {
        let mut out = Vec::new();
        for quiz in self.store.quizzes().await? {
            out.push(self.detail(quiz).await?);
        }
        Ok(out)
    }

    pub async fn update_quiz(
        &self,
        actor: &UserId,
        slug: &str,
        patch: &QuizPatch,
    ) -> Result<Quiz, QuizError> {
        let mut quiz = self.quiz_by_slug(slug).await?;
        ensure_can_mutate(actor, &quiz)?;

        if let Some(title) = &patch.title {
            validate::validate_title(title)?;
            self.ensure_title_free(actor, title, Some(quiz.id)).await?;
        }
        let status = patch.status.unwrap_or(quiz.status);
        let question_count = self.store.questions_for_quiz(quiz.id).await?.len();
        validate::check_publish(status, question_count)?;

        if let Some(title) = &patch.title {
            quiz.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            quiz.description = description.clone();
        }
        quiz.status = status;
        quiz.modified = Utc::now();

        self.store.update_quiz(&quiz).await?;
        tracing::info!(slug = %quiz.slug, status = %quiz.status, "quiz updated");
        Ok(quiz)
    }

    pub async fn delete_quiz(&self, actor: &UserId, slug: &str) -> Result<(), QuizError> {
        let quiz = self.quiz_by_slug(slug).await?;
        ensure_can_mutate(actor, &quiz)?;
        self.store.delete_quiz(quiz.id).await?;
        tracing::info!(slug = %quiz.slug, "quiz deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Questions
    // -----------------------------------------------------------------------

    /// Add a question to an existing quiz. Only the quiz author may do this.
    pub async fn add_question(
        &self,
        actor: &UserId,
        quiz_id: Uuid,
        draft: &QuestionDraft,
    ) -> Result<QuestionDetail, QuizError> {
        let quiz = self
            .store
            .quiz(quiz_id)
            .await?
            .ok_or_else(|| QuizError::QuizNotFound(quiz_id.to_string()))?;
        ensure_can_mutate(actor, &quiz)?;

        let sibling_orders: Vec<u32> = self
            .store
            .questions_for_quiz(quiz.id)
            .await?
            .iter()
            .map(|q| q.order)
            .collect();
        validate::validate_question(draft, &sibling_orders)?;

        let order = draft
            .order()
            .unwrap_or_else(|| validate::next_question_order(&sibling_orders));
        let detail = validate::build_question(quiz.id, actor, draft, order);
        self.store.insert_question(&detail).await?;
        tracing::info!(
            quiz = %quiz.slug,
            question = %detail.question.id,
            kind = %detail.question.kind,
            order,
            "question added"
        );
        Ok(detail)
    }

    pub async fn get_question(&self, id: Uuid) -> Result<QuestionDetail, QuizError> {
        let question = self.question(id).await?;
        let answers = self.store.answers_for_question(question.id).await?;
        Ok(QuestionDetail { question, answers })
    }

    pub async fn update_question(
        &self,
        actor: &UserId,
        id: Uuid,
        patch: &QuestionPatch,
    ) -> Result<Question, QuizError> {
        let mut question = self.question(id).await?;
        ensure_can_mutate(actor, &question)?;

        if let Some(text) = &patch.text {
            validate::validate_question_text(text)?;
        }
        if let Some(order) = patch.order {
            let sibling_orders: Vec<u32> = self
                .store
                .questions_for_quiz(question.quiz)
                .await?
                .iter()
                .filter(|q| q.id != question.id)
                .map(|q| q.order)
                .collect();
            validate::check_question_order(order, &sibling_orders)?;
        }

        if let Some(text) = &patch.text {
            question.text = text.clone();
        }
        if let Some(order) = patch.order {
            question.order = order;
        }
        question.modified = Utc::now();
        self.store.update_question(&question).await?;
        Ok(question)
    }

    /// Delete a question. The last question of a published quiz cannot go;
    /// the store re-checks that under its write lock.
    pub async fn delete_question(&self, actor: &UserId, id: Uuid) -> Result<(), QuizError> {
        let question = self.question(id).await?;
        ensure_can_mutate(actor, &question)?;

        if let Some(quiz) = self.store.quiz(question.quiz).await? {
            let remaining = self
                .store
                .questions_for_quiz(quiz.id)
                .await?
                .len()
                .saturating_sub(1);
            validate::check_publish(quiz.status, remaining)?;
        }

        self.store.delete_question(question.id).await?;
        tracing::info!(question = %question.id, "question deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Answers
    // -----------------------------------------------------------------------

    pub async fn get_answer(&self, id: Uuid) -> Result<Answer, QuizError> {
        self.store
            .answer(id)
            .await?
            .ok_or(QuizError::AnswerNotFound(id))
    }

    /// Add an answer to a multiple-choice question.
    pub async fn add_answer(
        &self,
        actor: &UserId,
        question_id: Uuid,
        draft: &AnswerDraft,
    ) -> Result<Answer, QuizError> {
        let question = self.question(question_id).await?;
        ensure_can_mutate(actor, &question)?;
        reject_fixed_answer_set(&question)?;

        let mut answers = self.store.answers_for_question(question.id).await?;
        let order = draft.order.unwrap_or_else(|| {
            answers
                .iter()
                .map(|a| a.order + 1)
                .max()
                .unwrap_or(0)
        });
        let answer = Answer::new(question.id, draft.text.clone(), draft.is_correct, order);
        answers.push(answer.clone());

        policy::validate_answer_set(question.kind, &answers)?;
        self.store.replace_answers(question.id, &answers).await?;
        Ok(answer)
    }

    /// Update an answer. Marking an answer correct clears the flag on its
    /// siblings; clearing the only correct answer is rejected.
    pub async fn update_answer(
        &self,
        actor: &UserId,
        answer_id: Uuid,
        patch: &AnswerPatch,
    ) -> Result<Answer, QuizError> {
        let current = self.get_answer(answer_id).await?;
        let question = self.question(current.question).await?;
        ensure_can_mutate(actor, &question)?;

        let now = Utc::now();
        let mut answers = self.store.answers_for_question(question.id).await?;
        for answer in answers.iter_mut() {
            if answer.id == answer_id {
                if let Some(text) = &patch.text {
                    answer.text = text.clone();
                }
                if let Some(order) = patch.order {
                    answer.order = order;
                }
                if let Some(is_correct) = patch.is_correct {
                    answer.is_correct = is_correct;
                }
                answer.modified = now;
            } else if patch.is_correct == Some(true) && answer.is_correct {
                answer.is_correct = false;
                answer.modified = now;
            }
        }

        policy::validate_answer_set(question.kind, &answers)?;
        self.store.replace_answers(question.id, &answers).await?;
        answers
            .into_iter()
            .find(|a| a.id == answer_id)
            .ok_or(QuizError::AnswerNotFound(answer_id))
    }

    pub async fn delete_answer(&self, actor: &UserId, answer_id: Uuid) -> Result<(), QuizError> {
        let current = self.get_answer(answer_id).await?;
        let question = self.question(current.question).await?;
        ensure_can_mutate(actor, &question)?;
        reject_fixed_answer_set(&question)?;

        let answers: Vec<Answer> = self
            .store
            .answers_for_question(question.id)
            .await?
            .into_iter()
            .filter(|a| a.id != answer_id)
            .collect();
        policy::validate_answer_set(question.kind, &answers)?;
        self.store.replace_answers(question.id, &answers).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn quiz_by_slug(&self, slug: &str) -> Result<Quiz, QuizError> {
        self.store
            .quiz_by_slug(slug)
            .await?
            .ok_or_else(|| QuizError::QuizNotFound(slug.to_string()))
    }

    async fn question(&self, id: Uuid) -> Result<Question, QuizError> {
        self.store
            .question(id)
            .await?
            .ok_or(QuizError::QuestionNotFound(id))
    }

    async fn detail(&self, quiz: Quiz) -> Result<QuizDetail, QuizError> {
        let mut questions = Vec::new();
        for question in self.store.questions_for_quiz(quiz.id).await? {
            let answers = self.store.answers_for_question(question.id).await?;
            questions.push(QuestionDetail { question, answers });
        }
        Ok(QuizDetail { quiz, questions })
    }

    async fn ensure_title_free(
        &self,
        author: &UserId,
        title: &str,
        except: Option<Uuid>,
    ) -> Result<(), QuizError> {
        let title = title.trim();
        let clash = self
            .store
            .quizzes_by_author(author)
            .await?
            .into_iter()
            .any(|q| q.title == title && Some(q.id) != except);
        if clash {
            return Err(ValidationError::DuplicateTitle(title.to_string()).into());
        }
        Ok(())
    }
}

fn reject_fixed_answer_set(question: &Question) -> Result<(), QuizError> {
    if policy::answers_are_fixed(question.kind) {
        return Err(ValidationError::InvalidAnswerSet(format!(
            "{} questions have a fixed answer set",
            question.kind
        ))
        .into());
    }
    Ok(())
}
