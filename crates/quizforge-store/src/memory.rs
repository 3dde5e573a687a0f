//! In-memory transactional store.
//!
//! All tables live behind one `RwLock`. Each trait method takes the lock
//! once, checks its constraints, and only then writes, so multi-entity
//! writes are atomic and a failed call leaves the tables untouched.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use quizforge_core::error::StoreError;
use quizforge_core::model::{
    Answer, Question, QuestionAttempt, QuestionDetail, Quiz, QuizAttempt, QuizDetail, QuizStatus,
    UserId,
};
use quizforge_core::traits::QuizStore;

/// Every table of the store. Also the on-disk snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub quizzes: BTreeMap<Uuid, Quiz>,
    #[serde(default)]
    pub questions: BTreeMap<Uuid, Question>,
    #[serde(default)]
    pub answers: BTreeMap<Uuid, Answer>,
    #[serde(default)]
    pub attempts: BTreeMap<Uuid, QuizAttempt>,
    #[serde(default)]
    pub question_attempts: BTreeMap<Uuid, QuestionAttempt>,
}

impl Tables {
    fn remove_question_attempts<F>(&mut self, mut doomed: F)
    where
        F: FnMut(&QuestionAttempt) -> bool,
    {
        let removed: Vec<QuestionAttempt> = self
            .question_attempts
            .values()
            .filter(|&qa| doomed(qa))
            .cloned()
            .collect();
        for qa in removed {
            self.question_attempts.remove(&qa.id);
            // Keep the score equal to the correct submissions that remain.
            if qa.is_correct {
                if let Some(attempt) = self.attempts.get_mut(&qa.quiz_attempt) {
                    attempt.score = attempt.score.map(|s| s.saturating_sub(1));
                }
            }
        }
    }

    fn remove_question(&mut self, id: Uuid) -> bool {
        if self.questions.remove(&id).is_none() {
            return false;
        }
        self.answers.retain(|_, a| a.question != id);
        self.remove_question_attempts(|qa| qa.question == id);
        true
    }

    fn remove_attempt(&mut self, id: Uuid) -> bool {
        if self.attempts.remove(&id).is_none() {
            return false;
        }
        self.question_attempts.retain(|_, qa| qa.quiz_attempt != id);
        true
    }

    fn remove_quiz(&mut self, id: Uuid) -> bool {
        if self.quizzes.remove(&id).is_none() {
            return false;
        }
        let questions: Vec<Uuid> = self
            .questions
            .values()
            .filter(|q| q.quiz == id)
            .map(|q| q.id)
            .collect();
        for question in questions {
            self.remove_question(question);
        }
        let attempts: Vec<Uuid> = self
            .attempts
            .values()
            .filter(|a| a.quiz == id)
            .map(|a| a.id)
            .collect();
        for attempt in attempts {
            self.remove_attempt(attempt);
        }
        true
    }

    fn question_count(&self, quiz: Uuid) -> usize {
        self.questions.values().filter(|q| q.quiz == quiz).count()
    }

    fn check_question_order(&self, question: &Question) -> Result<(), StoreError> {
        let clash = self
            .questions
            .values()
            .any(|q| q.quiz == question.quiz && q.id != question.id && q.order == question.order);
        if clash {
            return Err(StoreError::Conflict(format!(
                "question order {} already used in quiz {}",
                question.order, question.quiz
            )));
        }
        Ok(())
    }
}

fn check_answer_orders(answers: &[Answer]) -> Result<(), StoreError> {
    let mut seen = std::collections::HashSet::new();
    for answer in answers {
        if !seen.insert((answer.question, answer.order)) {
            return Err(StoreError::Conflict(format!(
                "answer order {} used twice in question {}",
                answer.order, answer.question
            )));
        }
    }
    Ok(())
}

/// A [`QuizStore`] that keeps everything in memory.
///
/// State can be persisted between runs with [`MemoryStore::save_snapshot`]
/// and [`MemoryStore::load_snapshot`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// A copy of every table.
    pub async fn snapshot(&self) -> Tables {
        self.tables.read().await.clone()
    }

    /// Load a JSON snapshot. A missing file yields an empty store.
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
        let tables: Tables = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse snapshot: {}", path.display()))?;
        tracing::debug!(
            quizzes = tables.quizzes.len(),
            attempts = tables.attempts.len(),
            "loaded snapshot from {}",
            path.display()
        );
        Ok(Self::from_tables(tables))
    }

    /// Write every table to `path` as pretty JSON.
    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let json = {
            let tables = self.tables.read().await;
            serde_json::to_string_pretty(&*tables).context("failed to serialize snapshot")?
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        tracing::debug!("saved snapshot to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert_quiz_graph(&self, graph: &QuizDetail) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.quizzes.values().any(|q| q.slug == graph.quiz.slug) {
            return Err(StoreError::SlugTaken(graph.quiz.slug.clone()));
        }
        if tables.quizzes.contains_key(&graph.quiz.id) {
            return Err(StoreError::Conflict(format!("quiz {} exists", graph.quiz.id)));
        }
        if graph.quiz.status == QuizStatus::Published && graph.questions.is_empty() {
            return Err(StoreError::EmptyPublishedQuiz(graph.quiz.id));
        }
        let mut orders = std::collections::HashSet::new();
        for q in &graph.questions {
            if !orders.insert(q.question.order) {
                return Err(StoreError::Conflict(format!(
                    "question order {} used twice",
                    q.question.order
                )));
            }
            check_answer_orders(&q.answers)?;
        }

        tables.quizzes.insert(graph.quiz.id, graph.quiz.clone());
        for q in &graph.questions {
            tables.questions.insert(q.question.id, q.question.clone());
            for a in &q.answers {
                tables.answers.insert(a.id, a.clone());
            }
        }
        Ok(())
    }

    async fn quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError> {
        Ok(self.tables.read().await.quizzes.get(&id).cloned())
    }

    async fn quiz_by_slug(&self, slug: &str) -> Result<Option<Quiz>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .quizzes
            .values()
            .find(|q| q.slug == slug)
            .cloned())
    }

    async fn quizzes(&self) -> Result<Vec<Quiz>, StoreError> {
        let mut quizzes: Vec<Quiz> = self.tables.read().await.quizzes.values().cloned().collect();
        quizzes.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(quizzes)
    }

    async fn quizzes_by_author(&self, author: &UserId) -> Result<Vec<Quiz>, StoreError> {
        let mut quizzes: Vec<Quiz> = self
            .tables
            .read()
            .await
            .quizzes
            .values()
            .filter(|q| &q.author == author)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(quizzes)
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if quiz.status == QuizStatus::Published
            && tables.quizzes.contains_key(&quiz.id)
            && tables.question_count(quiz.id) == 0
        {
            return Err(StoreError::EmptyPublishedQuiz(quiz.id));
        }
        match tables.quizzes.get_mut(&quiz.id) {
            Some(existing) => {
                *existing = quiz.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("quiz {}", quiz.id))),
        }
    }

    async fn delete_quiz(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.remove_quiz(id))
    }

    async fn insert_question(&self, question: &QuestionDetail) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.quizzes.contains_key(&question.question.quiz) {
            return Err(StoreError::Missing(format!(
                "quiz {}",
                question.question.quiz
            )));
        }
        tables.check_question_order(&question.question)?;
        check_answer_orders(&question.answers)?;

        tables
            .questions
            .insert(question.question.id, question.question.clone());
        for a in &question.answers {
            tables.answers.insert(a.id, a.clone());
        }
        Ok(())
    }

    async fn question(&self, id: Uuid) -> Result<Option<Question>, StoreError> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn questions_for_quiz(&self, quiz: Uuid) -> Result<Vec<Question>, StoreError> {
        let mut questions: Vec<Question> = self
            .tables
            .read()
            .await
            .questions
            .values()
            .filter(|q| q.quiz == quiz)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order);
        Ok(questions)
    }

    async fn update_question(&self, question: &Question) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&question.id) {
            return Err(StoreError::Missing(format!("question {}", question.id)));
        }
        tables.check_question_order(question)?;
        tables.questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(quiz) = tables.questions.get(&id).map(|q| q.quiz) else {
            return Ok(false);
        };
        let published = tables
            .quizzes
            .get(&quiz)
            .is_some_and(|q| q.status == QuizStatus::Published);
        if published && tables.question_count(quiz) == 1 {
            return Err(StoreError::EmptyPublishedQuiz(quiz));
        }
        Ok(tables.remove_question(id))
    }

    async fn answer(&self, id: Uuid) -> Result<Option<Answer>, StoreError> {
        Ok(self.tables.read().await.answers.get(&id).cloned())
    }

    async fn answers_for_question(&self, question: Uuid) -> Result<Vec<Answer>, StoreError> {
        let mut answers: Vec<Answer> = self
            .tables
            .read()
            .await
            .answers
            .values()
            .filter(|a| a.question == question)
            .cloned()
            .collect();
        answers.sort_by_key(|a| a.order);
        Ok(answers)
    }

    async fn replace_answers(&self, question: Uuid, answers: &[Answer]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&question) {
            return Err(StoreError::Missing(format!("question {question}")));
        }
        if let Some(stray) = answers.iter().find(|a| a.question != question) {
            return Err(StoreError::Conflict(format!(
                "answer {} belongs to question {}",
                stray.id, stray.question
            )));
        }
        check_answer_orders(answers)?;

        let kept: std::collections::HashSet<Uuid> = answers.iter().map(|a| a.id).collect();
        let dropped: Vec<Uuid> = tables
            .answers
            .values()
            .filter(|a| a.question == question && !kept.contains(&a.id))
            .map(|a| a.id)
            .collect();
        for id in &dropped {
            tables.answers.remove(id);
        }
        tables.remove_question_attempts(|qa| dropped.contains(&qa.answer_selected));
        for a in answers {
            tables.answers.insert(a.id, a.clone());
        }
        Ok(())
    }

    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.quizzes.contains_key(&attempt.quiz) {
            return Err(StoreError::Missing(format!("quiz {}", attempt.quiz)));
        }
        if tables.attempts.contains_key(&attempt.id) {
            return Err(StoreError::Conflict(format!("attempt {} exists", attempt.id)));
        }
        tables.attempts.insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn attempt(&self, id: Uuid) -> Result<Option<QuizAttempt>, StoreError> {
        Ok(self.tables.read().await.attempts.get(&id).cloned())
    }

    async fn attempts_for_user(&self, user: &UserId) -> Result<Vec<QuizAttempt>, StoreError> {
        let mut attempts: Vec<QuizAttempt> = self
            .tables
            .read()
            .await
            .attempts
            .values()
            .filter(|a| &a.user == user)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(attempts)
    }

    async fn update_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.attempts.get_mut(&attempt.id) {
            Some(existing) => {
                *existing = attempt.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(format!("attempt {}", attempt.id))),
        }
    }

    async fn delete_attempt(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.remove_attempt(id))
    }

    async fn question_attempts(&self, attempt: Uuid) -> Result<Vec<QuestionAttempt>, StoreError> {
        let mut records: Vec<QuestionAttempt> = self
            .tables
            .read()
            .await
            .question_attempts
            .values()
            .filter(|qa| qa.quiz_attempt == attempt)
            .cloned()
            .collect();
        records.sort_by_key(|qa| qa.created);
        Ok(records)
    }

    async fn commit_submission(
        &self,
        submission: &QuestionAttempt,
    ) -> Result<QuizAttempt, StoreError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        if !tables.questions.contains_key(&submission.question) {
            return Err(StoreError::Missing(format!(
                "question {}",
                submission.question
            )));
        }
        if !tables.answers.contains_key(&submission.answer_selected) {
            return Err(StoreError::Missing(format!(
                "answer {}",
                submission.answer_selected
            )));
        }
        let duplicate = tables.question_attempts.values().any(|qa| {
            qa.quiz_attempt == submission.quiz_attempt && qa.question == submission.question
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "question {} already answered in attempt {}",
                submission.question, submission.quiz_attempt
            )));
        }
        let Some(attempt) = tables.attempts.get_mut(&submission.quiz_attempt) else {
            return Err(StoreError::Missing(format!(
                "attempt {}",
                submission.quiz_attempt
            )));
        };

        // Increment the stored row; cascading deletes may have lowered it
        // since the caller last read the attempt.
        if submission.is_correct {
            attempt.score = Some(attempt.score_value() + 1);
        }
        attempt.modified = submission.created;
        tables
            .question_attempts
            .insert(submission.id, submission.clone());
        Ok(attempt.clone())
    }
}
