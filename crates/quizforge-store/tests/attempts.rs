//! Attempt scoring tests: attempt engine + memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quizforge_core::error::StoreError;
use quizforge_core::model::{
    Answer, AnswerDraft, Question, QuestionAttempt, QuestionDetail, QuestionDraft, Quiz,
    QuizAttempt, QuizDetail, QuizDraft, QuizStatus, Submission, UserId,
};
use quizforge_core::report::AttemptReport;
use quizforge_core::{AttemptEngine, QuizError, QuizService, QuizStore, ValidationError};
use quizforge_store::MemoryStore;
use uuid::Uuid;

struct Harness {
    store: Arc<MemoryStore>,
    service: QuizService,
    engine: Arc<AttemptEngine>,
    quiz: QuizDetail,
}

fn ada() -> UserId {
    UserId::from("ada")
}

fn taker() -> UserId {
    UserId::from("grace")
}

fn mc(text: &str, correct: usize) -> QuestionDraft {
    let answers = (0..4)
        .map(|i| AnswerDraft::new(format!("{text} option {i}"), i == correct))
        .collect();
    QuestionDraft::multiple_choice(text, answers)
}

async fn harness(question_count: usize) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let service = QuizService::new(store.clone());
    let engine = Arc::new(AttemptEngine::new(store.clone()));
    let questions = (0..question_count)
        .map(|i| {
            if i % 2 == 0 {
                mc(&format!("Question {i}"), i % 4)
            } else {
                QuestionDraft::true_false(format!("Statement {i}"), true)
            }
        })
        .collect();
    let draft = QuizDraft {
        title: "Scored".into(),
        description: String::new(),
        status: QuizStatus::Published,
        questions,
    };
    let quiz = service.create_quiz(&ada(), &draft).await.unwrap();
    Harness {
        store,
        service,
        engine,
        quiz,
    }
}

fn pick_for(attempt: Uuid, quiz: &QuizDetail, index: usize, correct: bool) -> Submission {
    let question = &quiz.questions[index];
    let answer = question
        .answers
        .iter()
        .find(|a| a.is_correct == correct)
        .unwrap();
    Submission {
        attempt,
        question: question.question.id,
        answer: answer.id,
        time_taken: None,
    }
}

#[tokio::test]
async fn fresh_attempt_has_unset_score() {
    let h = harness(2).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    assert_eq!(attempt.score, None);
    assert_eq!(attempt.score_value(), 0);
    assert!(!attempt.is_completed());

    let err = h
        .engine
        .start_attempt(&taker(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn score_counts_correct_submissions() {
    let h = harness(6).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();

    for i in 0..6 {
        let submission = pick_for(attempt.id, &h.quiz, i, i < 4);
        let record = h.engine.submit_answer(&taker(), &submission).await.unwrap();
        assert_eq!(record.is_correct, i < 4);
    }

    let detail = h.engine.get_attempt(&taker(), attempt.id).await.unwrap();
    assert_eq!(detail.attempt.score, Some(4));
    assert_eq!(detail.question_attempts.len(), 6);
}

#[tokio::test]
async fn incorrect_only_leaves_score_unset() {
    let h = harness(2).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    h.engine
        .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, 0, false))
        .await
        .unwrap();
    let detail = h.engine.get_attempt(&taker(), attempt.id).await.unwrap();
    assert_eq!(detail.attempt.score, None);
}

#[tokio::test]
async fn duplicate_submission_rejected() {
    let h = harness(2).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    let first = pick_for(attempt.id, &h.quiz, 0, true);
    h.engine.submit_answer(&taker(), &first).await.unwrap();

    let err = h.engine.submit_answer(&taker(), &first).await.unwrap_err();
    assert!(matches!(err, QuizError::DuplicateSubmission { .. }));

    let other = pick_for(attempt.id, &h.quiz, 0, false);
    let err = h.engine.submit_answer(&taker(), &other).await.unwrap_err();
    assert!(matches!(err, QuizError::DuplicateSubmission { .. }));

    let detail = h.engine.get_attempt(&taker(), attempt.id).await.unwrap();
    assert_eq!(detail.attempt.score, Some(1));
    assert_eq!(detail.question_attempts.len(), 1);
}

#[tokio::test]
async fn mismatched_answer_rejected_without_side_effects() {
    let h = harness(2).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();

    // Correct answer of question 1 submitted against question 0.
    let mut submission = pick_for(attempt.id, &h.quiz, 0, true);
    submission.answer = pick_for(attempt.id, &h.quiz, 1, true).answer;
    let err = h.engine.submit_answer(&taker(), &submission).await.unwrap_err();
    assert!(matches!(
        err,
        QuizError::Validation(ValidationError::AnswerQuestionMismatch)
    ));

    let detail = h.engine.get_attempt(&taker(), attempt.id).await.unwrap();
    assert_eq!(detail.attempt.score, None);
    assert!(detail.question_attempts.is_empty());
}

#[tokio::test]
async fn question_from_another_quiz_rejected() {
    let h = harness(1).await;
    let other = h
        .service
        .create_quiz(
            &ada(),
            &QuizDraft {
                title: "Other".into(),
                description: String::new(),
                status: QuizStatus::Published,
                questions: vec![QuestionDraft::true_false("Elsewhere", true)],
            },
        )
        .await
        .unwrap();
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();

    let err = h
        .engine
        .submit_answer(&taker(), &pick_for(attempt.id, &other, 0, true))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QuizError::Validation(ValidationError::QuestionQuizMismatch)
    ));
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let h = harness(1).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();

    let mut missing_answer = pick_for(attempt.id, &h.quiz, 0, true);
    missing_answer.answer = Uuid::new_v4();
    let err = h
        .engine
        .submit_answer(&taker(), &missing_answer)
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::AnswerNotFound(_)));

    let missing_attempt = pick_for(Uuid::new_v4(), &h.quiz, 0, true);
    let err = h
        .engine
        .submit_answer(&taker(), &missing_attempt)
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::AttemptNotFound(_)));
}

#[tokio::test]
async fn completed_attempt_refuses_submissions() {
    let h = harness(2).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    h.engine
        .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, 0, true))
        .await
        .unwrap();

    let completed = h.engine.complete_attempt(&taker(), attempt.id).await.unwrap();
    assert!(completed.is_completed());
    assert_eq!(completed.score, Some(1));

    let err = h
        .engine
        .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, 1, true))
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::AttemptCompleted(_)));

    let err = h
        .engine
        .complete_attempt(&taker(), attempt.id)
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::AttemptCompleted(_)));
}

#[tokio::test]
async fn attempts_belong_to_their_taker() {
    let h = harness(1).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    let intruder = UserId::from("mallory");

    let err = h
        .engine
        .submit_answer(&intruder, &pick_for(attempt.id, &h.quiz, 0, true))
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
    assert!(h
        .engine
        .get_attempt(&intruder, attempt.id)
        .await
        .unwrap_err()
        .is_forbidden());
    assert!(h
        .engine
        .complete_attempt(&intruder, attempt.id)
        .await
        .unwrap_err()
        .is_forbidden());
    assert!(h
        .engine
        .delete_attempt(&intruder, attempt.id)
        .await
        .unwrap_err()
        .is_forbidden());

    assert!(h.engine.list_attempts(&intruder).await.unwrap().is_empty());
    assert_eq!(h.engine.list_attempts(&taker()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_attempt_removes_submissions() {
    let h = harness(1).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    h.engine
        .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, 0, true))
        .await
        .unwrap();
    h.engine.delete_attempt(&taker(), attempt.id).await.unwrap();

    assert!(h.store.attempt(attempt.id).await.unwrap().is_none());
    assert!(h.store.snapshot().await.question_attempts.is_empty());
}

#[tokio::test]
async fn deleting_a_question_keeps_score_within_bounds() {
    let h = harness(2).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    for i in 0..2 {
        h.engine
            .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, i, true))
            .await
            .unwrap();
    }

    h.service
        .delete_question(&ada(), h.quiz.questions[1].question.id)
        .await
        .unwrap();
    let detail = h.engine.get_attempt(&taker(), attempt.id).await.unwrap();
    assert_eq!(detail.attempt.score, Some(1));
    assert_eq!(detail.question_attempts.len(), 1);
}

#[tokio::test]
async fn report_reflects_attempt() {
    let h = harness(3).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    let mut first = pick_for(attempt.id, &h.quiz, 0, true);
    first.time_taken = Some(Duration::from_secs(4));
    h.engine.submit_answer(&taker(), &first).await.unwrap();
    h.engine
        .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, 1, false))
        .await
        .unwrap();
    h.engine.complete_attempt(&taker(), attempt.id).await.unwrap();

    let detail = h.engine.get_attempt(&taker(), attempt.id).await.unwrap();
    let report = AttemptReport::build(&h.quiz, &detail);
    assert_eq!(report.score, 1);
    assert_eq!(report.total, 3);
    assert_eq!(report.answered(), 2);
    assert_eq!(report.outcomes[0].time_taken, Some(Duration::from_secs(4)));
    assert!(report.outcomes[2].selected.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_do_not_lose_increments() {
    let h = harness(12).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let engine = Arc::clone(&h.engine);
            let submission = pick_for(attempt.id, &h.quiz, i, i % 3 != 0);
            tokio::spawn(async move { engine.submit_answer(&taker(), &submission).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let detail = h.engine.get_attempt(&taker(), attempt.id).await.unwrap();
    assert_eq!(detail.attempt.score, Some(8));
    assert_eq!(detail.question_attempts.len(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_duplicates_record_once() {
    let h = harness(1).await;
    let attempt = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    let submission = pick_for(attempt.id, &h.quiz, 0, true);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&h.engine);
            let submission = submission.clone();
            tokio::spawn(async move { engine.submit_answer(&taker(), &submission).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, QuizError::DuplicateSubmission { .. })));

    let detail = h.engine.get_attempt(&taker(), attempt.id).await.unwrap();
    assert_eq!(detail.attempt.score, Some(1));
}

/// Deletes a question the moment the engine looks up the selected answer,
/// landing the delete between submission checks and the commit.
struct DeleteDuringSubmit {
    inner: Arc<MemoryStore>,
    doomed: std::sync::Mutex<Option<Uuid>>,
}

impl DeleteDuringSubmit {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            doomed: std::sync::Mutex::new(None),
        }
    }

    fn delete_next(&self, question: Uuid) {
        *self.doomed.lock().unwrap() = Some(question);
    }
}

#[async_trait]
impl QuizStore for DeleteDuringSubmit {
    fn name(&self) -> &str {
        "delete-during-submit"
    }
    async fn insert_quiz_graph(&self, graph: &QuizDetail) -> Result<(), StoreError> {
        self.inner.insert_quiz_graph(graph).await
    }
    async fn quiz(&self, id: Uuid) -> Result<Option<Quiz>, StoreError> {
        self.inner.quiz(id).await
    }
    async fn quiz_by_slug(&self, slug: &str) -> Result<Option<Quiz>, StoreError> {
        self.inner.quiz_by_slug(slug).await
    }
    async fn quizzes(&self) -> Result<Vec<Quiz>, StoreError> {
        self.inner.quizzes().await
    }
    async fn quizzes_by_author(&self, author: &UserId) -> Result<Vec<Quiz>, StoreError> {
        self.inner.quizzes_by_author(author).await
    }
    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StoreError> {
        self.inner.update_quiz(quiz).await
    }
    async fn delete_quiz(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_quiz(id).await
    }
    async fn insert_question(&self, question: &QuestionDetail) -> Result<(), StoreError> {
        self.inner.insert_question(question).await
    }
    async fn question(&self, id: Uuid) -> Result<Option<Question>, StoreError> {
        self.inner.question(id).await
    }
    async fn questions_for_quiz(&self, quiz: Uuid) -> Result<Vec<Question>, StoreError> {
        self.inner.questions_for_quiz(quiz).await
    }
    async fn update_question(&self, question: &Question) -> Result<(), StoreError> {
        self.inner.update_question(question).await
    }
    async fn delete_question(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_question(id).await
    }
    async fn answer(&self, id: Uuid) -> Result<Option<Answer>, StoreError> {
        let found = self.inner.answer(id).await?;
        let doomed = self.doomed.lock().unwrap().take();
        if let Some(question) = doomed {
            self.inner.delete_question(question).await?;
        }
        Ok(found)
    }
    async fn answers_for_question(&self, question: Uuid) -> Result<Vec<Answer>, StoreError> {
        self.inner.answers_for_question(question).await
    }
    async fn replace_answers(&self, question: Uuid, answers: &[Answer]) -> Result<(), StoreError> {
        self.inner.replace_answers(question, answers).await
    }
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        self.inner.insert_attempt(attempt).await
    }
    async fn attempt(&self, id: Uuid) -> Result<Option<QuizAttempt>, StoreError> {
        self.inner.attempt(id).await
    }
    async fn attempts_for_user(&self, user: &UserId) -> Result<Vec<QuizAttempt>, StoreError> {
        self.inner.attempts_for_user(user).await
    }
    async fn update_attempt(&self, attempt: &QuizAttempt) -> Result<(), StoreError> {
        self.inner.update_attempt(attempt).await
    }
    async fn delete_attempt(&self, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete_attempt(id).await
    }
    async fn question_attempts(&self, attempt: Uuid) -> Result<Vec<QuestionAttempt>, StoreError> {
        self.inner.question_attempts(attempt).await
    }
    async fn commit_submission(
        &self,
        submission: &QuestionAttempt,
    ) -> Result<QuizAttempt, StoreError> {
        self.inner.commit_submission(submission).await
    }
}

#[tokio::test]
async fn cascade_during_submit_is_not_overwritten() {
    let h = harness(3).await;
    let store = Arc::new(DeleteDuringSubmit::new(h.store.clone()));
    let engine = AttemptEngine::new(store.clone());
    let attempt = engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    engine
        .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, 0, true))
        .await
        .unwrap();

    store.delete_next(h.quiz.questions[0].question.id);
    engine
        .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, 1, true))
        .await
        .unwrap();

    let detail = engine.get_attempt(&taker(), attempt.id).await.unwrap();
    let correct = detail.question_attempts.iter().filter(|qa| qa.is_correct).count();
    assert_eq!(correct, 1);
    assert_eq!(detail.attempt.score, Some(1));
}

#[tokio::test]
async fn submission_for_question_deleted_mid_submit_is_refused() {
    let h = harness(3).await;
    let store = Arc::new(DeleteDuringSubmit::new(h.store.clone()));
    let engine = AttemptEngine::new(store.clone());
    let attempt = engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();

    let target = h.quiz.questions[1].question.id;
    store.delete_next(target);
    let err = engine
        .submit_answer(&taker(), &pick_for(attempt.id, &h.quiz, 1, true))
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::QuestionNotFound(id) if id == target));

    let detail = engine.get_attempt(&taker(), attempt.id).await.unwrap();
    assert!(detail.question_attempts.is_empty());
    assert_eq!(detail.attempt.score, None);
    assert!(h.store.snapshot().await.question_attempts.is_empty());
}

#[tokio::test]
async fn abandoned_attempts_leave_no_locks_behind() {
    let h = harness(2).await;
    let first = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();
    let second = h.engine.start_attempt(&taker(), h.quiz.quiz.id).await.unwrap();

    h.engine
        .submit_answer(&taker(), &pick_for(first.id, &h.quiz, 0, true))
        .await
        .unwrap();
    h.engine
        .submit_answer(&taker(), &pick_for(first.id, &h.quiz, 0, true))
        .await
        .unwrap_err();
    h.engine
        .submit_answer(&taker(), &pick_for(second.id, &h.quiz, 1, false))
        .await
        .unwrap();
    assert_eq!(h.engine.active_locks(), 0);

    h.engine.complete_attempt(&taker(), second.id).await.unwrap();
    h.engine.complete_attempt(&taker(), second.id).await.unwrap_err();
    h.engine.delete_attempt(&taker(), first.id).await.unwrap();
    assert_eq!(h.engine.active_locks(), 0);
}
