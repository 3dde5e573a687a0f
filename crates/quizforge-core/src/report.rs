//! Attempt report with JSON persistence.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AttemptDetail, AttemptState, QuizDetail, UserId};

/// Summary of one finished (or abandoned) attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    /// The attempt identifier.
    pub id: Uuid,
    pub quiz: QuizSummary,
    pub user: UserId,
    pub state: AttemptState,
    pub started: DateTime<Utc>,
    pub completed: Option<DateTime<Utc>>,
    pub score: u32,
    /// Number of questions in the quiz.
    pub total: u32,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Summary of a quiz (without questions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
}

/// How a single question went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub order: u32,
    pub question: String,
    /// `None` when the question was skipped.
    pub selected: Option<String>,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
    pub time_taken: Option<Duration>,
}

impl AttemptReport {
    /// Build a report from the quiz and an attempt made against it.
    pub fn build(quiz: &QuizDetail, attempt: &AttemptDetail) -> Self {
        let outcomes = quiz
            .questions
            .iter()
            .map(|q| {
                let submitted = attempt
                    .question_attempts
                    .iter()
                    .find(|qa| qa.question == q.question.id);
                let selected = submitted.and_then(|qa| {
                    q.answers
                        .iter()
                        .find(|a| a.id == qa.answer_selected)
                        .map(|a| a.text.clone())
                });
                QuestionOutcome {
                    order: q.question.order,
                    question: q.question.text.clone(),
                    selected,
                    correct_answer: q.correct_answer().map(|a| a.text.clone()),
                    is_correct: submitted.is_some_and(|qa| qa.is_correct),
                    time_taken: submitted.and_then(|qa| qa.time_taken),
                }
            })
            .collect();

        Self {
            id: attempt.attempt.id,
            quiz: QuizSummary {
                id: quiz.quiz.id,
                slug: quiz.quiz.slug.clone(),
                title: quiz.quiz.title.clone(),
            },
            user: attempt.attempt.user.clone(),
            state: attempt.attempt.state(),
            started: attempt.attempt.created,
            completed: attempt.attempt.completed,
            score: attempt.attempt.score_value(),
            total: quiz.question_count() as u32,
            outcomes,
        }
    }

    /// Score as a percentage of the question count.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.score as f64 / self.total as f64 * 100.0
    }

    pub fn answered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.selected.is_some()).count()
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AttemptReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Render the report as a markdown table.
    pub fn to_markdown(&self) -> String {
        let mut md = format!(
            "# {}\n\n**{}** scored **{}/{}** ({:.0}%)\n\n| # | Question | Selected | Correct |\n|---|---|---|---|\n",
            self.quiz.title,
            self.user,
            self.score,
            self.total,
            self.percentage()
        );
        for o in &self.outcomes {
            let mark = if o.is_correct { "yes" } else { "no" };
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                o.order,
                o.question,
                o.selected.as_deref().unwrap_or("-"),
                mark
            ));
        }
        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AnswerDraft, QuestionAttempt, QuestionDraft, QuizAttempt, QuizDraft, QuizStatus,
    };
    use crate::validate::build_quiz_graph;

    fn sample() -> (QuizDetail, AttemptDetail) {
        let draft = QuizDraft {
            title: "Capitals".into(),
            description: String::new(),
            status: QuizStatus::Published,
            questions: vec![
                QuestionDraft::true_false("Canberra is in Australia", true),
                QuestionDraft::multiple_choice(
                    "Capital of Canada?",
                    vec![AnswerDraft::new("Toronto", false), AnswerDraft::new("Ottawa", true)],
                ),
            ],
        };
        let quiz = build_quiz_graph(&"ada".into(), &draft, "capitals".into(), Utc::now()).unwrap();
        let mut attempt = QuizAttempt::new("bob".into(), quiz.quiz.id);
        attempt.score = Some(1);
        let tf = &quiz.questions[0];
        let true_answer = &tf.answers[0];
        let qa = QuestionAttempt {
            id: Uuid::new_v4(),
            quiz_attempt: attempt.id,
            question: tf.question.id,
            answer_selected: true_answer.id,
            is_correct: true,
            time_taken: Some(Duration::from_secs(3)),
            created: Utc::now(),
        };
        (
            quiz,
            AttemptDetail {
                attempt,
                question_attempts: vec![qa],
            },
        )
    }

    #[test]
    fn build_marks_skipped_questions() {
        let (quiz, attempt) = sample();
        let report = AttemptReport::build(&quiz, &attempt);
        assert_eq!(report.score, 1);
        assert_eq!(report.total, 2);
        assert_eq!(report.answered(), 1);
        assert_eq!(report.outcomes[0].selected.as_deref(), Some("True"));
        assert!(report.outcomes[0].is_correct);
        assert!(report.outcomes[1].selected.is_none());
        assert_eq!(report.outcomes[1].correct_answer.as_deref(), Some("Ottawa"));
        assert!((report.percentage() - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.state, AttemptState::InProgress);
    }

    #[test]
    fn json_save_and_load() {
        let (quiz, attempt) = sample();
        let report = AttemptReport::build(&quiz, &attempt);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        report.save_json(&path).unwrap();

        let loaded = AttemptReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.outcomes.len(), 2);
        assert_eq!(loaded.outcomes[0].time_taken, Some(Duration::from_secs(3)));
    }

    #[test]
    fn markdown_contains_score() {
        let (quiz, attempt) = sample();
        let md = AttemptReport::build(&quiz, &attempt).to_markdown();
        assert!(md.contains("**1/2**"));
        assert!(md.contains("| 2 | Capital of Canada? | - | no |"));
    }
}
