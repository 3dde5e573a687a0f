//! TOML quiz file and answer sheet parser.
//!
//! Loads quiz drafts from TOML files and directories, lints them, and reads
//! the answer sheets used to take a quiz from the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AnswerDraft, QuestionDraft, QuestionKind, QuizDraft, QuizStatus};

/// Intermediate TOML structure for parsing quiz files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_status_str")]
    status: String,
}

fn default_status_str() -> String {
    "draft".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    #[serde(rename = "type")]
    kind: String,
    text: String,
    #[serde(default)]
    order: Option<u32>,
    #[serde(default)]
    correct_answer: Option<bool>,
    #[serde(default)]
    answers: Vec<TomlAnswer>,
}

#[derive(Debug, Deserialize)]
struct TomlAnswer {
    text: String,
    #[serde(default)]
    is_correct: bool,
    #[serde(default)]
    order: Option<u32>,
}

/// Parse a single TOML file into a `QuizDraft`.
pub fn parse_quiz_file(path: &Path) -> Result<QuizDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse a TOML string into a `QuizDraft` (useful for testing).
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<QuizDraft> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let status: QuizStatus = parsed
        .quiz
        .status
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let questions = parsed
        .questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question #{}: {}", i + 1, e))?;

            match kind {
                QuestionKind::TrueFalse => {
                    if !q.answers.is_empty() {
                        anyhow::bail!(
                            "question #{}: true/false answers are generated, remove the answers table",
                            i + 1
                        );
                    }
                    let correct_answer = q.correct_answer.with_context(|| {
                        format!("question #{}: true/false questions need correct_answer", i + 1)
                    })?;
                    Ok(QuestionDraft::TrueFalse {
                        text: q.text,
                        order: q.order,
                        correct_answer,
                    })
                }
                QuestionKind::MultipleChoice => {
                    if q.correct_answer.is_some() {
                        anyhow::bail!(
                            "question #{}: mark the correct choice with is_correct instead of correct_answer",
                            i + 1
                        );
                    }
                    let answers = q
                        .answers
                        .into_iter()
                        .map(|a| AnswerDraft {
                            text: a.text,
                            is_correct: a.is_correct,
                            order: a.order,
                        })
                        .collect();
                    Ok(QuestionDraft::MultipleChoice {
                        text: q.text,
                        order: q.order,
                        answers,
                    })
                }
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuizDraft {
        title: parsed.quiz.title,
        description: parsed.quiz.description,
        status,
        questions,
    })
}

/// Recursively load all `.toml` quiz files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<(PathBuf, QuizDraft)>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_quiz_file(&path) {
                Ok(draft) => quizzes.push((path, draft)),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    quizzes.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(quizzes)
}

/// A non-fatal finding about a quiz draft.
#[derive(Debug, Clone)]
pub struct LintWarning {
    /// 1-based position of the question (if applicable).
    pub question: Option<usize>,
    pub message: String,
}

/// Check a quiz draft for issues that do not block saving.
pub fn lint_quiz(draft: &QuizDraft) -> Vec<LintWarning> {
    let mut warnings = Vec::new();

    if draft.description.trim().is_empty() {
        warnings.push(LintWarning {
            question: None,
            message: "quiz has no description".into(),
        });
    }

    match draft.questions.len() {
        0 => warnings.push(LintWarning {
            question: None,
            message: "quiz has no questions and cannot be published yet".into(),
        }),
        1 => warnings.push(LintWarning {
            question: None,
            message: "quiz has a single question".into(),
        }),
        _ => {}
    }

    for (i, question) in draft.questions.iter().enumerate() {
        let mut seen = std::collections::HashSet::new();
        for answer in question.answers() {
            if !seen.insert(answer.text.trim().to_lowercase()) {
                warnings.push(LintWarning {
                    question: Some(i + 1),
                    message: format!("answer text '{}' appears more than once", answer.text),
                });
            }
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Answer sheets
// ---------------------------------------------------------------------------

/// How a response points at its chosen answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AnswerRef {
    /// The answer's order within its question.
    Order(u32),
    /// The answer's text, matched case-insensitively.
    Text(String),
}

/// One response on an answer sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetResponse {
    /// Order of the question being answered.
    pub question: u32,
    pub answer: AnswerRef,
    #[serde(default)]
    pub time_taken_secs: Option<f64>,
}

impl SheetResponse {
    pub fn time_taken(&self) -> Option<Duration> {
        self.time_taken_secs
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// A taker's responses to a quiz, read from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerSheet {
    #[serde(default)]
    pub responses: Vec<SheetResponse>,
}

pub fn parse_answer_sheet(path: &Path) -> Result<AnswerSheet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answer sheet: {}", path.display()))?;
    parse_answer_sheet_str(&content, path)
}

pub fn parse_answer_sheet_str(content: &str, source_path: &Path) -> Result<AnswerSheet> {
    toml::from_str(content)
        .with_context(|| format!("failed to parse answer sheet: {}", source_path.display()))
}
