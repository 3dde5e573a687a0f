//! The `quizforge take` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use quizforge_core::model::{Answer, QuestionDetail, Submission};
use quizforge_core::parser::{parse_answer_sheet, AnswerRef};
use quizforge_core::report::AttemptReport;
use quizforge_core::{AttemptEngine, QuizService};

use super::Workspace;

pub async fn execute(
    slug: String,
    answers_path: PathBuf,
    user: Option<String>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let actor = workspace.config.actor(user.as_deref())?;
    let sheet = parse_answer_sheet(&answers_path)?;

    let service = QuizService::new(workspace.store.clone());
    let engine = AttemptEngine::new(workspace.store.clone());
    let quiz = service.get_quiz(&slug).await?;

    let attempt = engine.start_attempt(&actor, quiz.quiz.id).await?;
    for response in &sheet.responses {
        let Some(question) = quiz.question_by_order(response.question) else {
            tracing::warn!(order = response.question, "no question with this order, skipping");
            continue;
        };
        let Some(answer) = resolve_answer(question, &response.answer) else {
            tracing::warn!(
                order = response.question,
                answer = ?response.answer,
                "no matching answer, skipping"
            );
            continue;
        };

        let submission = Submission {
            attempt: attempt.id,
            question: question.question.id,
            answer: answer.id,
            time_taken: response.time_taken(),
        };
        if let Err(e) = engine.submit_answer(&actor, &submission).await {
            tracing::warn!(order = response.question, "submission rejected: {e}");
        }
    }
    engine.complete_attempt(&actor, attempt.id).await?;
    workspace.persist().await?;

    let detail = engine.get_attempt(&actor, attempt.id).await?;
    let report = AttemptReport::build(&quiz, &detail);
    let report_path = workspace
        .config
        .reports_dir
        .join(format!("attempt-{}.json", report.id));
    report
        .save_json(&report_path)
        .with_context(|| format!("failed to save report for attempt {}", report.id))?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "markdown" | "md" => print!("{}", report.to_markdown()),
        _ => print_summary(&report),
    }
    eprintln!("Report saved to: {}", report_path.display());
    Ok(())
}

/// Find the answer a sheet response points at.
fn resolve_answer<'a>(question: &'a QuestionDetail, answer: &AnswerRef) -> Option<&'a Answer> {
    match answer {
        AnswerRef::Order(order) => question.answers.iter().find(|a| a.order == *order),
        AnswerRef::Text(text) => question
            .answers
            .iter()
            .find(|a| a.text.trim().eq_ignore_ascii_case(text.trim())),
    }
}

fn print_summary(report: &AttemptReport) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Selected", "Correct answer", "Result"]);
    for o in &report.outcomes {
        let result = match (&o.selected, o.is_correct) {
            (None, _) => "skipped",
            (Some(_), true) => "correct",
            (Some(_), false) => "wrong",
        };
        table.add_row(vec![
            Cell::new(o.order),
            Cell::new(&o.question),
            Cell::new(o.selected.as_deref().unwrap_or("-")),
            Cell::new(o.correct_answer.as_deref().unwrap_or("-")),
            Cell::new(result),
        ]);
    }
    println!("{table}");
    println!(
        "\nScore: {}/{} ({:.0}%)",
        report.score,
        report.total,
        report.percentage()
    );
}
