//! The `quizforge attempts` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::{AttemptEngine, QuizService};

use super::Workspace;

pub async fn execute(user: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let actor = workspace.config.actor(user.as_deref())?;
    let service = QuizService::new(workspace.store.clone());
    let engine = AttemptEngine::new(workspace.store.clone());

    let attempts = engine.list_attempts(&actor).await?;
    if attempts.is_empty() {
        println!("No attempts for {actor}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Attempt", "Quiz", "State", "Score", "Answered", "Started"]);
    for detail in &attempts {
        let attempt = &detail.attempt;
        let (slug, total) = match service.get_quiz_by_id(attempt.quiz).await {
            Ok(quiz) => (quiz.quiz.slug.clone(), quiz.question_count()),
            Err(e) if e.is_not_found() => ("-".to_string(), 0),
            Err(e) => return Err(e.into()),
        };
        table.add_row(vec![
            Cell::new(attempt.id),
            Cell::new(slug),
            Cell::new(attempt.state()),
            Cell::new(format!("{}/{}", attempt.score_value(), total)),
            Cell::new(detail.question_attempts.len()),
            Cell::new(attempt.created.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
    Ok(())
}
