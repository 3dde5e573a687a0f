//! The `quizforge list` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::QuizService;

use super::Workspace;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let service = QuizService::new(workspace.store.clone());
    let quizzes = service.list_quizzes().await?;

    if quizzes.is_empty() {
        println!("No quizzes yet. Run `quizforge import --quiz <file>` to add one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Slug", "Title", "Status", "Questions", "Author"]);
    for detail in &quizzes {
        table.add_row(vec![
            Cell::new(&detail.quiz.slug),
            Cell::new(&detail.quiz.title),
            Cell::new(detail.quiz.status),
            Cell::new(detail.question_count()),
            Cell::new(&detail.quiz.author),
        ]);
    }
    println!("{table}");
    Ok(())
}
