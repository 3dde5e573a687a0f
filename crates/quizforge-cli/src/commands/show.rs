//! The `quizforge show` command.

use std::path::PathBuf;

use anyhow::Result;

use quizforge_core::model::QuizDetail;
use quizforge_core::QuizService;

use super::Workspace;

pub async fn execute(slug: String, format: String, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let service = QuizService::new(workspace.store.clone());
    let detail = service.get_quiz(&slug).await?;

    match format.as_str() {
        "markdown" | "md" => print!("{}", to_markdown(&detail)),
        _ => println!("{}", serde_json::to_string_pretty(&detail)?),
    }
    Ok(())
}

fn to_markdown(detail: &QuizDetail) -> String {
    let mut md = format!("# {}\n\n", detail.quiz.title);
    if !detail.quiz.description.is_empty() {
        md.push_str(&format!("{}\n\n", detail.quiz.description));
    }
    for q in &detail.questions {
        md.push_str(&format!("{}. {}\n", q.question.order, q.question.text));
        for a in &q.answers {
            let mark = if a.is_correct { "x" } else { " " };
            md.push_str(&format!("   - [{mark}] {}\n", a.text));
        }
        md.push('\n');
    }
    md
}
