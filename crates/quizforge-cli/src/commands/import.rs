//! The `quizforge import` command.

use std::path::PathBuf;

use anyhow::Result;

use quizforge_core::parser::parse_quiz_file;
use quizforge_core::QuizService;

use super::Workspace;

pub async fn execute(
    quiz_path: PathBuf,
    user: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref())?;
    let actor = workspace.config.actor(user.as_deref())?;
    let draft = parse_quiz_file(&quiz_path)?;

    let service = QuizService::new(workspace.store.clone());
    let created = service.create_quiz(&actor, &draft).await?;
    workspace.persist().await?;

    println!(
        "Imported '{}' as {} ({} questions, {})",
        created.quiz.title,
        created.quiz.slug,
        created.question_count(),
        created.quiz.status
    );
    Ok(())
}
