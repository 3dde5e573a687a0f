//! The `quizforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizforge_core::parser::{lint_quiz, load_quiz_directory, parse_quiz_file};
use quizforge_core::validate::validate_for_save;

pub fn execute(quiz_path: PathBuf) -> Result<()> {
    let drafts = if quiz_path.is_dir() {
        load_quiz_directory(&quiz_path)?
    } else {
        vec![(quiz_path.clone(), parse_quiz_file(&quiz_path)?)]
    };

    let mut total_warnings = 0;
    let mut invalid = 0;

    for (path, draft) in &drafts {
        println!(
            "Quiz: {} ({} questions) [{}]",
            draft.title,
            draft.questions.len(),
            path.display()
        );

        if let Err(e) = validate_for_save(draft) {
            println!("  ERROR: {e}");
            invalid += 1;
        }

        let warnings = lint_quiz(draft);
        for w in &warnings {
            let prefix = w
                .question
                .map(|n| format!("  [question {n}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} invalid quiz file(s)");
    }

    if total_warnings == 0 {
        println!("All quizzes valid.");
    } else {
        println!("\nAll quizzes valid, {total_warnings} warning(s) found.");
    }

    Ok(())
}
