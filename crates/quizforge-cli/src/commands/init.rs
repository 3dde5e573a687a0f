//! The `quizforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizforge.toml").exists() {
        println!("quizforge.toml already exists, skipping.");
    } else {
        std::fs::write("quizforge.toml", SAMPLE_CONFIG)?;
        println!("Created quizforge.toml");
    }

    std::fs::create_dir_all("quizzes")?;
    let example_path = std::path::Path::new("quizzes/example.toml");
    if example_path.exists() {
        println!("quizzes/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ)?;
        println!("Created quizzes/example.toml");
    }

    let sheet_path = std::path::Path::new("quizzes/example-answers.toml");
    if sheet_path.exists() {
        println!("quizzes/example-answers.toml already exists, skipping.");
    } else {
        std::fs::write(sheet_path, EXAMPLE_ANSWERS)?;
        println!("Created quizzes/example-answers.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set default_user in quizforge.toml");
    println!("  2. Run: quizforge validate --quiz quizzes/example.toml");
    println!("  3. Run: quizforge import --quiz quizzes/example.toml");
    println!("  4. Run: quizforge take --slug rust-basics --answers quizzes/example-answers.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

store_path = "./quizforge-data/store.json"
reports_dir = "./quizforge-results"
# default_user = "${USER}"
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
title = "Rust Basics"
description = "A short warm-up on Rust fundamentals"
status = "published"

[[questions]]
type = "true_false"
text = "A `let` binding is immutable unless declared with `mut`."
correct_answer = true

[[questions]]
type = "multiple_choice"
text = "Which keyword declares a trait implementation?"

[[questions.answers]]
text = "impl"
is_correct = true

[[questions.answers]]
text = "trait"

[[questions.answers]]
text = "struct"

[[questions]]
type = "true_false"
text = "`String` and `&str` are the same type."
correct_answer = false
"#;

const EXAMPLE_ANSWERS: &str = r#"[[responses]]
question = 1
answer = "True"

[[responses]]
question = 2
answer = 0
time_taken_secs = 4.5

[[responses]]
question = 3
answer = "true"
"#;
