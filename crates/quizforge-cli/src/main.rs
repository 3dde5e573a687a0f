//! quizforge CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quizforge",
    version,
    about = "Quiz authoring validation and attempt scoring"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example quiz
    Init,

    /// Validate quiz TOML files
    Validate {
        /// Path to quiz file or directory
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Import a quiz file into the store
    Import {
        /// Path to quiz file
        #[arg(long)]
        quiz: PathBuf,

        /// Acting user (defaults to `default_user` from config)
        #[arg(long)]
        user: Option<String>,
    },

    /// List stored quizzes
    List,

    /// Print a quiz with its questions and answers
    Show {
        /// Quiz slug
        #[arg(long)]
        slug: String,

        /// Output format: json, markdown
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Take a quiz using an answer sheet
    Take {
        /// Quiz slug
        #[arg(long)]
        slug: String,

        /// Answer sheet TOML
        #[arg(long)]
        answers: PathBuf,

        /// Acting user (defaults to `default_user` from config)
        #[arg(long)]
        user: Option<String>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List a user's attempts
    Attempts {
        /// Acting user (defaults to `default_user` from config)
        #[arg(long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "quizforge=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Import { quiz, user } => commands::import::execute(quiz, user, config).await,
        Commands::List => commands::list::execute(config).await,
        Commands::Show { slug, format } => commands::show::execute(slug, format, config).await,
        Commands::Take {
            slug,
            answers,
            user,
            format,
        } => commands::take::execute(slug, answers, user, format, config).await,
        Commands::Attempts { user } => commands::attempts::execute(user, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
