//! AI-DOC CLI
//!
//! Main entry point for the aidoc command-line tool.
//! Answers medical questions from uploaded documents or the default corpus.

mod commands;

use aidoc_core::{config::AppConfig, logging, AppError};
use aidoc_knowledge::QaSession;
use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// AI-DOC - medical question answering over your documents
#[derive(Parser, Debug)]
#[command(name = "aidoc")]
#[command(about = "Medical question answering over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "AIDOC_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "AIDOC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// LLM provider (ollama, groq, openai)
    #[arg(short, long, global = true, env = "AIDOC_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "AIDOC_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask one question
    Ask(AskCommand),

    /// Interactive question-and-answer session
    Chat(ChatCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<AppError>() {
                Some(app_err) => commands::report_error(app_err),
                None => eprintln!("error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load base configuration from environment and config file
    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("AI-DOC CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.llm.provider, config.llm.model);

    let session = QaSession::from_config(&config).context("failed to set up session")?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&session).await,
        Commands::Chat(cmd) => cmd.execute(&session).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_uploads() {
        let cli = Cli::try_parse_from([
            "aidoc",
            "-p",
            "groq",
            "ask",
            "What",
            "is",
            "anemia?",
            "--upload",
            "a.pdf",
            "b.pdf",
            "--no-stream",
        ])
        .unwrap();

        assert_eq!(cli.provider.as_deref(), Some("groq"));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.question_text(), "What is anemia?");
                assert_eq!(cmd.upload.len(), 2);
                assert!(cmd.no_stream);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["aidoc", "ask"]).is_err());
    }

    #[test]
    fn test_parse_chat() {
        let cli = Cli::try_parse_from(["aidoc", "--verbose", "chat"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Chat(_)));
    }
}
