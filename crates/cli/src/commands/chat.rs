//! Interactive chat command.
//!
//! Reads one line at a time from stdin. Lines starting with `:` are
//! session commands; anything else is a question. A failed question is
//! reported and the loop continues.

use super::{describe_upload, print_stream, report_error};
use aidoc_core::AppResult;
use aidoc_knowledge::QaSession;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  :upload <file>...  answer from these documents (replaces earlier uploads)
  :status            show which index answers questions
  :help              show this help
  :quit              exit
Anything else is asked as a question.";

/// Interactive question-and-answer session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Documents to upload before the first question
    #[arg(short, long, value_name = "FILE", num_args = 1..)]
    pub upload: Vec<PathBuf>,

    /// Wait for complete answers instead of streaming them
    #[arg(long)]
    pub no_stream: bool,
}

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Question(String),
    Upload(Vec<PathBuf>),
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ChatInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        let Some(command) = line.strip_prefix(':') else {
            return Self::Question(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match parts.next().unwrap_or_default() {
            "upload" | "u" => Self::Upload(parts.map(PathBuf::from).collect()),
            "status" | "s" => Self::Status,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl ChatCommand {
    /// Execute the chat loop until `:quit` or end of input.
    pub async fn execute(&self, session: &QaSession) -> AppResult<()> {
        tracing::info!("Starting chat session");

        if !self.upload.is_empty() {
            let summary = session.upload(self.upload.clone()).await?;
            eprintln!("{}", describe_upload(&summary));
        }

        eprintln!("AI-DOC chat. Type :help for commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            eprint!("> ");
            std::io::stderr().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match ChatInput::parse(&line) {
                ChatInput::Empty => continue,
                ChatInput::Quit => break,
                ChatInput::Help => eprintln!("{}", HELP),
                ChatInput::Status => eprintln!("state: {}", session.state()),
                ChatInput::Unknown(cmd) => {
                    eprintln!("unknown command ':{}'. Type :help for commands.", cmd)
                }
                ChatInput::Upload(paths) => match session.upload(paths).await {
                    Ok(summary) => eprintln!("{}", describe_upload(&summary)),
                    Err(e) => report_error(&e),
                },
                ChatInput::Question(question) => {
                    if let Err(e) = self.answer(session, &question).await {
                        report_error(&e);
                    }
                }
            }
        }

        tracing::info!("Chat session ended");
        Ok(())
    }

    async fn answer(&self, session: &QaSession, question: &str) -> AppResult<()> {
        if self.no_stream {
            let answer = session.ask(question).await?;
            println!("{}", answer.text);
        } else {
            let stream = session.ask_streaming(question).await?;
            print_stream(stream).await?;
        }
        Ok(())
    }
}
