//! Ask command handler.
//!
//! Optionally uploads documents, then answers a single question.

use super::{describe_upload, print_stream};
use aidoc_core::{AppError, AppResult};
use aidoc_knowledge::QaSession;
use clap::Args;
use std::path::PathBuf;

/// Ask one question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Documents to answer from instead of the default corpus
    #[arg(short, long, value_name = "FILE", num_args = 1..)]
    pub upload: Vec<PathBuf>,

    /// Wait for the complete answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON (implies --no-stream)
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, session: &QaSession) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let upload = if self.upload.is_empty() {
            None
        } else {
            let summary = session.upload(self.upload.clone()).await?;
            if !self.json {
                eprintln!("{}", describe_upload(&summary));
            }
            Some(summary)
        };

        let question = self.question_text();

        if self.json {
            let answer = session.ask(&question).await?;
            let output = serde_json::json!({
                "question": question,
                "answer": answer.text,
                "source": answer.source,
                "upload": upload,
            });
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else if self.no_stream {
            let answer = session.ask(&question).await?;
            println!("{}", answer.text);
            tracing::debug!("Answered from {} index", answer.source.as_str());
        } else {
            let stream = session.ask_streaming(&question).await?;
            print_stream(stream).await?;
        }

        Ok(())
    }

    /// The question words joined with single spaces.
    pub fn question_text(&self) -> String {
        self.question.join(" ")
    }
}
