//! Command handlers for the AI-DOC CLI.

pub mod ask;
pub mod chat;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;

use aidoc_core::{AppError, AppResult};
use aidoc_knowledge::{AnswerStream, UploadSummary};
use futures::StreamExt;
use std::io::Write;

/// Render an error by kind on stderr. Errors never go to stdout.
pub fn report_error(err: &AppError) {
    eprintln!("{}", format_error(err));
}

fn format_error(err: &AppError) -> String {
    format!("error[{}]: {}", err.kind(), err)
}

/// Print answer increments to stdout as they arrive; returns the full text.
async fn print_stream(mut stream: AnswerStream) -> AppResult<String> {
    let mut full = String::new();
    let mut stdout = std::io::stdout();

    while let Some(increment) = stream.next().await {
        let increment = match increment {
            Ok(text) => text,
            Err(e) => {
                // Terminate the partial line before the error is reported
                if !full.is_empty() {
                    println!();
                }
                return Err(e);
            }
        };
        print!("{}", increment);
        stdout.flush().ok();
        full.push_str(&increment);
    }

    println!();
    Ok(full)
}

fn describe_upload(summary: &UploadSummary) -> String {
    format!(
        "Indexed {} file(s) into {} passages: {}",
        summary.files.len(),
        summary.passage_count,
        summary.files.join(", ")
    )
}
