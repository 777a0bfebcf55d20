//! Line framing for streamed HTTP bodies.
//!
//! Network frames do not respect line boundaries, so bytes are buffered
//! until a full `\n`-terminated line is available. Whatever is left when the
//! body ends is emitted as a final line.

use aidoc_core::{AppError, AppResult};
use futures::{Stream, StreamExt};

/// Turn a byte stream into a stream of non-empty, trimmed lines.
pub(crate) fn split_lines<S, B, E>(bytes: S) -> impl Stream<Item = AppResult<String>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    // `None` marks the end of the body
    bytes
        .map(Some)
        .chain(futures::stream::once(futures::future::ready(None)))
        .scan(Vec::new(), |buffer: &mut Vec<u8>, chunk| {
            let lines = match chunk {
                Some(Ok(chunk)) => {
                    buffer.extend_from_slice(chunk.as_ref());
                    Ok(drain_complete_lines(buffer))
                }
                Some(Err(e)) => Err(AppError::Llm(format!("Stream error: {}", e))),
                None => Ok(flush_remainder(buffer)),
            };
            futures::future::ready(Some(lines))
        })
        .flat_map(|result| {
            let items: Vec<AppResult<String>> = match result {
                Ok(lines) => lines.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(items)
        })
}

fn drain_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        push_trimmed(&mut lines, &line);
    }
    lines
}

fn flush_remainder(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    let rest = std::mem::take(buffer);
    push_trimmed(&mut lines, &rest);
    lines
}

fn push_trimmed(lines: &mut Vec<String>, raw: &[u8]) {
    let text = String::from_utf8_lossy(raw).trim().to_string();
    if !text.is_empty() {
        lines.push(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_split_across_frames() {
        let frames: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"{\"a\":1}\n{\"b\"".to_vec()),
            Ok(b":2}\n\n".to_vec()),
            Ok(b"{\"c\":3}\n".to_vec()),
        ];

        let lines: Vec<String> = split_lines(futures::stream::iter(frames))
            .map(|l| l.unwrap())
            .collect()
            .await;

        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"]);
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_frames() {
        let text = "héllo\n".as_bytes();
        let frames: Vec<Result<Vec<u8>, std::io::Error>> =
            vec![Ok(text[..2].to_vec()), Ok(text[2..].to_vec())];

        let lines: Vec<String> = split_lines(futures::stream::iter(frames))
            .map(|l| l.unwrap())
            .collect()
            .await;

        assert_eq!(lines, vec!["héllo"]);
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_flushed() {
        let frames: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"{\"a\":1}\n{\"done\"".to_vec()),
            Ok(b":true}".to_vec()),
        ];

        let lines: Vec<String> = split_lines(futures::stream::iter(frames))
            .map(|l| l.unwrap())
            .collect()
            .await;

        assert_eq!(lines, vec!["{\"a\":1}", "{\"done\":true}"]);
    }

    #[tokio::test]
    async fn test_transport_error_is_surfaced() {
        let frames: Vec<Result<Vec<u8>, std::io::Error>> = vec![Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ))];

        let items: Vec<AppResult<String>> =
            split_lines(futures::stream::iter(frames)).collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(AppError::Llm(_))));
    }
}
