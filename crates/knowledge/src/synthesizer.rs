//! Answer synthesis from a question and retrieved passages.
//!
//! Renders the prompt definition over a bounded context and calls the
//! language model, either blocking or streaming. Provider failures surface
//! as `AppError::SynthesisService`; nothing is substituted for a failed call.

use crate::types::Passage;
use aidoc_core::config::{EmptyRetrievalPolicy, LlmSettings, PipelineSettings};
use aidoc_core::{AppError, AppResult};
use aidoc_llm::{LlmClient, LlmRequest};
use aidoc_prompt::{build_prompt, PromptDefinition, VAR_CONTEXT, VAR_QUESTION};
use futures::{future, Stream, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

/// Separator placed between passages in the model context.
const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Answer text increments. Dropping the stream abandons the model call.
pub type AnswerStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// Model parameters used for synthesis.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_context_chars: usize,
    pub empty_retrieval: EmptyRetrievalPolicy,
}

impl SynthesisOptions {
    pub fn from_settings(llm: &LlmSettings, pipeline: &PipelineSettings) -> Self {
        Self {
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            max_context_chars: pipeline.max_context_chars,
            empty_retrieval: pipeline.empty_retrieval,
        }
    }
}

/// Produces answers with a language model.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    options: SynthesisOptions,
}

impl AnswerSynthesizer {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        options: SynthesisOptions,
    ) -> Self {
        Self {
            client,
            prompt,
            options,
        }
    }

    /// Synthesize a complete answer.
    ///
    /// With no passages, the "no context found" branch of the prompt is used
    /// unless the empty-retrieval policy is `Fail`, in which case this returns
    /// `NoContext` without calling the model.
    pub async fn synthesize(&self, question: &str, passages: &[Passage]) -> AppResult<String> {
        let request = self.build_request(question, passages)?;

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(into_synthesis_error)?;

        tracing::debug!(
            "Synthesized {} chars with {} ({} completion tokens)",
            response.content.len(),
            response.model,
            response.usage.completion_tokens
        );

        Ok(response.content)
    }

    /// Synthesize an answer as a stream of text increments.
    ///
    /// The increments concatenate to the full answer. The stream ends after
    /// the model's final chunk or the first error.
    pub async fn synthesize_stream(
        &self,
        question: &str,
        passages: &[Passage],
    ) -> AppResult<AnswerStream> {
        let request = self.build_request(question, passages)?.with_streaming();

        let chunks = self
            .client
            .stream(&request)
            .await
            .map_err(into_synthesis_error)?;

        let increments = chunks
            .scan(false, |finished, item| {
                if *finished {
                    return future::ready(None);
                }
                let next = match item {
                    Ok(chunk) => {
                        *finished = chunk.done;
                        Ok(chunk.content)
                    }
                    Err(e) => {
                        *finished = true;
                        Err(into_synthesis_error(e))
                    }
                };
                future::ready(Some(next))
            })
            .try_filter(|text| future::ready(!text.is_empty()));

        Ok(Box::pin(increments))
    }

    fn build_request(&self, question: &str, passages: &[Passage]) -> AppResult<LlmRequest> {
        if passages.is_empty() {
            match self.options.empty_retrieval {
                EmptyRetrievalPolicy::Fail => return Err(AppError::NoContext),
                EmptyRetrievalPolicy::GeneralAnswer => {
                    tracing::info!("No passages retrieved; requesting a general answer")
                }
            }
        }

        let context = build_context(passages, self.options.max_context_chars);

        let mut variables = HashMap::new();
        variables.insert(VAR_QUESTION.to_string(), question.to_string());
        variables.insert(VAR_CONTEXT.to_string(), context);

        let built = build_prompt(&self.prompt, variables)?;

        tracing::debug!(
            "Built prompt '{}' ({} chars, context included: {})",
            built.metadata.source_prompt_id,
            built.user.len(),
            built.metadata.context_included
        );

        let mut request = LlmRequest::new(built.user, &self.options.model)
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        Ok(request)
    }
}

/// Concatenate passages, most relevant first, within `max_chars` characters.
///
/// Passages are kept whole while they fit; the first one is truncated if it
/// alone exceeds the bound, and the rest are dropped once one does not fit.
fn build_context(passages: &[Passage], max_chars: usize) -> String {
    let separator_len = PASSAGE_SEPARATOR.chars().count();
    let mut context = String::new();
    let mut used = 0;

    for (i, passage) in passages.iter().enumerate() {
        let block = format!("[Excerpt {}]\n{}", i + 1, passage.text.trim());
        let block_len = block.chars().count();

        if i == 0 {
            if block_len > max_chars {
                context = block.chars().take(max_chars).collect();
                break;
            }
            context.push_str(&block);
            used = block_len;
            continue;
        }

        if used + separator_len + block_len > max_chars {
            tracing::debug!(
                "Context bound reached: kept {} of {} passages",
                i,
                passages.len()
            );
            break;
        }

        context.push_str(PASSAGE_SEPARATOR);
        context.push_str(&block);
        used += separator_len + block_len;
    }

    context
}

fn into_synthesis_error(err: AppError) -> AppError {
    match err {
        AppError::SynthesisService(_) => err,
        other => AppError::SynthesisService(other.to_string()),
    }
}
