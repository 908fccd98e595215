use std::io::{stdout, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use futures::StreamExt;
use tracing::{error, info};

use crate::ollama::{GenerateRequest, OllamaClient, OllamaError};
use super::display::{display_models, print_header};
use super::prompts::{
    explain_prompt, review_prompt, summarize_prompt, translate_prompt, translate_system,
    CODE_SYSTEM, EXPLAIN_SYSTEM, REVIEW_SYSTEM, SUMMARIZE_SYSTEM,
};

/// Shared state for every chat command: the client plus the request defaults
/// resolved from settings and CLI flags.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub client: OllamaClient,
    pub model: String,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatContext {
    pub fn request(&self, prompt: &str, system: Option<String>, context: Option<Vec<i64>>) -> GenerateRequest {
        GenerateRequest::new(self.model.clone(), prompt)
            .with_system(system)
            .with_context(context)
            .with_options(self.temperature, self.max_tokens)
    }

    /// Fails with a hint when Ollama cannot be reached.
    pub async fn ensure_connected(&self) -> Result<(), OllamaError> {
        if self.client.check_connection().await {
            return Ok(());
        }
        println!("{} Ollama is not running or not accessible.", "❌ Error:".red());
        println!("{} Start it with: llamabox start", "💡 Tip:".yellow());
        Err(OllamaError::ServerNotRunning(self.client.base_url().to_string()))
    }

    /// Sends one prompt and writes the answer to `out`, streaming when enabled.
    ///
    /// Returns the conversation context reported by the server, if any.
    pub async fn respond<W: Write>(
        &self,
        out: &mut W,
        prompt: &str,
        system: Option<String>,
        context: Option<Vec<i64>>,
    ) -> Result<Option<Vec<i64>>, OllamaError> {
        let request = self.request(prompt, system, context);

        if self.stream {
            let mut chunks = self.client.generate_stream(&request).await?;
            let mut last_context = None;
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                write!(out, "{}", chunk.response).map_err(stream_write_error)?;
                out.flush().map_err(stream_write_error)?;
                if chunk.done {
                    last_context = chunk.context;
                }
            }
            writeln!(out).map_err(stream_write_error)?;
            Ok(last_context)
        } else {
            let response = self.client.generate(&request).await?;
            writeln!(out, "{}", response.response).map_err(stream_write_error)?;
            Ok(response.context)
        }
    }
}

fn stream_write_error(e: std::io::Error) -> OllamaError {
    OllamaError::Model(format!("failed to write output: {}", e))
}

async fn answer(context: &ChatContext, prompt: &str, system: Option<String>) -> Result<()> {
    let mut out = stdout();
    context
        .respond(&mut out, prompt, system, None)
        .await
        .map_err(|e| {
            error!("Generation failed: {}", e);
            e
        })?;
    Ok(())
}

pub async fn handle_chat_once(context: &ChatContext, message: &str) -> Result<()> {
    context.ensure_connected().await?;
    info!("One-shot chat with {}", context.model);

    print_header(&format!("Chat with {}", context.model));
    println!("{} {}", "👤 You:".green(), message);
    print!("{} ", "🤖 AI:".blue());
    stdout().flush().ok();

    answer(context, message, None).await
}

pub async fn handle_code(context: &ChatContext, prompt: &str) -> Result<()> {
    context.ensure_connected().await?;

    print_header("Code Assistant");
    println!("{} {}", "📝 Request:".green(), prompt);
    println!("{}\n", "💻 AI Response:".blue());

    answer(context, prompt, Some(CODE_SYSTEM.to_string())).await
}

pub async fn handle_explain(context: &ChatContext, topic: &str) -> Result<()> {
    context.ensure_connected().await?;
    let prompt = explain_prompt(topic).with_context(|| format!("Error reading file: {}", topic))?;

    print_header("Explanation");
    println!("{} {}", "❓ Topic:".green(), topic);
    println!("{}\n", "📚 Explanation:".blue());

    answer(context, &prompt, Some(EXPLAIN_SYSTEM.to_string())).await
}

pub async fn handle_translate(context: &ChatContext, text: &str, language: &str) -> Result<()> {
    context.ensure_connected().await?;

    print_header(&format!("Translation to {}", language));
    println!("{} {}", "🌐 Original:".green(), text);
    println!("{}\n", "🔄 Translation:".blue());

    answer(context, &translate_prompt(text, language), Some(translate_system(language))).await
}

pub async fn handle_summarize(context: &ChatContext, input: &str) -> Result<()> {
    context.ensure_connected().await?;
    let (prompt, description) =
        summarize_prompt(input).with_context(|| format!("Error reading file: {}", input))?;

    print_header("Summary");
    println!("{} {}", "📄 Input:".green(), description);
    println!("{}\n", "📝 Summary:".blue());

    answer(context, &prompt, Some(SUMMARIZE_SYSTEM.to_string())).await
}

pub async fn handle_review(context: &ChatContext, file: &Path) -> Result<()> {
    context.ensure_connected().await?;
    let prompt = review_prompt(file)?;

    print_header(&format!("Code Review: {}", file.display()));
    println!("{} {}", "🔍 Reviewing:".green(), file.display());
    println!("{}\n", "📋 Review:".blue());

    answer(context, &prompt, Some(REVIEW_SYSTEM.to_string())).await
}

pub async fn handle_list_models(context: &ChatContext) -> Result<()> {
    let models = context.client.list_models().await?;
    display_models(&models);
    Ok(())
}
