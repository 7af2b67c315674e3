use anyhow::Result;
use clap::Subcommand;
use operrouter_sdk::mapping::message_role;
use operrouter_sdk::{CallContext, ChatMessage, LlmConfig, MessageRole, OperRouterClient};
use serde_json::Value as JsonValue;

use super::{Report, parse_key_value};

#[derive(Debug, Clone, Subcommand)]
pub enum LlmCommand {
    /// Register an LLM
    Create {
        name: String,
        /// openai, ollama, anthropic, local or any provider the router knows
        #[arg(long)]
        provider: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        api_key: Option<String>,
        /// Provider option, repeatable (`temperature=0.2`)
        #[arg(long = "option", value_parser = parse_key_value)]
        options: Vec<(String, JsonValue)>,
    },
    /// Complete a prompt
    Generate { name: String, prompt: String },
    /// Chat completion over `role:content` messages, in order
    Chat {
        name: String,
        #[arg(long = "message", value_parser = parse_message, required = true)]
        messages: Vec<ChatMessage>,
    },
    /// Embed a text
    Embed { name: String, text: String },
    /// Health check of an LLM
    Ping { name: String },
    /// Release an LLM
    Close { name: String },
}

impl LlmCommand {
    pub(super) async fn run(
        &self,
        client: &dyn OperRouterClient,
        ctx: &CallContext,
    ) -> Result<Report> {
        match self {
            Self::Create {
                name,
                provider,
                model,
                api_key,
                options,
            } => {
                let mut config = LlmConfig::new(provider.as_str(), model.as_str());
                if let Some(key) = api_key {
                    config = config.with_api_key(key.as_str());
                }
                for (key, value) in options {
                    config = config.with_option(key.as_str(), value.clone());
                }
                let resp = client.create_llm(ctx, name, &config).await?;
                Report::new(&resp, resp.success)
            }
            Self::Generate { name, prompt } => {
                let resp = client.generate_llm(ctx, name, prompt).await?;
                Report::new(&resp, resp.success)
            }
            Self::Chat { name, messages } => {
                let resp = client.chat_llm(ctx, name, messages).await?;
                Report::new(&resp, resp.success)
            }
            Self::Embed { name, text } => {
                let resp = client.embedding_llm(ctx, name, text).await?;
                Report::new(&resp, resp.success)
            }
            Self::Ping { name } => {
                let resp = client.ping_llm(ctx, name).await?;
                Report::new(&resp, resp.success)
            }
            Self::Close { name } => {
                let resp = client.close_llm(ctx, name).await?;
                Report::new(&resp, resp.success)
            }
        }
    }
}

/// Parse `role:content`.
fn parse_message(raw: &str) -> Result<ChatMessage, String> {
    let (role, content) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected role:content, got '{raw}'"))?;
    let role = role.trim();
    match message_role(role) {
        MessageRole::Unspecified => Err(format!(
            "unknown role '{role}' (expected system, user or assistant)"
        )),
        known => Ok(ChatMessage::new(known, content.trim_start())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_keeps_colons_in_content() {
        let msg = parse_message("user: time is 12:30").unwrap();
        assert_eq!(msg, ChatMessage::user("time is 12:30"));
    }

    #[test]
    fn message_rejects_unknown_role() {
        assert!(parse_message("robot: beep").is_err());
        assert!(parse_message("no separator").is_err());
    }
}
