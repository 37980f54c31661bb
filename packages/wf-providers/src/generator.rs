use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// A single text-generation call.
///
/// `response_schema` constrains the output to JSON matching the schema; without it the model
/// answers in free text.
#[derive(Clone, Debug)]
pub struct GenerationCall<'a> {
	pub prompt: &'a str,
	pub schema_name: &'a str,
	pub response_schema: Option<&'a Value>,
}

/// Sends one chat-completion request and returns the raw message content.
///
/// No retries happen here; callers own the retry policy.
pub async fn complete(cfg: &wf_config::LlmProviderConfig, call: &GenerationCall<'_>) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = request_body(cfg, call);
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	tracing::debug!(model = %cfg.model, provider_id = %cfg.provider_id, "Generation call completed.");

	parse_completion_content(&json)
}

fn request_body(cfg: &wf_config::LlmProviderConfig, call: &GenerationCall<'_>) -> Value {
	let mut body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [
			{ "role": "user", "content": call.prompt }
		],
	});

	if let Some(schema) = call.response_schema {
		body["response_format"] = serde_json::json!({
			"type": "json_schema",
			"json_schema": {
				"name": call.schema_name,
				"schema": schema,
			},
		});
	}

	body
}

fn parse_completion_content(json: &Value) -> Result<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Generation response is missing message content.".to_string(),
		})?;

	if content.trim().is_empty() {
		return Err(Error::InvalidResponse {
			message: "Generation response content is empty.".to_string(),
		});
	}

	Ok(content.to_string())
}
