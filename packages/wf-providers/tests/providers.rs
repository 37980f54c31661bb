use axum::{Json, Router, http::HeaderMap, routing::post};
use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};
use tokio::net::TcpListener;

use wf_providers::generator::{self, GenerationCall};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		wf_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = wf_providers::auth_headers("secret", &defaults).expect_err("Expected config error.");

	assert!(err.to_string().contains("Default header values must be strings."));
}

async fn spawn_stub(content: &'static str) -> String {
	let app = Router::new().route(
		"/v1/chat/completions",
		post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
			let auth = headers
				.get(AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.unwrap_or_default()
				.to_string();
			let echoed_schema = body.get("response_format").is_some();

			Json(serde_json::json!({
				"choices": [
					{ "message": { "content": format!("{content}|{auth}|{echoed_schema}") } }
				]
			}))
		}),
	);
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind stub listener.");
	let addr = listener.local_addr().expect("Missing local address.");

	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});

	format!("http://{addr}")
}

fn cfg(api_base: String) -> wf_config::LlmProviderConfig {
	wf_config::LlmProviderConfig {
		provider_id: "stub".to_string(),
		api_base,
		api_key: "stub-key".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "stub-model".to_string(),
		temperature: 0.2,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	}
}

#[tokio::test]
async fn complete_returns_message_content() {
	let api_base = spawn_stub("hello").await;
	let schema = serde_json::json!({ "type": "array" });
	let call =
		GenerationCall { prompt: "Say hello.", schema_name: "examples", response_schema: Some(&schema) };
	let content = generator::complete(&cfg(api_base), &call).await.expect("Generation failed.");

	assert_eq!(content, "hello|Bearer stub-key|true");
}

#[tokio::test]
async fn complete_surfaces_http_errors() {
	let api_base = spawn_stub("hello").await;
	let mut cfg = cfg(api_base);

	cfg.path = "/missing".to_string();

	let call = GenerationCall { prompt: "Say hello.", schema_name: "example", response_schema: None };
	let err = generator::complete(&cfg, &call).await.expect_err("Expected HTTP error.");

	assert!(matches!(err, wf_providers::Error::Reqwest(_)), "Unexpected error: {err}");
}
