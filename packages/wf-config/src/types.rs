use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub queue: Queue,
	#[serde(default)]
	pub generation: Generation,
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub generator: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Background queue tuning. Every field has a default so the whole table is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Queue {
	/// Maximum number of pending items claimed by one processing pass.
	pub batch_size: u32,
	/// Failed attempts after which an item becomes terminally failed.
	pub max_attempts: u32,
	/// How long a claim stays valid before a crashed pass's items become reclaimable.
	pub lease_seconds: u64,
	/// Sleep between passes in the standalone worker.
	pub poll_interval_ms: u64,
	/// Run another pass right away when a pass claimed a full batch.
	pub chain_full_batches: bool,
	/// Dispatch a pass after a bulk retry resets failed items.
	pub retry_triggers_pass: bool,
}
impl Default for Queue {
	fn default() -> Self {
		Self {
			batch_size: 5,
			max_attempts: 3,
			lease_seconds: 300,
			poll_interval_ms: 2_000,
			chain_full_batches: true,
			retry_triggers_pass: true,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Generation {
	pub examples_per_word: u32,
	pub max_context_words: u32,
}
impl Default for Generation {
	fn default() -> Self {
		Self { examples_per_word: 3, max_context_words: 30 }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
	pub admin_auth_token: Option<String>,
}
