mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Generation, LlmProviderConfig, Postgres, Providers, Queue, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in
		[("service.http_bind", &cfg.service.http_bind), ("service.admin_bind", &cfg.service.admin_bind)]
	{
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	let generator = &cfg.providers.generator;

	if generator.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "Provider generator api_key must be non-empty.".to_string(),
		});
	}
	if generator.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.generator.model must be non-empty.".to_string(),
		});
	}
	if generator.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.generator.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !generator.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.generator.temperature must be a finite number.".to_string(),
		});
	}
	if !(0.0..=2.0).contains(&generator.temperature) {
		return Err(Error::Validation {
			message: "providers.generator.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}

	for (label, value) in [
		("queue.batch_size", u64::from(cfg.queue.batch_size)),
		("queue.max_attempts", u64::from(cfg.queue.max_attempts)),
		("queue.lease_seconds", cfg.queue.lease_seconds),
		("queue.poll_interval_ms", cfg.queue.poll_interval_ms),
		("generation.examples_per_word", u64::from(cfg.generation.examples_per_word)),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	// The lease is renewed per item, so it only has to outlast one generation call.
	if cfg.queue.lease_seconds.saturating_mul(1_000) <= generator.timeout_ms {
		return Err(Error::Validation {
			message: "queue.lease_seconds must be longer than providers.generator.timeout_ms."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.security
		.admin_auth_token
		.as_deref()
		.map(|token| token.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_auth_token = None;
	}
}
