//! Queue Processor.
//!
//! A pass recovers expired leases, claims up to `queue.batch_size` pending items oldest first
//! under a fresh claim token, and processes them one at a time. The lease of each item is renewed
//! right before its turn, so items waiting behind slow generations are not recovered by a
//! concurrent pass; an item whose claim was lost anyway is skipped. An item that fails is pushed
//! to the back of the queue until it has used `queue.max_attempts`, then it is parked as `failed`.

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Result, WfService, generation::WordEntry};
use wf_storage::models::QueueItem;

pub const LEASE_EXPIRED_ERROR: &str = "Lease expired before processing finished.";

const MAX_ERROR_CHARS: usize = 1_024;
const SECRET_KEYS: [&str; 5] = ["api_key", "apikey", "password", "secret", "token"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
	pub recovered: u64,
	pub claimed: usize,
	pub completed: usize,
	pub requeued: usize,
	pub failed: usize,
	/// Items this pass stopped owning before their final state was written. Another pass now
	/// holds them, or their lease returns them to the queue.
	pub stranded: usize,
}
impl ProcessReport {
	pub fn merge(&mut self, other: Self) {
		self.recovered += other.recovered;
		self.claimed += other.claimed;
		self.completed += other.completed;
		self.requeued += other.requeued;
		self.failed += other.failed;
		self.stranded += other.stranded;
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemOutcome {
	Completed,
	Requeued,
	Failed,
	Stranded,
}

impl WfService {
	/// Runs one processing pass.
	pub async fn process_queue(&self) -> Result<ProcessReport> {
		let now = OffsetDateTime::now_utc();
		let mut report = ProcessReport {
			recovered: self.queue.recover_expired_leases(now, LEASE_EXPIRED_ERROR).await?,
			..Default::default()
		};

		if report.recovered > 0 {
			tracing::warn!(recovered = report.recovered, "Recovered queue items with expired leases.");
		}

		let claim_id = Uuid::new_v4();
		let items = self
			.queue
			.claim_pending(self.cfg.queue.batch_size, claim_id, now, now.saturating_add(self.lease()))
			.await?;

		report.claimed = items.len();

		if items.is_empty() {
			return Ok(report);
		}

		tracing::info!(claimed = items.len(), %claim_id, "Processing claimed queue items.");

		for item in &items {
			match self.process_claimed(item, claim_id).await {
				ItemOutcome::Completed => report.completed += 1,
				ItemOutcome::Requeued => report.requeued += 1,
				ItemOutcome::Failed => report.failed += 1,
				ItemOutcome::Stranded => report.stranded += 1,
			}
		}

		Ok(report)
	}

	fn lease(&self) -> Duration {
		Duration::seconds(i64::try_from(self.cfg.queue.lease_seconds).unwrap_or(i64::MAX))
	}

	async fn process_claimed(&self, item: &QueueItem, claim_id: Uuid) -> ItemOutcome {
		let now = OffsetDateTime::now_utc();

		match self
			.queue
			.renew_lease(item.queue_id, claim_id, now, now.saturating_add(self.lease()))
			.await
		{
			Ok(true) => self.process_item(item, claim_id).await,
			Ok(false) => {
				tracing::warn!(
					queue_id = %item.queue_id,
					word_id = %item.word_id,
					"Queue item lost its claim before processing. Skipping."
				);

				ItemOutcome::Stranded
			},
			Err(err) => {
				tracing::error!(
					queue_id = %item.queue_id,
					error = %err,
					"Failed to renew queue item lease. Skipping."
				);

				ItemOutcome::Stranded
			},
		}
	}

	async fn process_item(&self, item: &QueueItem, claim_id: Uuid) -> ItemOutcome {
		let entry = WordEntry::new(item.word_id.as_str(), item.word_text.as_str());

		match self.generate_and_store(&item.user_id, &item.profile_id, &[entry]).await {
			Ok(_) => match self.queue.complete(item.queue_id, claim_id).await {
				Ok(true) => {
					tracing::info!(
						queue_id = %item.queue_id,
						word_id = %item.word_id,
						"Queue item completed."
					);

					ItemOutcome::Completed
				},
				Ok(false) => {
					tracing::warn!(
						queue_id = %item.queue_id,
						"Queue item lost its claim before it could be completed."
					);

					ItemOutcome::Stranded
				},
				Err(err) => {
					tracing::error!(
						queue_id = %item.queue_id,
						error = %err,
						"Failed to remove completed queue item."
					);

					ItemOutcome::Stranded
				},
			},
			Err(err) => self.record_failure(item, claim_id, &err.to_string()).await,
		}
	}

	async fn record_failure(&self, item: &QueueItem, claim_id: Uuid, error: &str) -> ItemOutcome {
		let now = OffsetDateTime::now_utc();
		let attempts = item.attempts.saturating_add(1);
		let message = sanitize_error(error);
		let exhausted = i64::from(attempts) >= i64::from(self.cfg.queue.max_attempts);
		let written = if exhausted {
			self.queue.fail(item.queue_id, claim_id, attempts, &message, now).await
		} else {
			// Strictly later than the old position even if the clock has not moved.
			let requeued_at = now.max(item.created_at + Duration::MICROSECOND);

			self.queue.requeue(item.queue_id, claim_id, attempts, &message, requeued_at).await
		};

		match written {
			Ok(true) if exhausted => {
				tracing::error!(
					queue_id = %item.queue_id,
					word_id = %item.word_id,
					attempts,
					error = %message,
					"Queue item failed permanently."
				);

				ItemOutcome::Failed
			},
			Ok(true) => {
				tracing::warn!(
					queue_id = %item.queue_id,
					word_id = %item.word_id,
					attempts,
					error = %message,
					"Queue item failed. Requeued at the back of the queue."
				);

				ItemOutcome::Requeued
			},
			Ok(false) => {
				tracing::warn!(
					queue_id = %item.queue_id,
					"Queue item lost its claim before the failure was recorded."
				);

				ItemOutcome::Stranded
			},
			Err(err) => {
				tracing::error!(
					queue_id = %item.queue_id,
					error = %err,
					"Failed to record queue item failure."
				);

				ItemOutcome::Stranded
			},
		}
	}
}

/// Redacts credentials from an error message and caps its length.
pub fn sanitize_error(error: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in error.split_whitespace() {
		if redact_next {
			parts.push("[REDACTED]".to_string());

			redact_next = false;

			continue;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		parts.push(redact_secret_pair(raw).unwrap_or_else(|| raw.to_string()));
	}

	let out = parts.join(" ");

	if out.chars().count() > MAX_ERROR_CHARS {
		return out.chars().take(MAX_ERROR_CHARS).collect();
	}

	out
}

fn redact_secret_pair(raw: &str) -> Option<String> {
	let lowered = raw.to_ascii_lowercase();
	let sep = raw.chars().find(|c| matches!(c, '=' | ':'))?;

	if !SECRET_KEYS.iter().any(|key| lowered.contains(key)) {
		return None;
	}

	let prefix = raw.split(sep).next().unwrap_or(raw);

	Some(format!("{prefix}{sep}[REDACTED]"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sanitize_redacts_bearer_and_key_values() {
		let sanitized =
			sanitize_error("request failed: Authorization: Bearer sk-123 url=https://x?api_key=abc");

		assert!(!sanitized.contains("sk-123"));
		assert!(!sanitized.contains("abc"));
		assert!(sanitized.contains("Bearer [REDACTED]"));
		assert_eq!(
			sanitize_error("token=abc password:hunter2 fine"),
			"token=[REDACTED] password:[REDACTED] fine"
		);
	}

	#[test]
	fn sanitize_truncates_long_messages() {
		let long = "x".repeat(MAX_ERROR_CHARS * 2);

		assert_eq!(sanitize_error(&long).chars().count(), MAX_ERROR_CHARS);
	}

	#[test]
	fn report_merge_adds_counts() {
		let mut total = ProcessReport { claimed: 5, completed: 4, requeued: 1, ..Default::default() };

		total.merge(ProcessReport { recovered: 1, claimed: 2, failed: 2, ..Default::default() });

		assert_eq!(
			total,
			ProcessReport {
				recovered: 1,
				claimed: 7,
				completed: 4,
				requeued: 1,
				failed: 2,
				stranded: 0,
			}
		);
	}
}
