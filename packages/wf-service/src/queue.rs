//! Queue entry points: enqueue, list, trigger, and bulk retry.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, WfService, processor::ProcessReport};
use wf_storage::models::{NewQueueItem, QueueItem, QueueStatus};

#[derive(Clone, Debug, Deserialize)]
pub struct EnqueueRequest {
	pub user_id: String,
	pub profile_id: String,
	pub word_id: String,
	pub word_text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnqueueResponse {
	pub message: String,
	/// False when the word already had an active item.
	pub queued: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub queue_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
pub struct QueueItemView {
	#[serde(rename = "id")]
	pub queue_id: Uuid,
	pub word_id: String,
	pub word_text: String,
	pub user_id: String,
	pub profile_id: String,
	pub status: QueueStatus,
	pub attempts: i32,
	pub error: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub started_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub lease_until: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl From<QueueItem> for QueueItemView {
	fn from(item: QueueItem) -> Self {
		Self {
			queue_id: item.queue_id,
			word_id: item.word_id,
			word_text: item.word_text,
			user_id: item.user_id,
			profile_id: item.profile_id,
			status: item.status,
			attempts: item.attempts,
			error: item.error,
			created_at: item.created_at,
			started_at: item.started_at,
			lease_until: item.lease_until,
			updated_at: item.updated_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct TriggerResponse {
	pub message: String,
	pub report: ProcessReport,
}

#[derive(Clone, Debug, Serialize)]
pub struct RetryResponse {
	pub message: String,
	pub count: u64,
}

impl WfService {
	/// Adds a word to the queue unless it already has an active item, then wakes the dispatcher.
	///
	/// Returns once the item is stored. Processing happens in the background.
	pub async fn enqueue(&self, req: EnqueueRequest) -> Result<EnqueueResponse> {
		let item = NewQueueItem {
			word_id: required(&req.word_id, "word_id")?,
			word_text: required(&req.word_text, "word_text")?,
			user_id: required(&req.user_id, "user_id")?,
			profile_id: required(&req.profile_id, "profile_id")?,
		};
		let inserted = self.queue.enqueue(&item, OffsetDateTime::now_utc()).await?;
		let Some(inserted) = inserted else {
			tracing::info!(word_id = %item.word_id, "Word is already queued. Skipping.");

			return Ok(EnqueueResponse {
				message: "Word is already queued.".to_string(),
				queued: false,
				queue_id: None,
			});
		};

		tracing::info!(
			queue_id = %inserted.queue_id,
			word_id = %inserted.word_id,
			"Word added to the generation queue."
		);
		self.request_pass();

		Ok(EnqueueResponse {
			message: "Word added to the generation queue.".to_string(),
			queued: true,
			queue_id: Some(inserted.queue_id),
		})
	}

	/// Every queue item, newest first, for monitoring.
	pub async fn list_queue(&self) -> Result<Vec<QueueItemView>> {
		let items = self.queue.list_all().await?;

		Ok(items.into_iter().map(QueueItemView::from).collect())
	}

	/// Runs one pass and waits for it. A full batch hands the rest to the dispatcher.
	pub async fn trigger_pass(&self) -> Result<TriggerResponse> {
		tracing::info!("Manual queue trigger received.");

		let report = self.process_queue().await?;

		if self.should_chain(&report) {
			self.request_pass();
		}

		Ok(TriggerResponse {
			message: format!(
				"Processed {} items: {} completed, {} requeued, {} failed.",
				report.claimed, report.completed, report.requeued, report.failed
			),
			report,
		})
	}

	/// Resets failed items, optionally only those owned by `user_id`.
	pub async fn retry_failed_items(&self, user_id: Option<&str>) -> Result<RetryResponse> {
		let user_id = match user_id {
			Some(user_id) => Some(required(user_id, "user_id")?),
			None => None,
		};
		let count =
			self.queue.reset_failed(user_id.as_deref(), OffsetDateTime::now_utc()).await?;

		tracing::info!(count, user_id = user_id.as_deref().unwrap_or("*"), "Reset failed queue items.");

		if count > 0 && self.cfg.queue.retry_triggers_pass {
			self.request_pass();
		}

		Ok(RetryResponse { message: format!("Reset {count} failed items."), count })
	}
}

fn required(value: &str, field: &str) -> Result<String> {
	let trimmed = value.trim();

	if trimmed.is_empty() {
		return Err(Error::InvalidRequest { message: format!("{field} is required.") });
	}

	Ok(trimmed.to_string())
}
