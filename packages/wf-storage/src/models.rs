use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use wf_domain::{Example, Language};

use crate::Error;

/// Persisted queue states. A completed item is deleted, so there is no terminal success state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
	Pending,
	Processing,
	Failed,
}
impl QueueStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Processing => "processing",
			Self::Failed => "failed",
		}
	}

	/// Pending and processing items block a second enqueue of the same word.
	pub fn is_active(self) -> bool {
		matches!(self, Self::Pending | Self::Processing)
	}
}
impl fmt::Display for QueueStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for QueueStatus {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"pending" => Ok(Self::Pending),
			"processing" => Ok(Self::Processing),
			"failed" => Ok(Self::Failed),
			other => Err(Error::Corrupt(format!("Unknown queue status {other:?}."))),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueItem {
	pub queue_id: Uuid,
	pub word_id: String,
	pub word_text: String,
	pub user_id: String,
	pub profile_id: String,
	pub status: QueueStatus,
	pub attempts: i32,
	pub error: Option<String>,
	/// FIFO key. Rewritten on retry so a failing item moves behind newer work.
	pub created_at: OffsetDateTime,
	pub started_at: Option<OffsetDateTime>,
	/// Token of the pass that holds the lease. Only that pass may finish the item.
	pub claim_id: Option<Uuid>,
	pub lease_until: Option<OffsetDateTime>,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewQueueItem {
	pub word_id: String,
	pub word_text: String,
	pub user_id: String,
	pub profile_id: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct QueueItemRow {
	pub queue_id: Uuid,
	pub word_id: String,
	pub word_text: String,
	pub user_id: String,
	pub profile_id: String,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub created_at: OffsetDateTime,
	pub started_at: Option<OffsetDateTime>,
	pub claim_id: Option<Uuid>,
	pub lease_until: Option<OffsetDateTime>,
	pub updated_at: OffsetDateTime,
}
impl TryFrom<QueueItemRow> for QueueItem {
	type Error = Error;

	fn try_from(row: QueueItemRow) -> Result<Self, Self::Error> {
		Ok(Self {
			queue_id: row.queue_id,
			word_id: row.word_id,
			word_text: row.word_text,
			user_id: row.user_id,
			profile_id: row.profile_id,
			status: row.status.parse()?,
			attempts: row.attempts,
			error: row.last_error,
			created_at: row.created_at,
			started_at: row.started_at,
			claim_id: row.claim_id,
			lease_until: row.lease_until,
			updated_at: row.updated_at,
		})
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Word {
	pub word_id: String,
	pub user_id: String,
	pub profile_id: String,
	pub text: String,
	pub language: Language,
	pub examples: Vec<Example>,
	pub revised_count: i32,
	pub correct_count: i32,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct WordRow {
	pub word_id: String,
	pub user_id: String,
	pub profile_id: String,
	pub text: String,
	pub language: String,
	pub examples: Json<Vec<Example>>,
	pub revised_count: i32,
	pub correct_count: i32,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl TryFrom<WordRow> for Word {
	type Error = Error;

	fn try_from(row: WordRow) -> Result<Self, Self::Error> {
		let language = row.language.parse().map_err(Error::Corrupt)?;

		Ok(Self {
			word_id: row.word_id,
			user_id: row.user_id,
			profile_id: row.profile_id,
			text: row.text,
			language,
			examples: row.examples.0,
			revised_count: row.revised_count,
			correct_count: row.correct_count,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_round_trips_through_text() {
		for status in [QueueStatus::Pending, QueueStatus::Processing, QueueStatus::Failed] {
			assert_eq!(status.as_str().parse::<QueueStatus>().expect("parse"), status);
		}

		assert!(matches!("completed".parse::<QueueStatus>(), Err(Error::Corrupt(_))));
	}

	#[test]
	fn only_pending_and_processing_are_active() {
		assert!(QueueStatus::Pending.is_active());
		assert!(QueueStatus::Processing.is_active());
		assert!(!QueueStatus::Failed.is_active());
	}
}
