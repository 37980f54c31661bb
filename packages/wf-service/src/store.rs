//! Storage seams used by the processor.
//!
//! Both traits are implemented for the Postgres [`Db`] and for the in-memory stores in
//! [`crate::memory`]. Implementations must make `enqueue` and `claim_pending` atomic: a word has
//! at most one active item, and an item is claimed by at most one pass. Every call that touches a
//! claimed item carries the claim token and is a no-op returning `false` once the token no longer
//! matches.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::BoxFuture;
use wf_domain::Example;
use wf_storage::{
	Result,
	db::Db,
	models::{NewQueueItem, QueueItem},
	queue, words,
};

pub trait QueueStore
where
	Self: Send + Sync,
{
	/// Returns `None` when the word already has a pending or processing item.
	fn enqueue<'a>(
		&'a self,
		item: &'a NewQueueItem,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<QueueItem>>>;

	/// Every item, newest first.
	fn list_all(&self) -> BoxFuture<'_, Result<Vec<QueueItem>>>;

	fn recover_expired_leases<'a>(
		&'a self,
		now: OffsetDateTime,
		reason: &'a str,
	) -> BoxFuture<'a, Result<u64>>;

	/// Moves up to `limit` of the oldest pending items to `processing` under `claim_id`, oldest
	/// first.
	fn claim_pending(
		&self,
		limit: u32,
		claim_id: Uuid,
		now: OffsetDateTime,
		lease_until: OffsetDateTime,
	) -> BoxFuture<'_, Result<Vec<QueueItem>>>;

	fn renew_lease(
		&self,
		queue_id: Uuid,
		claim_id: Uuid,
		now: OffsetDateTime,
		lease_until: OffsetDateTime,
	) -> BoxFuture<'_, Result<bool>>;

	/// Deletes a finished item.
	fn complete(&self, queue_id: Uuid, claim_id: Uuid) -> BoxFuture<'_, Result<bool>>;

	fn requeue<'a>(
		&'a self,
		queue_id: Uuid,
		claim_id: Uuid,
		attempts: i32,
		error: &'a str,
		requeued_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	fn fail<'a>(
		&'a self,
		queue_id: Uuid,
		claim_id: Uuid,
		attempts: i32,
		error: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>>;

	fn reset_failed<'a>(
		&'a self,
		user_id: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<u64>>;
}

pub trait WordStore
where
	Self: Send + Sync,
{
	/// Overwrites the examples of one word. Fails with `NotFound` when the word does not exist.
	fn update_examples<'a>(
		&'a self,
		word: WordRef<'a>,
		examples: &'a [Example],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;
}

#[derive(Clone, Copy, Debug)]
pub struct WordRef<'a> {
	pub user_id: &'a str,
	pub profile_id: &'a str,
	pub word_id: &'a str,
}

impl QueueStore for Db {
	fn enqueue<'a>(
		&'a self,
		item: &'a NewQueueItem,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<QueueItem>>> {
		Box::pin(queue::enqueue(self, item, now))
	}

	fn list_all(&self) -> BoxFuture<'_, Result<Vec<QueueItem>>> {
		Box::pin(queue::list_all(self))
	}

	fn recover_expired_leases<'a>(
		&'a self,
		now: OffsetDateTime,
		reason: &'a str,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(queue::recover_expired_leases(self, now, reason))
	}

	fn claim_pending(
		&self,
		limit: u32,
		claim_id: Uuid,
		now: OffsetDateTime,
		lease_until: OffsetDateTime,
	) -> BoxFuture<'_, Result<Vec<QueueItem>>> {
		Box::pin(queue::claim_pending(self, i64::from(limit), claim_id, now, lease_until))
	}

	fn renew_lease(
		&self,
		queue_id: Uuid,
		claim_id: Uuid,
		now: OffsetDateTime,
		lease_until: OffsetDateTime,
	) -> BoxFuture<'_, Result<bool>> {
		Box::pin(queue::renew_lease(self, queue_id, claim_id, now, lease_until))
	}

	fn complete(&self, queue_id: Uuid, claim_id: Uuid) -> BoxFuture<'_, Result<bool>> {
		Box::pin(queue::complete_item(self, queue_id, claim_id))
	}

	fn requeue<'a>(
		&'a self,
		queue_id: Uuid,
		claim_id: Uuid,
		attempts: i32,
		error: &'a str,
		requeued_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(queue::requeue_item(self, queue_id, claim_id, attempts, error, requeued_at))
	}

	fn fail<'a>(
		&'a self,
		queue_id: Uuid,
		claim_id: Uuid,
		attempts: i32,
		error: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(queue::fail_item(self, queue_id, claim_id, attempts, error, now))
	}

	fn reset_failed<'a>(
		&'a self,
		user_id: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(queue::reset_failed(self, user_id, now))
	}
}

impl WordStore for Db {
	fn update_examples<'a>(
		&'a self,
		word: WordRef<'a>,
		examples: &'a [Example],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(words::update_examples(
			self,
			word.user_id,
			word.profile_id,
			word.word_id,
			examples,
			now,
		))
	}
}
