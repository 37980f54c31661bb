//! Durable generation queue on Postgres.
//!
//! Claims take row locks with `SKIP LOCKED`, so concurrent passes never claim the same item, and
//! the partial unique index on active rows makes enqueue dedup atomic. Every claim stamps a
//! `claim_id`; renewing, completing, requeueing and failing an item all require the caller's
//! token to still match, so a pass whose lease was recovered cannot touch the new claim.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{NewQueueItem, QueueItem, QueueItemRow},
};

const QUEUE_COLUMNS: &str = "\
queue_id,
	word_id,
	word_text,
	user_id,
	profile_id,
	status,
	attempts,
	last_error,
	created_at,
	started_at,
	claim_id,
	lease_until,
	updated_at";

/// Inserts a pending item unless the word already has an active one.
///
/// Returns `None` when the insert was skipped.
pub async fn enqueue(db: &Db, item: &NewQueueItem, now: OffsetDateTime) -> Result<Option<QueueItem>> {
	let sql = format!(
		"\
INSERT INTO generation_queue (
	queue_id,
	word_id,
	word_text,
	user_id,
	profile_id,
	status,
	attempts,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, 'pending', 0, $6, $6)
ON CONFLICT DO NOTHING
RETURNING {QUEUE_COLUMNS}"
	);
	let row = sqlx::query_as::<_, QueueItemRow>(&sql)
		.bind(Uuid::new_v4())
		.bind(item.word_id.as_str())
		.bind(item.word_text.as_str())
		.bind(item.user_id.as_str())
		.bind(item.profile_id.as_str())
		.bind(now)
		.fetch_optional(&db.pool)
		.await?;

	row.map(QueueItem::try_from).transpose()
}

/// Every item, newest first.
pub async fn list_all(db: &Db) -> Result<Vec<QueueItem>> {
	let sql = format!(
		"SELECT {QUEUE_COLUMNS} FROM generation_queue ORDER BY created_at DESC, queue_id ASC"
	);
	let rows = sqlx::query_as::<_, QueueItemRow>(&sql).fetch_all(&db.pool).await?;

	rows.into_iter().map(QueueItem::try_from).collect()
}

/// Returns claimed items whose lease ran out to `pending` without charging an attempt.
pub async fn recover_expired_leases(db: &Db, now: OffsetDateTime, reason: &str) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE generation_queue
SET status = 'pending',
	last_error = $2,
	started_at = NULL,
	claim_id = NULL,
	lease_until = NULL,
	updated_at = $1
WHERE status = 'processing' AND lease_until <= $1",
	)
	.bind(now)
	.bind(reason)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

/// Claims up to `limit` of the oldest pending items in one statement, stamping them with
/// `claim_id`.
pub async fn claim_pending(
	db: &Db,
	limit: i64,
	claim_id: Uuid,
	now: OffsetDateTime,
	lease_until: OffsetDateTime,
) -> Result<Vec<QueueItem>> {
	let sql = format!(
		"\
UPDATE generation_queue
SET status = 'processing',
	started_at = $2,
	claim_id = $3,
	lease_until = $4,
	updated_at = $2
WHERE queue_id IN (
	SELECT queue_id
	FROM generation_queue
	WHERE status = 'pending'
	ORDER BY created_at ASC, queue_id ASC
	LIMIT $1
	FOR UPDATE SKIP LOCKED
)
RETURNING {QUEUE_COLUMNS}"
	);
	let rows = sqlx::query_as::<_, QueueItemRow>(&sql)
		.bind(limit)
		.bind(now)
		.bind(claim_id)
		.bind(lease_until)
		.fetch_all(&db.pool)
		.await?;
	let mut items = rows.into_iter().map(QueueItem::try_from).collect::<Result<Vec<_>>>()?;

	// RETURNING carries no ordering guarantee.
	items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.queue_id.cmp(&b.queue_id)));

	Ok(items)
}

/// Extends the lease of an item still held under `claim_id`.
///
/// Returns `false` when the claim was lost, for example because the lease ran out and another pass
/// recovered the item.
pub async fn renew_lease(
	db: &Db,
	queue_id: Uuid,
	claim_id: Uuid,
	now: OffsetDateTime,
	lease_until: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE generation_queue
SET lease_until = $4,
	updated_at = $3
WHERE queue_id = $1 AND claim_id = $2 AND status = 'processing'",
	)
	.bind(queue_id)
	.bind(claim_id)
	.bind(now)
	.bind(lease_until)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Deletes a finished item if it is still held under `claim_id`.
pub async fn complete_item(db: &Db, queue_id: Uuid, claim_id: Uuid) -> Result<bool> {
	let result = sqlx::query(
		"\
DELETE FROM generation_queue
WHERE queue_id = $1 AND claim_id = $2 AND status = 'processing'",
	)
	.bind(queue_id)
	.bind(claim_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Puts a claimed item back at the end of the queue after a failed attempt.
pub async fn requeue_item(
	db: &Db,
	queue_id: Uuid,
	claim_id: Uuid,
	attempts: i32,
	error: &str,
	requeued_at: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE generation_queue
SET status = 'pending',
	attempts = $3,
	last_error = $4,
	created_at = $5,
	started_at = NULL,
	claim_id = NULL,
	lease_until = NULL,
	updated_at = $5
WHERE queue_id = $1 AND claim_id = $2 AND status = 'processing'",
	)
	.bind(queue_id)
	.bind(claim_id)
	.bind(attempts)
	.bind(error)
	.bind(requeued_at)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn fail_item(
	db: &Db,
	queue_id: Uuid,
	claim_id: Uuid,
	attempts: i32,
	error: &str,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE generation_queue
SET status = 'failed',
	attempts = $3,
	last_error = $4,
	started_at = NULL,
	claim_id = NULL,
	lease_until = NULL,
	updated_at = $5
WHERE queue_id = $1 AND claim_id = $2 AND status = 'processing'",
	)
	.bind(queue_id)
	.bind(claim_id)
	.bind(attempts)
	.bind(error)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

/// Resets failed items to fresh pending items and returns how many were reset.
///
/// A failed item is skipped when its word already has an active item, and only the oldest failed
/// item per word is reset, so the one-active-item-per-word index always holds.
pub async fn reset_failed(db: &Db, user_id: Option<&str>, now: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query(
		"\
UPDATE generation_queue
SET status = 'pending',
	attempts = 0,
	last_error = NULL,
	created_at = $2,
	started_at = NULL,
	claim_id = NULL,
	lease_until = NULL,
	updated_at = $2
WHERE queue_id IN (
	SELECT DISTINCT ON (f.word_id) f.queue_id
	FROM generation_queue f
	WHERE f.status = 'failed'
		AND ($1::text IS NULL OR f.user_id = $1)
		AND NOT EXISTS (
			SELECT 1
			FROM generation_queue a
			WHERE a.word_id = f.word_id AND a.status IN ('pending', 'processing')
		)
	ORDER BY f.word_id, f.created_at ASC
)",
	)
	.bind(user_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}
