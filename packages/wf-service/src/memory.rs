//! In-process stores for tests and single-node development.
//!
//! Every operation runs under one mutex, which gives the same atomic enqueue and claim guarantees
//! the Postgres backend gets from its unique index and `SKIP LOCKED`.

use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard, PoisonError},
};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	BoxFuture,
	store::{QueueStore, WordRef, WordStore},
};
use wf_domain::Example;
use wf_storage::{
	Error, Result,
	models::{NewQueueItem, QueueItem, QueueStatus, Word},
};

#[derive(Debug, Default)]
pub struct MemoryQueueStore {
	items: Mutex<Vec<QueueItem>>,
}
impl MemoryQueueStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts an item as-is, bypassing dedup. Used to seed fixtures.
	pub fn insert(&self, item: QueueItem) {
		self.lock().push(item);
	}

	/// Snapshot in insertion order.
	pub fn items(&self) -> Vec<QueueItem> {
		self.lock().clone()
	}

	pub fn get(&self, queue_id: Uuid) -> Option<QueueItem> {
		self.lock().iter().find(|item| item.queue_id == queue_id).cloned()
	}

	fn lock(&self) -> MutexGuard<'_, Vec<QueueItem>> {
		self.items.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn with_claimed<F>(&self, queue_id: Uuid, claim_id: Uuid, update: F) -> bool
	where
		F: FnOnce(&mut QueueItem),
	{
		let mut items = self.lock();

		match items.iter_mut().find(|item| is_claimed_by(item, queue_id, claim_id)) {
			Some(item) => {
				update(item);

				true
			},
			None => false,
		}
	}
}

fn is_claimed_by(item: &QueueItem, queue_id: Uuid, claim_id: Uuid) -> bool {
	item.queue_id == queue_id
		&& item.status == QueueStatus::Processing
		&& item.claim_id == Some(claim_id)
}

impl QueueStore for MemoryQueueStore {
	fn enqueue<'a>(
		&'a self,
		item: &'a NewQueueItem,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<QueueItem>>> {
		let mut items = self.lock();
		let active = items.iter().any(|existing| {
			existing.word_id == item.word_id && existing.status.is_active()
		});
		let inserted = if active {
			None
		} else {
			let created = QueueItem {
				queue_id: Uuid::new_v4(),
				word_id: item.word_id.clone(),
				word_text: item.word_text.clone(),
				user_id: item.user_id.clone(),
				profile_id: item.profile_id.clone(),
				status: QueueStatus::Pending,
				attempts: 0,
				error: None,
				created_at: now,
				started_at: None,
				claim_id: None,
				lease_until: None,
				updated_at: now,
			};

			items.push(created.clone());

			Some(created)
		};

		drop(items);

		Box::pin(async move { Ok(inserted) })
	}

	fn list_all(&self) -> BoxFuture<'_, Result<Vec<QueueItem>>> {
		let mut items = self.items();

		items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.queue_id.cmp(&b.queue_id)));

		Box::pin(async move { Ok(items) })
	}

	fn recover_expired_leases<'a>(
		&'a self,
		now: OffsetDateTime,
		reason: &'a str,
	) -> BoxFuture<'a, Result<u64>> {
		let mut recovered = 0;

		for item in self.lock().iter_mut() {
			let expired = item.lease_until.is_some_and(|lease_until| lease_until <= now);

			if item.status == QueueStatus::Processing && expired {
				item.status = QueueStatus::Pending;
				item.error = Some(reason.to_string());
				item.started_at = None;
				item.claim_id = None;
				item.lease_until = None;
				item.updated_at = now;
				recovered += 1;
			}
		}

		Box::pin(async move { Ok(recovered) })
	}

	fn claim_pending(
		&self,
		limit: u32,
		claim_id: Uuid,
		now: OffsetDateTime,
		lease_until: OffsetDateTime,
	) -> BoxFuture<'_, Result<Vec<QueueItem>>> {
		let mut items = self.lock();
		let mut pending: Vec<usize> = items
			.iter()
			.enumerate()
			.filter(|(_, item)| item.status == QueueStatus::Pending)
			.map(|(idx, _)| idx)
			.collect();

		pending.sort_by(|&a, &b| {
			items[a]
				.created_at
				.cmp(&items[b].created_at)
				.then(items[a].queue_id.cmp(&items[b].queue_id))
		});
		pending.truncate(limit as usize);

		let claimed: Vec<QueueItem> = pending
			.into_iter()
			.map(|idx| {
				let item = &mut items[idx];

				item.status = QueueStatus::Processing;
				item.started_at = Some(now);
				item.claim_id = Some(claim_id);
				item.lease_until = Some(lease_until);
				item.updated_at = now;

				item.clone()
			})
			.collect();

		drop(items);

		Box::pin(async move { Ok(claimed) })
	}

	fn renew_lease(
		&self,
		queue_id: Uuid,
		claim_id: Uuid,
		now: OffsetDateTime,
		lease_until: OffsetDateTime,
	) -> BoxFuture<'_, Result<bool>> {
		let renewed = self.with_claimed(queue_id, claim_id, |item| {
			item.lease_until = Some(lease_until);
			item.updated_at = now;
		});

		Box::pin(async move { Ok(renewed) })
	}

	fn complete(&self, queue_id: Uuid, claim_id: Uuid) -> BoxFuture<'_, Result<bool>> {
		let mut items = self.lock();
		let before = items.len();

		items.retain(|item| !is_claimed_by(item, queue_id, claim_id));

		let removed = items.len() < before;

		drop(items);

		Box::pin(async move { Ok(removed) })
	}

	fn requeue<'a>(
		&'a self,
		queue_id: Uuid,
		claim_id: Uuid,
		attempts: i32,
		error: &'a str,
		requeued_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		let updated = self.with_claimed(queue_id, claim_id, |item| {
			item.status = QueueStatus::Pending;
			item.attempts = attempts;
			item.error = Some(error.to_string());
			item.created_at = requeued_at;
			item.started_at = None;
			item.claim_id = None;
			item.lease_until = None;
			item.updated_at = requeued_at;
		});

		Box::pin(async move { Ok(updated) })
	}

	fn fail<'a>(
		&'a self,
		queue_id: Uuid,
		claim_id: Uuid,
		attempts: i32,
		error: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<bool>> {
		let updated = self.with_claimed(queue_id, claim_id, |item| {
			item.status = QueueStatus::Failed;
			item.attempts = attempts;
			item.error = Some(error.to_string());
			item.started_at = None;
			item.claim_id = None;
			item.lease_until = None;
			item.updated_at = now;
		});

		Box::pin(async move { Ok(updated) })
	}

	fn reset_failed<'a>(
		&'a self,
		user_id: Option<&'a str>,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<u64>> {
		let mut items = self.lock();
		let mut candidates: Vec<usize> = items
			.iter()
			.enumerate()
			.filter(|(_, item)| {
				item.status == QueueStatus::Failed
					&& user_id.is_none_or(|user_id| item.user_id == user_id)
			})
			.map(|(idx, _)| idx)
			.collect();

		// Oldest first, so the oldest failed item of a word wins.
		candidates.sort_by_key(|&idx| items[idx].created_at);

		let mut reset = 0;

		for idx in candidates {
			let word_id = items[idx].word_id.clone();
			let word_active =
				items.iter().any(|item| item.word_id == word_id && item.status.is_active());

			if word_active {
				continue;
			}

			let item = &mut items[idx];

			item.status = QueueStatus::Pending;
			item.attempts = 0;
			item.error = None;
			item.created_at = now;
			item.started_at = None;
			item.claim_id = None;
			item.lease_until = None;
			item.updated_at = now;
			reset += 1;
		}

		drop(items);

		Box::pin(async move { Ok(reset) })
	}
}

type WordKey = (String, String, String);

#[derive(Debug, Default)]
pub struct MemoryWordStore {
	words: Mutex<HashMap<WordKey, Word>>,
}
impl MemoryWordStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, word: Word) {
		let key = (word.user_id.clone(), word.profile_id.clone(), word.word_id.clone());

		self.lock().insert(key, word);
	}

	pub fn get(&self, user_id: &str, profile_id: &str, word_id: &str) -> Option<Word> {
		let key = (user_id.to_string(), profile_id.to_string(), word_id.to_string());

		self.lock().get(&key).cloned()
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<WordKey, Word>> {
		self.words.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl WordStore for MemoryWordStore {
	fn update_examples<'a>(
		&'a self,
		word: WordRef<'a>,
		examples: &'a [Example],
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		let key =
			(word.user_id.to_string(), word.profile_id.to_string(), word.word_id.to_string());
		let result = match self.lock().get_mut(&key) {
			Some(stored) => {
				if stored.examples != examples {
					stored.examples = examples.to_vec();
					stored.updated_at = now;
				}

				Ok(())
			},
			None => Err(Error::NotFound(format!(
				"Word {} for profile {}.",
				word.word_id, word.profile_id
			))),
		};

		Box::pin(async move { result })
	}
}
