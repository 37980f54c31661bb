pub mod dispatch;
pub mod generation;
pub mod memory;
pub mod processor;
pub mod prompt;
pub mod queue;
pub mod store;
pub mod time_serde;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::sync::Notify;

pub use dispatch::run_dispatcher;
pub use error::{Error, Result};
pub use generation::{
	SessionFillRequest, SingleExampleRequest, SingleExampleResponse, StoreReport, WordEntry,
};
pub use processor::{ProcessReport, sanitize_error};
pub use queue::{EnqueueRequest, EnqueueResponse, QueueItemView, RetryResponse, TriggerResponse};
pub use store::{QueueStore, WordRef, WordStore};
use wf_config::{Config, LlmProviderConfig};
use wf_providers::generator::{self, GenerationCall};
use wf_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		call: &'a GenerationCall<'a>,
	) -> BoxFuture<'a, wf_providers::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub generator: Arc<dyn GenerationProvider>,
}
impl Providers {
	pub fn new(generator: Arc<dyn GenerationProvider>) -> Self {
		Self { generator }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { generator: Arc::new(DefaultProviders) }
	}
}

pub struct WfService {
	pub cfg: Config,
	pub queue: Arc<dyn QueueStore>,
	pub words: Arc<dyn WordStore>,
	pub providers: Providers,
	wakeup: Notify,
}
impl WfService {
	/// Postgres-backed service with the HTTP generation provider.
	pub fn new(cfg: Config, db: Db) -> Self {
		let db = Arc::new(db);

		Self::with_stores(cfg, db.clone(), db, Providers::default())
	}

	pub fn with_stores(
		cfg: Config,
		queue: Arc<dyn QueueStore>,
		words: Arc<dyn WordStore>,
		providers: Providers,
	) -> Self {
		Self { cfg, queue, words, providers, wakeup: Notify::new() }
	}
}

struct DefaultProviders;

impl GenerationProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		call: &'a GenerationCall<'a>,
	) -> BoxFuture<'a, wf_providers::Result<String>> {
		Box::pin(generator::complete(cfg, call))
	}
}
