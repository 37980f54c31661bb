use std::sync::Arc;

use wf_service::WfService;
use wf_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<WfService>,
}
impl AppState {
	pub async fn new(config: wf_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(Arc::new(WfService::new(config, db))))
	}

	pub fn from_service(service: Arc<WfService>) -> Self {
		Self { service }
	}

	pub(crate) fn api_token(&self) -> Option<&str> {
		self.service.cfg.security.api_auth_token.as_deref()
	}

	pub(crate) fn admin_token(&self) -> Option<&str> {
		self.service.cfg.security.admin_auth_token.as_deref()
	}
}
