pub mod worker;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wf_service::WfService;
use wf_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = wf_cli::VERSION,
	rename_all = "kebab",
	styles = wf_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Run passes until the queue is idle, then exit.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = wf_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let poll_interval = Duration::from_millis(config.queue.poll_interval_ms);
	let service = WfService::new(config, db);

	if args.once {
		worker::drain_once(&service).await;

		return Ok(());
	}

	worker::run_worker(&service, poll_interval).await;

	Ok(())
}
