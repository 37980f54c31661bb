//! Background dispatch of processing passes.
//!
//! Enqueue and retry only signal the dispatcher, so the caller never waits on generation.
//! Signals coalesce: several requests while a pass runs lead to one follow-up pass.

use std::sync::Arc;

use crate::{WfService, processor::ProcessReport};

impl WfService {
	/// Asks the dispatcher for a pass. Never blocks.
	pub fn request_pass(&self) {
		self.wakeup.notify_one();
	}

	/// Runs passes until one claims less than a full batch (or just one pass when chaining is
	/// off). Errors end the run and are logged.
	pub async fn run_until_idle(&self) -> ProcessReport {
		let mut total = ProcessReport::default();

		loop {
			match self.process_queue().await {
				Ok(report) => {
					total.merge(report);

					if !self.should_chain(&report) {
						break;
					}

					tracing::info!(claimed = report.claimed, "Full batch processed. Running next pass.");
				},
				Err(err) => {
					tracing::error!(error = %err, "Queue processing pass failed.");

					break;
				},
			}
		}

		total
	}

	pub(crate) fn should_chain(&self, report: &ProcessReport) -> bool {
		self.cfg.queue.chain_full_batches
			&& report.claimed >= self.cfg.queue.batch_size as usize
	}
}

/// Waits for pass requests and serves them until the task is aborted.
pub async fn run_dispatcher(service: Arc<WfService>) {
	tracing::info!("Queue dispatcher started.");

	loop {
		service.wakeup.notified().await;

		let report = service.run_until_idle().await;

		if report.claimed > 0 || report.recovered > 0 {
			tracing::info!(
				recovered = report.recovered,
				claimed = report.claimed,
				completed = report.completed,
				requeued = report.requeued,
				failed = report.failed,
				stranded = report.stranded,
				"Queue passes finished."
			);
		}
	}
}
