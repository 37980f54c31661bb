use std::time::Duration;

use tokio::time;

use wf_service::{ProcessReport, WfService};

/// Polls the queue forever, draining it on every tick.
pub async fn run_worker(service: &WfService, poll_interval: Duration) {
	tracing::info!(
		poll_interval_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX),
		"Queue worker started."
	);

	loop {
		drain_once(service).await;

		time::sleep(poll_interval).await;
	}
}

/// Runs passes until the queue is idle and logs the combined report.
pub async fn drain_once(service: &WfService) -> ProcessReport {
	let report = service.run_until_idle().await;

	if report.claimed > 0 || report.recovered > 0 {
		tracing::info!(
			recovered = report.recovered,
			claimed = report.claimed,
			completed = report.completed,
			requeued = report.requeued,
			failed = report.failed,
			stranded = report.stranded,
			"Queue worker tick finished."
		);
	}

	report
}
