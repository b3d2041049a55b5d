// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stopwatch helper for user-timing measurements.

use std::time::Instant;

use crate::pipeline::TelemetryPipeline;

/// Timing category recorded by stopwatch measurements.
const USER_TIMING_CATEGORY: &str = "user_timing";

/// Measures a span of wall-clock time and records it as a timing event.
///
/// # Example
///
/// ```ignore
/// let stopwatch = pipeline.start_timing("github_fetch");
/// let repos = fetch_repositories().await?;
/// stopwatch.stop().await;
/// ```
pub struct Stopwatch {
	pipeline: TelemetryPipeline,
	name: String,
	started: Instant,
}

impl Stopwatch {
	pub(crate) fn start(pipeline: TelemetryPipeline, name: impl Into<String>) -> Self {
		Self {
			pipeline,
			name: name.into(),
			started: Instant::now(),
		}
	}

	/// The name this measurement will be recorded under.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Time elapsed since the stopwatch started.
	pub fn elapsed(&self) -> std::time::Duration {
		self.started.elapsed()
	}

	/// Stops the stopwatch and records a `user_timing` event.
	pub async fn stop(self) {
		let elapsed = self.started.elapsed();
		self
			.pipeline
			.track_timing(USER_TIMING_CATEGORY, self.name, elapsed, None)
			.await;
	}
}

#[cfg(test)]
mod tests {
	use crate::test_support::capture_pipeline;
	use loom_telemetry_core::EventKind;

	#[tokio::test]
	async fn stop_records_a_user_timing_event() {
		let (pipeline, sink) = capture_pipeline();

		let stopwatch = pipeline.start_timing("github_fetch");
		assert_eq!(stopwatch.name(), "github_fetch");
		stopwatch.stop().await;
		pipeline.flush().await;

		let events = sink.events().await;
		assert_eq!(events.len(), 1);
		let event = &events[0];
		assert_eq!(event.kind, EventKind::Timing);
		assert_eq!(event.name.as_deref(), Some("github_fetch"));
		assert_eq!(
			event.properties.get("category"),
			Some(&serde_json::Value::String("user_timing".to_string()))
		);
		let duration = event.properties.get("duration_ms").unwrap().as_f64().unwrap();
		assert!(duration >= 0.0);
	}

	#[tokio::test]
	async fn elapsed_grows_monotonically() {
		let (pipeline, _sink) = capture_pipeline();
		let stopwatch = pipeline.start_timing("noop");
		let first = stopwatch.elapsed();
		let second = stopwatch.elapsed();
		assert!(second >= first);
	}
}
