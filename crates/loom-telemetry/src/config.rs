// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pipeline configuration.

use std::time::Duration;

/// Hard cap on queued events awaiting delivery.
const DEFAULT_MAX_QUEUE_SIZE: usize = 100;
/// Queue length that triggers an immediate flush.
const DEFAULT_BATCH_SIZE: usize = 10;
/// Cadence of the periodic flush timer.
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
/// Inactivity window before session rotation.
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Timeout for a single delivery request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a telemetry pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
	/// Master switch; when false every track-* call is a no-op.
	pub enable_tracking: bool,
	/// Honor the browser's do-not-track signal.
	pub respect_do_not_track: bool,
	/// Inactivity window before the session id rotates.
	pub session_timeout: Duration,
	/// Queue length that triggers an immediate flush.
	pub batch_size: usize,
	/// Periodic flush cadence; bounds delivery latency under low volume.
	pub flush_interval: Duration,
	/// Hard cap on queued events; enqueues beyond it are dropped.
	pub max_queue_size: usize,
	/// Timeout for a single delivery request.
	pub request_timeout: Duration,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			enable_tracking: true,
			respect_do_not_track: true,
			session_timeout: DEFAULT_SESSION_TIMEOUT,
			batch_size: DEFAULT_BATCH_SIZE,
			flush_interval: DEFAULT_FLUSH_INTERVAL,
			max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}
}

impl PipelineConfig {
	/// Returns a copy with degenerate values clamped to workable ones:
	/// a zero batch size becomes 1, and the queue cap is raised to at
	/// least the batch size so a full batch always fits.
	pub fn normalized(mut self) -> Self {
		self.batch_size = self.batch_size.max(1);
		self.max_queue_size = self.max_queue_size.max(self.batch_size);
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = PipelineConfig::default();
		assert!(config.enable_tracking);
		assert!(config.respect_do_not_track);
		assert_eq!(config.session_timeout, Duration::from_secs(1800));
		assert_eq!(config.batch_size, 10);
		assert_eq!(config.flush_interval, Duration::from_millis(5000));
		assert_eq!(config.max_queue_size, 100);
	}

	#[test]
	fn normalized_clamps_zero_batch_size() {
		let config = PipelineConfig {
			batch_size: 0,
			..Default::default()
		}
		.normalized();
		assert_eq!(config.batch_size, 1);
	}

	#[test]
	fn normalized_raises_cap_to_batch_size() {
		let config = PipelineConfig {
			batch_size: 50,
			max_queue_size: 10,
			..Default::default()
		}
		.normalized();
		assert_eq!(config.max_queue_size, 50);
	}
}
