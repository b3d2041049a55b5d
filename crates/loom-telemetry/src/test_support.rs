// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures for the crate's tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loom_telemetry_core::TelemetryEvent;
use tokio::sync::Mutex;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::TelemetryPipeline;
use crate::sink::{DeliveryAttempt, EventSink};
use crate::store::MemorySettingStore;

/// Sink that records every delivered batch.
pub(crate) struct CaptureSink {
	batches: Mutex<Vec<Vec<TelemetryEvent>>>,
}

impl CaptureSink {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self {
			batches: Mutex::new(Vec::new()),
		})
	}

	/// All delivered events, flattened in delivery order.
	pub(crate) async fn events(&self) -> Vec<TelemetryEvent> {
		self.batches.lock().await.iter().flatten().cloned().collect()
	}
}

#[async_trait]
impl EventSink for CaptureSink {
	async fn deliver(&self, attempt: &DeliveryAttempt) -> Result<()> {
		self.batches.lock().await.push(attempt.events().to_vec());
		Ok(())
	}
}

/// A pipeline wired to a capture sink and an in-memory store, with a
/// flush timer long enough to stay out of the way.
pub(crate) fn capture_pipeline() -> (TelemetryPipeline, Arc<CaptureSink>) {
	let sink = CaptureSink::new();
	let pipeline = TelemetryPipeline::builder()
		.config(PipelineConfig {
			batch_size: 100,
			flush_interval: Duration::from_secs(3600),
			..Default::default()
		})
		.setting_store(Arc::new(MemorySettingStore::new()))
		.event_sink(Arc::clone(&sink) as Arc<dyn EventSink>)
		.build()
		.expect("test pipeline");
	(pipeline, sink)
}
