// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of event batches to the collector endpoint.
//!
//! A delivery attempt succeeds or fails as a whole. Failure handling
//! (re-queueing) is the pipeline's job; the sink only reports the
//! outcome. There is no backoff here — retry cadence is bounded by the
//! pipeline's flush interval.

use std::time::Duration;

use async_trait::async_trait;
use loom_telemetry_core::TelemetryEvent;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, TelemetryError};

/// SDK name reported in the User-Agent header.
const SDK_NAME: &str = "loom-telemetry";
/// SDK version reported in the User-Agent header.
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One flush operation: an ephemeral snapshot of the claimed batch.
///
/// The id exists for log correlation only; it is not part of the wire
/// payload.
#[derive(Debug)]
pub struct DeliveryAttempt {
	id: Uuid,
	events: Vec<TelemetryEvent>,
}

impl DeliveryAttempt {
	pub fn new(events: Vec<TelemetryEvent>) -> Self {
		Self {
			id: Uuid::new_v4(),
			events,
		}
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn events(&self) -> &[TelemetryEvent] {
		&self.events
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}

	/// Reclaims the events, e.g. for re-queueing after a failure.
	pub fn into_events(self) -> Vec<TelemetryEvent> {
		self.events
	}
}

/// Transmits batches to the external collector.
#[async_trait]
pub trait EventSink: Send + Sync {
	/// Delivers the batch; any error means the whole batch failed.
	async fn deliver(&self, attempt: &DeliveryAttempt) -> Result<()>;
}

/// Wire payload: `{ "events": [...] }`.
#[derive(Serialize)]
struct EventsPayload<'a> {
	events: &'a [TelemetryEvent],
}

/// HTTP sink: POSTs batches as JSON to the collector endpoint.
pub struct HttpSink {
	endpoint: String,
	api_key: Option<String>,
	client: reqwest::Client,
}

impl HttpSink {
	/// Creates a sink for the given collector endpoint URL.
	pub fn new(
		endpoint: impl Into<String>,
		api_key: Option<String>,
		request_timeout: Duration,
	) -> Result<Self> {
		let endpoint = endpoint.into();
		if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
			return Err(TelemetryError::InvalidCollectorUrl);
		}

		let client = reqwest::Client::builder()
			.user_agent(format!("{SDK_NAME}/{SDK_VERSION}"))
			.timeout(request_timeout)
			.build()?;

		Ok(Self {
			endpoint,
			api_key,
			client,
		})
	}
}

#[async_trait]
impl EventSink for HttpSink {
	async fn deliver(&self, attempt: &DeliveryAttempt) -> Result<()> {
		let mut request = self.client.post(&self.endpoint).json(&EventsPayload {
			events: attempt.events(),
		});
		if let Some(key) = &self.api_key {
			request = request.header("Authorization", format!("Bearer {key}"));
		}

		let response = request.send().await?;
		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(TelemetryError::ServerError {
				status: status.as_u16(),
				message,
			});
		}

		debug!(
			batch_id = %attempt.id(),
			count = attempt.len(),
			"delivered event batch"
		);
		Ok(())
	}
}
