// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The telemetry pipeline: the client handle the host tracks events
//! through, plus the background flush task behind it.
//!
//! Track calls are fire-and-forget: they enrich, enqueue, and return.
//! Nothing a track call does can fail visibly — consent denials are
//! silent no-ops, queue overflow drops with a warning, and delivery
//! failures are absorbed by the flush machinery and retried on the next
//! natural flush cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use loom_telemetry_core::{
	ClientEnvironment, PageContext, Properties, RawEvent, SessionId, SessionTracker,
	TelemetryEvent,
};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::batch::{BatchQueue, EnqueueOutcome, QueueState};
use crate::config::PipelineConfig;
use crate::consent::ConsentGate;
use crate::error::{Result, TelemetryError};
use crate::sink::{DeliveryAttempt, EventSink, HttpSink};
use crate::stopwatch::Stopwatch;
use crate::store::{FileSettingStore, MemorySettingStore, SettingStore};

/// Builder for constructing a [`TelemetryPipeline`].
pub struct PipelineBuilder {
	collector_url: Option<String>,
	api_key: Option<String>,
	config: PipelineConfig,
	environment: ClientEnvironment,
	page: PageContext,
	store: Option<Arc<dyn SettingStore>>,
	sink: Option<Arc<dyn EventSink>>,
}

impl PipelineBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			collector_url: None,
			api_key: None,
			config: PipelineConfig::default(),
			environment: ClientEnvironment::default(),
			page: PageContext::default(),
			store: None,
			sink: None,
		}
	}

	/// Sets the collector endpoint URL.
	///
	/// Example: `https://loom.ghuntley.com/api/telemetry/events`
	pub fn collector_url(mut self, url: impl Into<String>) -> Self {
		self.collector_url = Some(url.into());
		self
	}

	/// Sets the API key sent as a bearer token on deliveries.
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(key.into());
		self
	}

	/// Replaces the whole configuration.
	pub fn config(mut self, config: PipelineConfig) -> Self {
		self.config = config;
		self
	}

	/// Master switch; when false every track-* call is a no-op.
	pub fn enable_tracking(mut self, enabled: bool) -> Self {
		self.config.enable_tracking = enabled;
		self
	}

	/// Honor the browser's do-not-track signal.
	pub fn respect_do_not_track(mut self, respect: bool) -> Self {
		self.config.respect_do_not_track = respect;
		self
	}

	/// Inactivity window before the session id rotates.
	pub fn session_timeout(mut self, timeout: Duration) -> Self {
		self.config.session_timeout = timeout;
		self
	}

	/// Queue length that triggers an immediate flush.
	pub fn batch_size(mut self, size: usize) -> Self {
		self.config.batch_size = size;
		self
	}

	/// Periodic flush cadence.
	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.config.flush_interval = interval;
		self
	}

	/// Hard cap on queued events.
	pub fn max_queue_size(mut self, size: usize) -> Self {
		self.config.max_queue_size = size;
		self
	}

	/// Timeout for a single delivery request.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	/// Ambient client context sampled by the host at startup.
	pub fn environment(mut self, environment: ClientEnvironment) -> Self {
		self.environment = environment;
		self
	}

	/// Initial page context; updatable later via
	/// [`TelemetryPipeline::set_page_context`].
	pub fn page_context(mut self, page: PageContext) -> Self {
		self.page = page;
		self
	}

	/// Overrides the durable setting store (opt-out flag, experiment
	/// assignments). Defaults to a JSON file in the XDG state directory.
	pub fn setting_store(mut self, store: Arc<dyn SettingStore>) -> Self {
		self.store = Some(store);
		self
	}

	/// Overrides the delivery sink. Defaults to an HTTP sink against the
	/// collector URL; tests inject mocks here.
	pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
		self.sink = Some(sink);
		self
	}

	/// Builds the pipeline and spawns its background flush task.
	///
	/// Must be called from within a Tokio runtime.
	pub fn build(self) -> Result<TelemetryPipeline> {
		let config = self.config.normalized();

		let sink: Arc<dyn EventSink> = match self.sink {
			Some(sink) => sink,
			None => {
				let url = self.collector_url.ok_or(TelemetryError::InvalidCollectorUrl)?;
				Arc::new(HttpSink::new(url, self.api_key, config.request_timeout)?)
			}
		};

		let store: Arc<dyn SettingStore> = match self.store {
			Some(store) => store,
			None => match FileSettingStore::at_default_path() {
				Ok(store) => Arc::new(store),
				Err(err) => {
					warn!(error = %err, "no durable setting store, falling back to in-memory");
					Arc::new(MemorySettingStore::new())
				}
			},
		};

		let consent = ConsentGate::new(
			config.enable_tracking,
			config.respect_do_not_track,
			self.environment.do_not_track,
			Arc::clone(&store),
		);

		let inner = Arc::new(PipelineInner {
			queue: Mutex::new(BatchQueue::new(config.batch_size, config.max_queue_size)),
			session: Mutex::new(SessionTracker::new(config.session_timeout)),
			page: RwLock::new(self.page),
			environment: self.environment,
			consent,
			store,
			sink,
			flush_notify: Notify::new(),
			flush_in_flight: AtomicBool::new(false),
			shutdown: AtomicBool::new(false),
			worker: std::sync::Mutex::new(None),
			config,
		});

		let worker = tokio::spawn(run_flush_loop(Arc::clone(&inner)));
		*inner.worker.lock().expect("worker lock") = Some(worker);

		info!(
			batch_size = inner.config.batch_size,
			flush_interval_ms = inner.config.flush_interval.as_millis() as u64,
			max_queue_size = inner.config.max_queue_size,
			"telemetry pipeline started"
		);

		Ok(TelemetryPipeline { inner })
	}
}

impl Default for PipelineBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Internal pipeline state, shared with the background flush task.
struct PipelineInner {
	queue: Mutex<BatchQueue>,
	session: Mutex<SessionTracker>,
	page: RwLock<PageContext>,
	environment: ClientEnvironment,
	consent: ConsentGate,
	store: Arc<dyn SettingStore>,
	sink: Arc<dyn EventSink>,
	flush_notify: Notify,
	flush_in_flight: AtomicBool,
	shutdown: AtomicBool,
	worker: std::sync::Mutex<Option<JoinHandle<()>>>,
	config: PipelineConfig,
}

/// Clears the in-flight flag when a flush completes, whatever the path
/// out — the `finally` equivalent.
struct FlushInFlightGuard<'a>(&'a AtomicBool);

impl Drop for FlushInFlightGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

impl PipelineInner {
	/// Enriches and enqueues one raw event.
	async fn capture(&self, raw: RawEvent) {
		if self.shutdown.load(Ordering::SeqCst) {
			debug!(kind = %raw.kind, "pipeline shut down, event discarded");
			return;
		}
		if !self.consent.is_tracking_allowed() {
			return;
		}

		let now = Utc::now();
		let session_id = self.session.lock().await.session_id(now);
		let event = {
			let page = self.page.read().await;
			TelemetryEvent::enrich(&raw, session_id, now, &page, &self.environment)
		};

		let mut queue = self.queue.lock().await;
		match queue.enqueue(event) {
			EnqueueOutcome::Dropped => {
				drop(queue);
				warn!(kind = %raw.kind, "queue at capacity, event dropped");
			}
			EnqueueOutcome::Queued(QueueState::ReadyToFlush) => {
				drop(queue);
				self.flush_notify.notify_one();
			}
			EnqueueOutcome::Queued(_) => {}
		}
	}

	/// Claims the current queue contents and attempts delivery. A failed
	/// batch returns to the front of the queue for the next cycle.
	async fn flush(&self) {
		if self.flush_in_flight.swap(true, Ordering::SeqCst) {
			debug!("flush already in flight, skipping");
			return;
		}
		let _guard = FlushInFlightGuard(&self.flush_in_flight);

		let events = self.queue.lock().await.take_batch();
		if events.is_empty() {
			return;
		}

		let attempt = DeliveryAttempt::new(events);
		debug!(batch_id = %attempt.id(), count = attempt.len(), "flushing event batch");

		if let Err(err) = self.sink.deliver(&attempt).await {
			warn!(batch_id = %attempt.id(), error = %err, "delivery failed, re-queueing batch");
			let mut queue = self.queue.lock().await;
			let dropped = queue.requeue_front(attempt.into_events());
			if dropped > 0 {
				warn!(dropped, "queue at capacity, oldest re-queued events dropped");
			}
		}
	}
}

/// Background task: periodic flushes plus forced flushes on demand.
async fn run_flush_loop(inner: Arc<PipelineInner>) {
	debug!(
		interval_ms = inner.config.flush_interval.as_millis() as u64,
		"telemetry flush task started"
	);

	loop {
		tokio::select! {
			_ = tokio::time::sleep(inner.config.flush_interval) => {
				if inner.shutdown.load(Ordering::SeqCst) {
					break;
				}
				inner.flush().await;
			}
			_ = inner.flush_notify.notified() => {
				if inner.shutdown.load(Ordering::SeqCst) {
					// One final flush on teardown; failures are logged by
					// the flush path and not retried past this point.
					inner.flush().await;
					break;
				}
				inner.flush().await;
			}
		}
	}

	debug!("telemetry flush task stopped");
}

/// Client handle for the event telemetry pipeline.
///
/// One instance per page-session context; clones share the same state.
/// Independent instances share nothing.
///
/// # Example
///
/// ```ignore
/// use loom_telemetry::{Properties, TelemetryPipeline};
///
/// let pipeline = TelemetryPipeline::builder()
///     .collector_url("https://loom.ghuntley.com/api/telemetry/events")
///     .build()?;
///
/// pipeline.track_page_view(Properties::new()).await;
/// pipeline
///     .track_event("cta_click", Properties::new().insert("section", "hero"))
///     .await;
///
/// // On teardown: cancel the timer and attempt one final flush.
/// pipeline.shutdown().await;
/// ```
#[derive(Clone)]
pub struct TelemetryPipeline {
	inner: Arc<PipelineInner>,
}

impl TelemetryPipeline {
	/// Creates a new builder.
	pub fn builder() -> PipelineBuilder {
		PipelineBuilder::new()
	}

	/// Records a page view for the current page context. The page path,
	/// title, and any performance timings are folded into the properties
	/// ahead of the caller's extras.
	pub async fn track_page_view(&self, extra: Properties) {
		let page_props = {
			let page = self.inner.page.read().await;
			let mut props = Properties::new()
				.insert("page", page.path())
				.insert("title", page.title.clone());
			if let Some(timings) = &page.timings {
				if !timings.is_empty() {
					if let Ok(value) = serde_json::to_value(timings) {
						props = props.insert("performance", value);
					}
				}
			}
			props
		};
		self.inner.capture(RawEvent::page_view(page_props.merge(extra))).await;
	}

	/// Records a named caller-defined event.
	pub async fn track_event(&self, name: impl Into<String>, properties: Properties) {
		self.inner.capture(RawEvent::custom(name, properties)).await;
	}

	/// Records a user interaction with a named element.
	pub async fn track_interaction(
		&self,
		element: impl Into<String>,
		action: impl Into<String>,
		properties: Properties,
	) {
		self
			.inner
			.capture(RawEvent::interaction(element, action, properties))
			.await;
	}

	/// Records an error observation. The error's type name becomes the
	/// event name; its message and the caller's context ride along as
	/// properties.
	pub async fn track_error<E>(&self, error: &E, context: Properties)
	where
		E: std::error::Error + ?Sized,
	{
		let raw = RawEvent::error(std::any::type_name::<E>(), error.to_string(), context);
		self.inner.capture(raw).await;
	}

	/// Records a duration measurement.
	pub async fn track_timing(
		&self,
		category: impl Into<String>,
		variable: impl Into<String>,
		duration: Duration,
		label: Option<String>,
	) {
		let raw = RawEvent::timing(category, variable, duration.as_secs_f64() * 1000.0, label);
		self.inner.capture(raw).await;
	}

	/// Records a goal completion.
	pub async fn track_conversion(
		&self,
		goal: impl Into<String>,
		value: f64,
		properties: Properties,
	) {
		self.inner.capture(RawEvent::conversion(goal, value, properties)).await;
	}

	/// Starts a stopwatch; stopping it records a `user_timing` event.
	pub fn start_timing(&self, name: impl Into<String>) -> Stopwatch {
		Stopwatch::start(self.clone(), name)
	}

	/// Forces an immediate flush, bypassing the periodic timer.
	pub async fn flush(&self) {
		self.inner.flush().await;
	}

	/// Signals that the page became hidden; forces an immediate flush.
	pub async fn notify_hidden(&self) {
		debug!("page hidden, forcing flush");
		self.inner.flush().await;
	}

	/// Shuts the pipeline down: cancels the periodic timer and attempts
	/// one final flush. Safe to call more than once.
	pub async fn shutdown(&self) {
		if self.inner.shutdown.swap(true, Ordering::SeqCst) {
			return;
		}
		self.inner.flush_notify.notify_one();

		let worker = self.inner.worker.lock().expect("worker lock").take();
		if let Some(handle) = worker {
			let _ = handle.await;
		}
		info!("telemetry pipeline shut down");
	}

	/// Returns true once shutdown has been requested.
	pub fn is_shutdown(&self) -> bool {
		self.inner.shutdown.load(Ordering::SeqCst)
	}

	/// Persists the user's opt-out and discards anything queued.
	pub async fn opt_out(&self) {
		if let Err(err) = self.inner.consent.opt_out() {
			warn!(error = %err, "failed to persist opt-out");
		}
		self.inner.queue.lock().await.clear();
		info!("telemetry opt-out recorded");
	}

	/// Removes the persisted opt-out.
	pub async fn opt_in(&self) {
		if let Err(err) = self.inner.consent.opt_in() {
			warn!(error = %err, "failed to remove opt-out");
		}
	}

	/// Returns true when events would currently be recorded.
	pub fn is_tracking_allowed(&self) -> bool {
		!self.is_shutdown() && self.inner.consent.is_tracking_allowed()
	}

	/// Returns the current session id, if any event started a session.
	pub async fn session_id(&self) -> Option<SessionId> {
		self.inner.session.lock().await.current_id().cloned()
	}

	/// Replaces the page context, e.g. on navigation.
	pub async fn set_page_context(&self, page: PageContext) {
		*self.inner.page.write().await = page;
	}

	/// Number of events currently queued.
	pub async fn queue_len(&self) -> usize {
		self.inner.queue.lock().await.len()
	}

	pub(crate) fn setting_store(&self) -> Arc<dyn SettingStore> {
		Arc::clone(&self.inner.store)
	}
}
