// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client SDK for the Loom web telemetry pipeline.
//!
//! One [`TelemetryPipeline`] is built per page-session context. Callers
//! fire track-* methods; the pipeline enriches each event with session
//! identity and ambient browser context, buffers it in a bounded queue,
//! and a background task delivers batches to the collector — when a full
//! batch accumulates, on a periodic timer, or on a forced flush
//! (visibility change, navigation, shutdown).
//!
//! Telemetry never breaks the host: consent denials are silent no-ops,
//! enrichment degrades by omission, delivery failures re-queue the batch
//! for the next cycle, and overflow drops with a diagnostic warning.
//! No track-* call ever returns an error or blocks on network I/O.
//!
//! # Example
//!
//! ```ignore
//! use loom_telemetry::{Properties, TelemetryPipeline};
//!
//! let pipeline = TelemetryPipeline::builder()
//!     .collector_url("https://loom.ghuntley.com/api/telemetry/events")
//!     .build()?;
//!
//! pipeline.track_page_view(Properties::new()).await;
//! pipeline
//!     .track_interaction("hero_button", "click", Properties::new())
//!     .await;
//!
//! pipeline.shutdown().await;
//! ```

pub mod batch;
pub mod config;
pub mod consent;
pub mod error;
pub mod experiments;
pub mod pipeline;
pub mod sink;
pub mod stopwatch;
pub mod store;

#[cfg(test)]
mod test_support;

pub use config::PipelineConfig;
pub use consent::{ConsentGate, OPT_OUT_KEY};
pub use error::{Result, TelemetryError};
pub use experiments::Experiment;
pub use pipeline::{PipelineBuilder, TelemetryPipeline};
pub use sink::{DeliveryAttempt, EventSink, HttpSink};
pub use stopwatch::Stopwatch;
pub use store::{FileSettingStore, MemorySettingStore, SettingStore};

// Re-export the core types callers need to build and inspect events.
pub use loom_telemetry_core::{
	ClientEnvironment, DeviceClass, EventKind, PageContext, PageTimings, Properties, RawEvent,
	ScreenSize, SessionId, TelemetryEvent, UserAgentInfo, Viewport,
};
