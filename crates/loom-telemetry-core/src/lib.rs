// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom web telemetry pipeline.
//!
//! This crate provides the data model shared by the client SDK
//! (`loom-telemetry`) and the collector: event kinds, raw and enriched
//! events, ambient page/client context, best-effort user-agent
//! classification, and session identity.
//!
//! Everything here is pure data — no I/O, no async, no clocks of its own.
//! Callers pass the current time in, which keeps session rotation and
//! enrichment deterministic and testable.

pub mod agent;
pub mod context;
pub mod event;
pub mod properties;
pub mod session;

pub use agent::{DeviceClass, UserAgentInfo};
pub use context::{ClientEnvironment, PageContext, PageTimings, ScreenSize, Viewport};
pub use event::{EventKind, RawEvent, TelemetryEvent};
pub use properties::Properties;
pub use session::{SessionId, SessionTracker};
