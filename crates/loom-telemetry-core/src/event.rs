// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw and enriched event types.
//!
//! Callers produce a [`RawEvent`] through the shaped constructors; the
//! pipeline turns it into a [`TelemetryEvent`] by attaching session
//! identity and ambient context. Enrichment copies — the raw event is
//! never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::agent::UserAgentInfo;
use crate::context::{ClientEnvironment, PageContext, ScreenSize, Viewport};
use crate::properties::Properties;
use crate::session::SessionId;

/// The kind of a tracked event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	PageView,
	CustomEvent,
	Interaction,
	Error,
	Timing,
	Conversion,
}

impl EventKind {
	/// Returns the wire representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			EventKind::PageView => "page_view",
			EventKind::CustomEvent => "custom_event",
			EventKind::Interaction => "interaction",
			EventKind::Error => "error",
			EventKind::Timing => "timing",
			EventKind::Conversion => "conversion",
		}
	}

	/// Returns true for kinds that carry a required event name.
	pub fn requires_name(&self) -> bool {
		matches!(
			self,
			EventKind::CustomEvent | EventKind::Interaction | EventKind::Timing | EventKind::Conversion
		)
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for EventKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"page_view" => Ok(EventKind::PageView),
			"custom_event" => Ok(EventKind::CustomEvent),
			"interaction" => Ok(EventKind::Interaction),
			"error" => Ok(EventKind::Error),
			"timing" => Ok(EventKind::Timing),
			"conversion" => Ok(EventKind::Conversion),
			_ => Err(format!("invalid event kind: {}", s)),
		}
	}
}

/// An event as handed to the pipeline by a caller, before enrichment.
///
/// The constructors encode the shape contract: kinds that require a name
/// get one by construction, kind-specific detail lands in `properties`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
	pub kind: EventKind,
	pub name: Option<String>,
	pub properties: Properties,
}

impl RawEvent {
	/// A page view. Page path, title, and timings are folded into the
	/// properties by the pipeline from the current page context.
	pub fn page_view(properties: Properties) -> Self {
		Self {
			kind: EventKind::PageView,
			name: None,
			properties,
		}
	}

	/// A named caller-defined event.
	pub fn custom(name: impl Into<String>, properties: Properties) -> Self {
		Self {
			kind: EventKind::CustomEvent,
			name: Some(name.into()),
			properties,
		}
	}

	/// A user interaction with a named element. The action becomes the
	/// event name, the element rides along as a property.
	pub fn interaction(
		element: impl Into<String>,
		action: impl Into<String>,
		properties: Properties,
	) -> Self {
		Self {
			kind: EventKind::Interaction,
			name: Some(action.into()),
			properties: properties.insert("element", element.into()),
		}
	}

	/// An error observation. The error's type name is the event name;
	/// message and caller context land in properties.
	pub fn error(
		type_name: impl Into<String>,
		message: impl Into<String>,
		context: Properties,
	) -> Self {
		Self {
			kind: EventKind::Error,
			name: Some(type_name.into()),
			properties: context.insert("message", message.into()),
		}
	}

	/// A duration measurement.
	pub fn timing(
		category: impl Into<String>,
		variable: impl Into<String>,
		duration_ms: f64,
		label: Option<String>,
	) -> Self {
		let mut properties = Properties::new()
			.insert("category", category.into())
			.insert("duration_ms", duration_ms);
		if let Some(label) = label {
			properties = properties.insert("label", label);
		}
		Self {
			kind: EventKind::Timing,
			name: Some(variable.into()),
			properties,
		}
	}

	/// A goal completion, optionally valued.
	pub fn conversion(goal: impl Into<String>, value: f64, properties: Properties) -> Self {
		Self {
			kind: EventKind::Conversion,
			name: Some(goal.into()),
			properties: properties.insert("value", value),
		}
	}
}

/// An enriched event, immutable once created, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
	#[serde(rename = "type")]
	pub kind: EventKind,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	pub properties: Properties,
	pub session_id: SessionId,
	#[serde(with = "chrono::serde::ts_milliseconds")]
	pub timestamp: DateTime<Utc>,
	pub url: String,
	pub referrer: String,
	pub user_agent: UserAgentInfo,
	pub viewport: Viewport,
	pub screen: ScreenSize,
}

impl TelemetryEvent {
	/// Enriches a raw event with session identity and ambient context.
	///
	/// Pure: same inputs yield the same output, and the raw event is taken
	/// by reference and cloned, never modified.
	pub fn enrich(
		raw: &RawEvent,
		session_id: SessionId,
		now: DateTime<Utc>,
		page: &PageContext,
		env: &ClientEnvironment,
	) -> Self {
		Self {
			kind: raw.kind,
			name: raw.name.clone(),
			properties: raw.properties.clone(),
			session_id,
			timestamp: now,
			url: page.url.clone(),
			referrer: page.referrer.clone(),
			user_agent: UserAgentInfo::from_user_agent(&env.user_agent),
			viewport: page.viewport,
			screen: env.screen,
		}
	}
}
