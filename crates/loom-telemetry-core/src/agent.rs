// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort user-agent classification.
//!
//! This is deliberate substring matching against fixed, ordered marker
//! tables — not a full user-agent parser. First match wins; anything
//! unmatched reports `"Unknown"`. The classification is advisory context
//! on events, not something correctness depends on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback name when no marker matches.
const UNKNOWN: &str = "Unknown";

/// Browser markers, checked in order. Chromium-based Edge also carries
/// "Chrome" in its UA string and therefore classifies as Chrome.
const BROWSER_MARKERS: &[(&str, &str)] = &[
	("Chrome", "Chrome"),
	("Firefox", "Firefox"),
	("Safari", "Safari"),
	("Edge", "Edge"),
];

/// Operating system markers, checked in order.
const OS_MARKERS: &[(&str, &str)] = &[
	("Windows", "Windows"),
	("Mac", "macOS"),
	("Linux", "Linux"),
	("Android", "Android"),
	("iOS", "iOS"),
];

/// Coarse device classification derived from the user-agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
	Mobile,
	Tablet,
	Desktop,
}

impl DeviceClass {
	/// Returns the wire representation ("mobile", "tablet", "desktop").
	pub fn as_str(&self) -> &'static str {
		match self {
			DeviceClass::Mobile => "mobile",
			DeviceClass::Tablet => "tablet",
			DeviceClass::Desktop => "desktop",
		}
	}
}

impl fmt::Display for DeviceClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Classified user-agent context attached to every enriched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAgentInfo {
	pub browser: String,
	pub os: String,
	pub device_class: DeviceClass,
	pub is_mobile: bool,
}

impl UserAgentInfo {
	/// Classifies a raw user-agent string.
	pub fn from_user_agent(ua: &str) -> Self {
		Self {
			browser: first_match(BROWSER_MARKERS, ua),
			os: first_match(OS_MARKERS, ua),
			device_class: device_class(ua),
			is_mobile: contains_any(ua, &["Mobile", "Android", "iPhone", "iPad"]),
		}
	}
}

fn first_match(markers: &[(&str, &str)], ua: &str) -> String {
	markers
		.iter()
		.find(|(marker, _)| ua.contains(marker))
		.map(|(_, name)| (*name).to_string())
		.unwrap_or_else(|| UNKNOWN.to_string())
}

fn contains_any(ua: &str, markers: &[&str]) -> bool {
	markers.iter().any(|marker| ua.contains(marker))
}

fn device_class(ua: &str) -> DeviceClass {
	if contains_any(ua, &["Mobile", "Android", "iPhone"]) {
		DeviceClass::Mobile
	} else if contains_any(ua, &["iPad", "Tablet"]) {
		DeviceClass::Tablet
	} else {
		DeviceClass::Desktop
	}
}
