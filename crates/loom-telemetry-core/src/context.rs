// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ambient browser context supplied by the embedding host.
//!
//! The pipeline cannot observe a browser on its own; the host (a WASM
//! frontend, a webview shell, an instrumented proxy) samples these values
//! and hands them in. `ClientEnvironment` is fixed for the lifetime of a
//! pipeline, `PageContext` changes as the user navigates.

use serde::{Deserialize, Serialize};

/// Inner window dimensions at event time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
	pub width: u32,
	pub height: u32,
}

/// Physical screen dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
	pub width: u32,
	pub height: u32,
}

/// Page load performance metrics, as far as the host could observe them.
///
/// Every field is optional: hosts without a performance API (or with a
/// partial one) omit what they cannot measure, and the pipeline carries
/// whatever is present rather than failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageTimings {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub load_ms: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dom_content_loaded_ms: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_paint_ms: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_contentful_paint_ms: Option<f64>,
	/// Used JS heap, in whole megabytes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub memory_mb: Option<u64>,
}

impl PageTimings {
	/// Returns true if no metric was observed at all.
	pub fn is_empty(&self) -> bool {
		self.load_ms.is_none()
			&& self.dom_content_loaded_ms.is_none()
			&& self.first_paint_ms.is_none()
			&& self.first_contentful_paint_ms.is_none()
			&& self.memory_mb.is_none()
	}
}

/// Per-page state: where the user currently is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
	/// Full page URL including query and fragment.
	pub url: String,
	pub title: String,
	pub referrer: String,
	pub viewport: Viewport,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<PageTimings>,
}

impl PageContext {
	/// Extracts the path component of `url`.
	///
	/// `"https://site.dev/projects?tab=2"` → `"/projects"`. URLs without a
	/// path report `"/"`; strings with no scheme are returned as-is up to
	/// the query/fragment.
	pub fn path(&self) -> String {
		let after_scheme = match self.url.find("://") {
			Some(idx) => &self.url[idx + 3..],
			None => {
				let end = self.url.find(['?', '#']).unwrap_or(self.url.len());
				return self.url[..end].to_string();
			}
		};
		let path_start = match after_scheme.find('/') {
			Some(idx) => idx,
			None => return "/".to_string(),
		};
		let path = &after_scheme[path_start..];
		let end = path.find(['?', '#']).unwrap_or(path.len());
		path[..end].to_string()
	}
}

/// Per-client state: fixed for the lifetime of a pipeline instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvironment {
	pub user_agent: String,
	pub screen: ScreenSize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub language: Option<String>,
	/// The browser's do-not-track signal.
	pub do_not_track: bool,
}
