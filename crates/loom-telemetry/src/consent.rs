// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracking consent: the master switch, the browser do-not-track signal,
//! and the user's persisted opt-out.
//!
//! Consent denial is not an error condition. A disallowed track call is
//! a silent no-op, and a store that cannot be read is treated as
//! "not opted out" rather than blocking the host.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::store::SettingStore;

/// Storage key for the persisted opt-out flag.
pub const OPT_OUT_KEY: &str = "analytics-opt-out";

/// Decides whether tracking is currently allowed.
pub struct ConsentGate {
	enabled: bool,
	respect_do_not_track: bool,
	do_not_track_signal: bool,
	store: Arc<dyn SettingStore>,
}

impl ConsentGate {
	pub fn new(
		enabled: bool,
		respect_do_not_track: bool,
		do_not_track_signal: bool,
		store: Arc<dyn SettingStore>,
	) -> Self {
		Self {
			enabled,
			respect_do_not_track,
			do_not_track_signal,
			store,
		}
	}

	/// Returns true when events may be recorded right now.
	pub fn is_tracking_allowed(&self) -> bool {
		if !self.enabled {
			return false;
		}
		if self.respect_do_not_track && self.do_not_track_signal {
			return false;
		}
		!self.is_opted_out()
	}

	/// Returns true when the user has persisted an opt-out.
	pub fn is_opted_out(&self) -> bool {
		match self.store.get(OPT_OUT_KEY) {
			Ok(value) => value.as_deref() == Some("true"),
			Err(err) => {
				debug!(error = %err, "opt-out lookup failed, assuming not opted out");
				false
			}
		}
	}

	/// Persists the opt-out flag.
	pub fn opt_out(&self) -> Result<()> {
		self.store.set(OPT_OUT_KEY, "true")
	}

	/// Removes the opt-out flag.
	pub fn opt_in(&self) -> Result<()> {
		self.store.remove(OPT_OUT_KEY)
	}
}
