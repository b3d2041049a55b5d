// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session identity: correlates events within one continuous visit.
//!
//! A session is bounded by inactivity — when more than the configured
//! timeout passes between events, the next event starts a fresh session.
//! Sessions live in memory only; every new pipeline instance (every page
//! load) starts a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Characters used for the random session-id suffix.
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
/// Length of the random session-id suffix.
const SUFFIX_LEN: usize = 6;

/// Opaque session identifier: `"{epoch_ms}-{random6}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	/// Generates a new id from the given instant plus a random suffix.
	#[must_use]
	pub fn generate(now: DateTime<Utc>) -> Self {
		let suffix: String = (0..SUFFIX_LEN)
			.map(|_| SUFFIX_ALPHABET[fastrand::usize(..SUFFIX_ALPHABET.len())] as char)
			.collect();
		Self(format!("{}-{}", now.timestamp_millis(), suffix))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Tracks the current session and rotates it on inactivity.
///
/// Rotation happens lazily, at the moment a new event arrives — there is
/// no background clock here. Arithmetic-only; cannot fail.
#[derive(Debug)]
pub struct SessionTracker {
	timeout: Duration,
	current: Option<ActiveSession>,
}

#[derive(Debug)]
struct ActiveSession {
	id: SessionId,
	last_activity_at: DateTime<Utc>,
}

impl SessionTracker {
	/// Creates a tracker with the given inactivity timeout.
	pub fn new(timeout: Duration) -> Self {
		Self {
			timeout,
			current: None,
		}
	}

	/// Returns the session id for an event arriving at `now`.
	///
	/// Starts a session on first use, rotates when the gap since the last
	/// activity exceeds the timeout, and refreshes the activity timestamp
	/// either way.
	pub fn session_id(&mut self, now: DateTime<Utc>) -> SessionId {
		let expired = match &self.current {
			Some(session) => {
				let idle_ms = now
					.signed_duration_since(session.last_activity_at)
					.num_milliseconds();
				idle_ms > self.timeout.as_millis() as i64
			}
			None => true,
		};

		if expired {
			self.current = Some(ActiveSession {
				id: SessionId::generate(now),
				last_activity_at: now,
			});
		} else if let Some(session) = &mut self.current {
			session.last_activity_at = now;
		}

		self
			.current
			.as_ref()
			.map(|session| session.id.clone())
			.expect("session set above")
	}

	/// Returns the current id without touching activity, if a session exists.
	pub fn current_id(&self) -> Option<&SessionId> {
		self.current.as_ref().map(|session| &session.id)
	}

	/// Returns the last activity timestamp, if a session exists.
	pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
		self.current.as_ref().map(|session| session.last_activity_at)
	}
}
