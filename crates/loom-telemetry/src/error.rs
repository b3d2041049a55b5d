// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the telemetry SDK.
//!
//! These are internal plumbing: nothing in this enum ever reaches a
//! caller of a track-* method. Delivery and storage failures are caught
//! at the pipeline boundary, logged, and absorbed.

use thiserror::Error;

/// Telemetry SDK errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
	/// Collector URL is missing or not an http(s) URL.
	#[error("invalid collector URL")]
	InvalidCollectorUrl,

	/// HTTP request failed at the transport level.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Collector returned a non-2xx response.
	#[error("collector error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// No home directory to place the default setting store in.
	#[error("could not resolve a home directory for the setting store")]
	HomeDirNotFound,

	/// Setting store I/O failed.
	#[error("setting store I/O failed: {0}")]
	StorageIo(#[from] std::io::Error),

	/// Setting store contents could not be (de)serialized.
	#[error("setting store serialization failed: {0}")]
	StorageSerde(#[from] serde_json::Error),
}

/// Result type alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn server_error_displays_status_and_message() {
		let err = TelemetryError::ServerError {
			status: 503,
			message: "overloaded".to_string(),
		};
		assert_eq!(err.to_string(), "collector error (503): overloaded");
	}

	#[test]
	fn storage_io_wraps_source() {
		let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
		let err = TelemetryError::from(io);
		assert!(matches!(err, TelemetryError::StorageIo(_)));
		assert!(err.to_string().contains("denied"));
	}
}
