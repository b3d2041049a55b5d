// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A/B experiments: sticky variant assignment plus conversion tracking.
//!
//! A visitor is assigned a variant once, uniformly at random, and the
//! assignment is persisted through the pipeline's setting store so the
//! same visitor sees the same variant on every return visit. Assignment
//! and conversions are reported as ordinary custom events.

use tracing::{debug, warn};

use loom_telemetry_core::Properties;

use crate::pipeline::TelemetryPipeline;

/// Event emitted when a variant is first assigned.
pub const ASSIGNMENT_EVENT: &str = "ab_test_assigned";
/// Event emitted for experiment conversions.
pub const CONVERSION_EVENT: &str = "ab_test_conversion";

/// Storage key prefix for persisted assignments.
const VARIANT_KEY_PREFIX: &str = "ab-test/";
/// Variant reported when an experiment has no variants configured.
const FALLBACK_VARIANT: &str = "control";

/// A named experiment with a fixed set of variants.
pub struct Experiment {
	pipeline: TelemetryPipeline,
	name: String,
	variants: Vec<String>,
}

impl Experiment {
	/// Creates a handle for the named experiment.
	pub fn new(
		pipeline: &TelemetryPipeline,
		name: impl Into<String>,
		variants: Vec<String>,
	) -> Self {
		Self {
			pipeline: pipeline.clone(),
			name: name.into(),
			variants,
		}
	}

	fn storage_key(&self) -> String {
		format!("{VARIANT_KEY_PREFIX}{}", self.name)
	}

	/// Returns this visitor's variant, assigning one on first call.
	///
	/// A persisted assignment that no longer names a configured variant
	/// (the experiment changed shape) is discarded and reassigned.
	pub async fn variant(&self) -> String {
		if self.variants.is_empty() {
			return FALLBACK_VARIANT.to_string();
		}

		let store = self.pipeline.setting_store();
		match store.get(&self.storage_key()) {
			Ok(Some(saved)) if self.variants.contains(&saved) => return saved,
			Ok(_) => {}
			Err(err) => {
				debug!(experiment = %self.name, error = %err, "assignment lookup failed");
			}
		}

		let variant = self.variants[fastrand::usize(..self.variants.len())].clone();
		if let Err(err) = store.set(&self.storage_key(), &variant) {
			warn!(experiment = %self.name, error = %err, "failed to persist assignment");
		}
		self
			.pipeline
			.track_event(
				ASSIGNMENT_EVENT,
				Properties::new()
					.insert("test_name", self.name.clone())
					.insert("variant", variant.clone()),
			)
			.await;
		variant
	}

	/// Returns true if this visitor is assigned the named variant.
	pub async fn is_variant(&self, name: &str) -> bool {
		self.variant().await == name
	}

	/// Records a conversion attributed to this visitor's variant.
	pub async fn track_conversion(&self, goal: impl Into<String>, value: f64) {
		let variant = self.variant().await;
		self
			.pipeline
			.track_event(
				CONVERSION_EVENT,
				Properties::new()
					.insert("test_name", self.name.clone())
					.insert("variant", variant)
					.insert("goal", goal.into())
					.insert("value", value),
			)
			.await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::capture_pipeline;

	fn variants() -> Vec<String> {
		vec!["hero_a".to_string(), "hero_b".to_string()]
	}

	#[tokio::test]
	async fn assignment_is_sticky() {
		let (pipeline, _sink) = capture_pipeline();
		let experiment = Experiment::new(&pipeline, "hero_layout", variants());

		let first = experiment.variant().await;
		assert!(variants().contains(&first));
		for _ in 0..10 {
			assert_eq!(experiment.variant().await, first);
		}
	}

	#[tokio::test]
	async fn assignment_emits_one_event() {
		let (pipeline, sink) = capture_pipeline();
		let experiment = Experiment::new(&pipeline, "hero_layout", variants());

		let assigned = experiment.variant().await;
		experiment.variant().await;
		pipeline.flush().await;

		let events = sink.events().await;
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].name.as_deref(), Some(ASSIGNMENT_EVENT));
		assert_eq!(
			events[0].properties.get("variant"),
			Some(&serde_json::Value::String(assigned))
		);
	}

	#[tokio::test]
	async fn two_handles_agree_via_the_store() {
		let (pipeline, _sink) = capture_pipeline();
		let first = Experiment::new(&pipeline, "hero_layout", variants());
		let second = Experiment::new(&pipeline, "hero_layout", variants());

		assert_eq!(first.variant().await, second.variant().await);
	}

	#[tokio::test]
	async fn stale_persisted_variant_is_reassigned() {
		let (pipeline, _sink) = capture_pipeline();
		pipeline
			.setting_store()
			.set("ab-test/hero_layout", "removed_variant")
			.unwrap();

		let experiment = Experiment::new(&pipeline, "hero_layout", variants());
		let assigned = experiment.variant().await;
		assert!(variants().contains(&assigned));
	}

	#[tokio::test]
	async fn empty_experiment_reports_control() {
		let (pipeline, sink) = capture_pipeline();
		let experiment = Experiment::new(&pipeline, "empty", Vec::new());

		assert_eq!(experiment.variant().await, "control");
		pipeline.flush().await;
		assert!(sink.events().await.is_empty());
	}

	#[tokio::test]
	async fn conversion_carries_goal_variant_and_value() {
		let (pipeline, sink) = capture_pipeline();
		let experiment = Experiment::new(&pipeline, "hero_layout", variants());
		let assigned = experiment.variant().await;

		experiment.track_conversion("contact_form", 1.0).await;
		pipeline.flush().await;

		let events = sink.events().await;
		let conversion = events
			.iter()
			.find(|e| e.name.as_deref() == Some(CONVERSION_EVENT))
			.unwrap();
		assert_eq!(
			conversion.properties.get("goal"),
			Some(&serde_json::Value::String("contact_form".to_string()))
		);
		assert_eq!(
			conversion.properties.get("variant"),
			Some(&serde_json::Value::String(assigned))
		);
		assert_eq!(
			conversion.properties.get("value"),
			Some(&serde_json::json!(1.0))
		);
	}

	#[tokio::test]
	async fn is_variant_matches_assignment() {
		let (pipeline, _sink) = capture_pipeline();
		let experiment = Experiment::new(&pipeline, "hero_layout", variants());
		let assigned = experiment.variant().await;
		assert!(experiment.is_variant(&assigned).await);
		assert!(!experiment.is_variant("nonexistent").await);
	}
}
