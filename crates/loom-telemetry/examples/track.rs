// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: Track a short browsing session with the loom-telemetry SDK.
//!
//! Run with:
//!   LOOM_COLLECTOR_URL=http://localhost:8080/api/telemetry/events \
//!     cargo run --example track -p loom-telemetry

use std::time::Duration;

use loom_telemetry::{
	ClientEnvironment, PageContext, Properties, ScreenSize, TelemetryPipeline, Viewport,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "loom_telemetry=debug".into()),
		)
		.init();

	let collector_url = std::env::var("LOOM_COLLECTOR_URL")
		.expect("LOOM_COLLECTOR_URL environment variable required");
	let api_key = std::env::var("LOOM_TELEMETRY_API_KEY").ok();

	println!("Initializing telemetry pipeline...");
	println!("  Collector: {}", collector_url);

	let mut builder = TelemetryPipeline::builder()
		.collector_url(&collector_url)
		.batch_size(5)
		.flush_interval(Duration::from_secs(2))
		.environment(ClientEnvironment {
			user_agent: "Mozilla/5.0 (X11; Linux x86_64) Chrome/126.0".to_string(),
			screen: ScreenSize {
				width: 1920,
				height: 1080,
			},
			language: Some("en-US".to_string()),
			do_not_track: false,
		})
		.page_context(PageContext {
			url: "https://portfolio.example/".to_string(),
			title: "Home".to_string(),
			referrer: String::new(),
			viewport: Viewport {
				width: 1280,
				height: 720,
			},
			timings: None,
		});
	if let Some(key) = api_key {
		builder = builder.api_key(key);
	}
	let pipeline = builder.build()?;

	// Landing page view.
	pipeline.track_page_view(Properties::new()).await;

	// Some browsing activity.
	pipeline
		.track_interaction("navbar", "click", Properties::new().insert("target", "/projects"))
		.await;
	pipeline
		.set_page_context(PageContext {
			url: "https://portfolio.example/projects".to_string(),
			title: "Projects".to_string(),
			referrer: "https://portfolio.example/".to_string(),
			viewport: Viewport {
				width: 1280,
				height: 720,
			},
			timings: None,
		})
		.await;
	pipeline.track_page_view(Properties::new()).await;

	// Time a simulated data fetch.
	let stopwatch = pipeline.start_timing("github_fetch");
	tokio::time::sleep(Duration::from_millis(150)).await;
	stopwatch.stop().await;

	// A valued goal.
	pipeline
		.track_conversion("contact_form", 1.0, Properties::new().insert("source", "footer"))
		.await;

	println!("Session id: {:?}", pipeline.session_id().await);
	println!("Queued events: {}", pipeline.queue_len().await);

	// Teardown: cancel the timer and force one final flush.
	pipeline.shutdown().await;
	println!("Pipeline shut down.");

	Ok(())
}
