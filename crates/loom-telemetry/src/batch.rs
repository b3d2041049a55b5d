// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded in-memory event queue and flush-decision state machine.
//!
//! The queue is owned exclusively by the pipeline; all mutation happens
//! under the pipeline's queue lock. `take_batch` claims the current
//! contents atomically so an in-flight delivery can never interleave
//! with concurrent enqueues.
//!
//! Overflow policy (documented in DESIGN.md):
//! - `enqueue` at capacity drops the incoming event (drop-newest).
//! - `requeue_front` after a failed delivery drops the oldest events of
//!   the returned batch when they no longer fit.

use loom_telemetry_core::TelemetryEvent;

/// Where the queue sits relative to the flush trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
	/// Queue is empty.
	Idle,
	/// Queue holds fewer events than a full batch.
	Accumulating,
	/// Queue holds at least a full batch and should flush now.
	ReadyToFlush,
}

/// Result of an enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
	/// Event was appended; carries the queue state after the append.
	Queued(QueueState),
	/// Queue was at capacity; the incoming event was dropped.
	Dropped,
}

/// Bounded, ordered queue of enriched events awaiting delivery.
#[derive(Debug)]
pub struct BatchQueue {
	events: Vec<TelemetryEvent>,
	batch_size: usize,
	max_size: usize,
}

impl BatchQueue {
	/// Creates a queue. `batch_size` must be at least 1 and `max_size`
	/// at least `batch_size`; the pipeline normalizes its config before
	/// constructing one.
	pub fn new(batch_size: usize, max_size: usize) -> Self {
		debug_assert!(batch_size >= 1);
		debug_assert!(max_size >= batch_size);
		Self {
			events: Vec::new(),
			batch_size,
			max_size,
		}
	}

	/// Current position in the state machine.
	pub fn state(&self) -> QueueState {
		if self.events.is_empty() {
			QueueState::Idle
		} else if self.events.len() >= self.batch_size {
			QueueState::ReadyToFlush
		} else {
			QueueState::Accumulating
		}
	}

	/// Appends an event, or drops it if the queue is at capacity.
	pub fn enqueue(&mut self, event: TelemetryEvent) -> EnqueueOutcome {
		if self.events.len() >= self.max_size {
			return EnqueueOutcome::Dropped;
		}
		self.events.push(event);
		EnqueueOutcome::Queued(self.state())
	}

	/// Atomically claims the queued events, leaving the queue empty.
	pub fn take_batch(&mut self) -> Vec<TelemetryEvent> {
		std::mem::take(&mut self.events)
	}

	/// Returns a failed batch to the front of the queue, ahead of events
	/// enqueued while the delivery was in flight, preserving original
	/// temporal order. Returns how many events had to be dropped (oldest
	/// of the returned batch first) to respect the capacity bound.
	pub fn requeue_front(&mut self, mut batch: Vec<TelemetryEvent>) -> usize {
		let overflow = (batch.len() + self.events.len()).saturating_sub(self.max_size);
		if overflow > 0 {
			batch.drain(..overflow.min(batch.len()));
		}
		batch.append(&mut self.events);
		self.events = batch;
		overflow
	}

	/// Drops everything queued (used on opt-out).
	pub fn clear(&mut self) {
		self.events.clear();
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};
	use loom_telemetry_core::{
		ClientEnvironment, PageContext, Properties, RawEvent, SessionId, TelemetryEvent,
	};
	use proptest::prelude::*;

	fn event(name: &str) -> TelemetryEvent {
		TelemetryEvent::enrich(
			&RawEvent::custom(name, Properties::new()),
			SessionId::generate(Utc.timestamp_millis_opt(0).unwrap()),
			Utc.timestamp_millis_opt(1).unwrap(),
			&PageContext::default(),
			&ClientEnvironment::default(),
		)
	}

	fn names(events: &[TelemetryEvent]) -> Vec<&str> {
		events.iter().map(|e| e.name.as_deref().unwrap()).collect()
	}

	#[test]
	fn starts_idle() {
		let queue = BatchQueue::new(3, 10);
		assert_eq!(queue.state(), QueueState::Idle);
		assert!(queue.is_empty());
	}

	#[test]
	fn accumulates_below_batch_size() {
		let mut queue = BatchQueue::new(3, 10);
		assert_eq!(
			queue.enqueue(event("a")),
			EnqueueOutcome::Queued(QueueState::Accumulating)
		);
		assert_eq!(
			queue.enqueue(event("b")),
			EnqueueOutcome::Queued(QueueState::Accumulating)
		);
	}

	#[test]
	fn batch_size_flips_to_ready() {
		let mut queue = BatchQueue::new(3, 10);
		queue.enqueue(event("a"));
		queue.enqueue(event("b"));
		assert_eq!(
			queue.enqueue(event("c")),
			EnqueueOutcome::Queued(QueueState::ReadyToFlush)
		);
	}

	#[test]
	fn take_batch_claims_everything_and_resets() {
		let mut queue = BatchQueue::new(2, 10);
		queue.enqueue(event("a"));
		queue.enqueue(event("b"));
		queue.enqueue(event("c"));

		let batch = queue.take_batch();
		assert_eq!(names(&batch), vec!["a", "b", "c"]);
		assert_eq!(queue.state(), QueueState::Idle);
	}

	#[test]
	fn overflow_drops_the_incoming_event() {
		// Enqueue cap + 5 into an empty queue: exactly cap retained,
		// and they are the first cap events (drop-newest).
		let cap = 8;
		let mut queue = BatchQueue::new(100, cap);
		for i in 0..cap + 5 {
			let outcome = queue.enqueue(event(&format!("e{i}")));
			if i < cap {
				assert!(matches!(outcome, EnqueueOutcome::Queued(_)));
			} else {
				assert_eq!(outcome, EnqueueOutcome::Dropped);
			}
		}
		assert_eq!(queue.len(), cap);
		let expected: Vec<String> = (0..cap).map(|i| format!("e{i}")).collect();
		assert_eq!(names(&queue.take_batch()), expected);
	}

	#[test]
	fn requeue_front_precedes_newer_events() {
		let mut queue = BatchQueue::new(10, 20);
		queue.enqueue(event("e1"));
		queue.enqueue(event("e2"));
		let failed = queue.take_batch();

		// Two newer events arrive while the delivery is in flight.
		queue.enqueue(event("e3"));
		queue.enqueue(event("e4"));

		let dropped = queue.requeue_front(failed);
		assert_eq!(dropped, 0);
		assert_eq!(names(&queue.take_batch()), vec!["e1", "e2", "e3", "e4"]);
	}

	#[test]
	fn requeue_front_drops_oldest_of_returned_batch() {
		let mut queue = BatchQueue::new(2, 4);
		queue.enqueue(event("e1"));
		queue.enqueue(event("e2"));
		queue.enqueue(event("e3"));
		let failed = queue.take_batch();

		queue.enqueue(event("e4"));
		queue.enqueue(event("e5"));

		// 3 returned + 2 queued > cap 4: one oldest returned event goes.
		let dropped = queue.requeue_front(failed);
		assert_eq!(dropped, 1);
		assert_eq!(names(&queue.take_batch()), vec!["e2", "e3", "e4", "e5"]);
	}

	#[test]
	fn requeue_into_full_queue_keeps_the_newest_queue_contents() {
		let mut queue = BatchQueue::new(2, 2);
		queue.enqueue(event("e1"));
		let failed = queue.take_batch();

		queue.enqueue(event("e2"));
		queue.enqueue(event("e3"));

		let dropped = queue.requeue_front(failed);
		assert_eq!(dropped, 1);
		assert_eq!(names(&queue.take_batch()), vec!["e2", "e3"]);
	}

	#[test]
	fn clear_empties_the_queue() {
		let mut queue = BatchQueue::new(3, 10);
		queue.enqueue(event("a"));
		queue.clear();
		assert_eq!(queue.state(), QueueState::Idle);
	}

	proptest! {
		#[test]
		fn len_never_exceeds_cap(
			cap in 1usize..32,
			enqueues in 0usize..64,
		) {
			let mut queue = BatchQueue::new(1, cap);
			for i in 0..enqueues {
				queue.enqueue(event(&format!("e{i}")));
			}
			prop_assert!(queue.len() <= cap);
			prop_assert_eq!(queue.len(), enqueues.min(cap));
		}

		#[test]
		fn requeue_respects_cap_and_order(
			cap in 1usize..16,
			batch_len in 0usize..16,
			queued_len in 0usize..16,
		) {
			let mut queue = BatchQueue::new(1, cap);
			let mut seq = 0usize;
			let mut batch = Vec::new();
			for _ in 0..batch_len {
				batch.push(event(&format!("e{seq}")));
				seq += 1;
			}
			for _ in 0..queued_len.min(cap) {
				queue.enqueue(event(&format!("e{seq}")));
				seq += 1;
			}
			let queued_before = queue.len();

			let dropped = queue.requeue_front(batch);

			prop_assert!(queue.len() <= cap);
			prop_assert_eq!(queue.len() + dropped, batch_len + queued_before);

			// Surviving events are strictly ordered by sequence number.
			let batch = queue.take_batch();
			let numbers: Vec<usize> = names(&batch)
				.iter()
				.map(|n| n[1..].parse().unwrap())
				.collect();
			prop_assert!(numbers.windows(2).all(|w| w[0] < w[1]));
		}
	}
}
