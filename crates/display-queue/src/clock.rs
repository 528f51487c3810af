use crate::types::TimeMs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Source of "now" for the scheduler, injected so tests can drive virtual time
pub trait Clock: Send + 'static {
	/// Milliseconds on this clock's timeline
	fn now(&self) -> TimeMs;
}

const FAR_FUTURE_MS: TimeMs = 30 * 365 * 24 * 60 * 60 * 1000;

/// Wall-clock time anchored at creation and advanced by tokio's monotonic clock.
///
/// Reads follow `tokio::time::pause`/`advance`, so the service can be tested
/// against paused time without touching the scheduler.
#[derive(Debug, Clone)]
pub struct SystemClock {
	epoch_ms: TimeMs,
	started: Instant,
}

impl SystemClock {
	pub fn new() -> Self {
		Self {
			epoch_ms: TimeMs::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0),
			started: Instant::now(),
		}
	}

	/// Tokio instant at which this clock reads `at`. Deadlines past what an
	/// `Instant` can hold are capped to roughly thirty years out.
	pub fn instant_at(&self, at: TimeMs) -> Instant {
		let offset = Duration::from_millis(at.saturating_sub(self.epoch_ms).min(FAR_FUTURE_MS));
		self.started.checked_add(offset).unwrap_or(self.started)
	}
}

impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for SystemClock {
	fn now(&self) -> TimeMs {
		let elapsed = TimeMs::try_from(self.started.elapsed().as_millis()).unwrap_or(TimeMs::MAX);
		self.epoch_ms.saturating_add(elapsed)
	}
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
	now: Arc<AtomicU64>,
}

impl ManualClock {
	pub fn new(start: TimeMs) -> Self {
		Self {
			now: Arc::new(AtomicU64::new(start)),
		}
	}

	pub fn set(&self, at: TimeMs) {
		self.now.store(at, Ordering::SeqCst);
	}

	pub fn advance(&self, by: TimeMs) -> TimeMs {
		self.now.fetch_add(by, Ordering::SeqCst) + by
	}
}

impl Clock for ManualClock {
	fn now(&self) -> TimeMs {
		self.now.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_manual_clock_is_shared() {
		let clock = ManualClock::new(10);
		let other = clock.clone();

		assert_eq!(clock.advance(90), 100);
		assert_eq!(other.now(), 100);

		other.set(5);
		assert_eq!(clock.now(), 5);
	}

	#[tokio::test(start_paused = true)]
	async fn test_system_clock_follows_paused_time() {
		let clock = SystemClock::new();
		let before = clock.now();

		tokio::time::advance(Duration::from_millis(250)).await;

		assert_eq!(clock.now() - before, 250);
		assert_eq!(clock.instant_at(before + 100), clock.started + Duration::from_millis(100));
	}

	#[test]
	fn test_system_clock_caps_far_deadlines() {
		let clock = SystemClock::new();
		assert_eq!(clock.instant_at(TimeMs::MAX), clock.started + Duration::from_millis(FAR_FUTURE_MS));
	}
}
