use serde::{Deserialize, Serialize};
use std::fmt;

/// Time in milliseconds
pub type TimeMs = u64;

/// Identifier of a display group
pub type GroupId = String;

/// Unique identifier of an admitted queue item.
///
/// Built from the media event id, the admission time and a scheduler-wide
/// sequence number so that two admissions of the same media in the same
/// millisecond never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
	pub fn new(media_id: &str, admitted_at: TimeMs, seq: u64) -> Self {
		Self(format!("{media_id}-{admitted_at}-{seq}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ItemId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Hands out item ids; one per scheduler
#[derive(Debug, Default)]
pub struct ItemIdGen {
	seq: u64,
}

impl ItemIdGen {
	pub fn next(&mut self, media_id: &str, admitted_at: TimeMs) -> ItemId {
		self.seq += 1;
		ItemId::new(media_id, admitted_at, self.seq)
	}
}

/// Lifecycle stage of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
	Pending,
	Entering,
	Visible,
	Exiting,
}

impl Phase {
	/// Items in any phase but `Exiting` still block sequential groups
	pub const fn is_exiting(self) -> bool {
		matches!(self, Self::Exiting)
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Entering => "entering",
			Self::Visible => "visible",
			Self::Exiting => "exiting",
		}
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Converts a duration in (possibly fractional) seconds to whole milliseconds.
/// Durations too long for a `TimeMs` saturate at `TimeMs::MAX`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn secs_to_ms(secs: f64) -> TimeMs {
	if secs.is_finite() && secs > 0.0 {
		// finite and positive; float-to-int `as` saturates
		(secs * 1000.0).round() as TimeMs
	} else {
		0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_item_ids_differ_by_sequence() {
		let a = ItemId::new("m1", 1000, 1);
		let b = ItemId::new("m1", 1000, 2);
		assert_ne!(a, b);
		assert_eq!(a.as_str(), "m1-1000-1");
	}

	#[test]
	fn test_secs_to_ms() {
		assert_eq!(secs_to_ms(1.0), 1000);
		assert_eq!(secs_to_ms(2.5), 2500);
		assert_eq!(secs_to_ms(-1.0), 0);
		assert_eq!(secs_to_ms(f64::NAN), 0);
		assert_eq!(secs_to_ms(1e300), TimeMs::MAX);
	}

	#[test]
	fn test_phase_serializes_lowercase() {
		assert_eq!(serde_json::to_string(&Phase::Exiting).unwrap(), "\"exiting\"");
	}
}
