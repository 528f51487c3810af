use crate::error::{Error, Result};
use crate::types::{secs_to_ms, GroupId, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hold time used when neither the request nor the group provides one
pub const FALLBACK_DURATION_SECS: f64 = 5.0;

/// How a group arbitrates between active items and newly admitted ones.
///
/// An unrecognized mode string is kept verbatim in `Invalid` so the group can be
/// reported and frozen instead of failing the whole group list on decode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueueMode {
	#[default]
	Sequential,
	Replace,
	Stack,
	Invalid(String),
}

impl QueueMode {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Sequential => "sequential",
			Self::Replace => "replace",
			Self::Stack => "stack",
			Self::Invalid(raw) => raw,
		}
	}

	pub const fn is_valid(&self) -> bool {
		!matches!(self, Self::Invalid(_))
	}
}

impl From<String> for QueueMode {
	fn from(raw: String) -> Self {
		match raw.as_str() {
			"sequential" => Self::Sequential,
			"replace" => Self::Replace,
			"stack" => Self::Stack,
			_ => Self::Invalid(raw),
		}
	}
}

impl From<&str> for QueueMode {
	fn from(raw: &str) -> Self {
		Self::from(raw.to_string())
	}
}

impl From<QueueMode> for String {
	fn from(mode: QueueMode) -> Self {
		mode.as_str().to_string()
	}
}

impl fmt::Display for QueueMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
	#[default]
	Fixed,
	Random,
	Stack,
}

/// Compass point the renderer aligns group content to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
	TopLeft,
	TopCenter,
	TopRight,
	CenterLeft,
	#[default]
	Center,
	CenterRight,
	BottomLeft,
	BottomCenter,
	BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizeSettings {
	/// 0 means auto
	pub width: f64,
	/// 0 means auto
	pub height: f64,
	pub max_width: f64,
	pub max_height: f64,
	pub media_width: f64,
	pub media_height: f64,
	pub content_scale: f64,
}

impl Default for SizeSettings {
	fn default() -> Self {
		Self {
			width: 0.0,
			height: 0.0,
			max_width: 800.0,
			max_height: 600.0,
			media_width: 0.0,
			media_height: 0.0,
			content_scale: 1.0,
		}
	}
}

/// Enter/exit animation. The styles are opaque here; only the durations gate phase changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationSettings {
	#[serde(rename = "in")]
	pub in_style: String,
	#[serde(rename = "out")]
	pub out_style: String,
	/// `0` is an instant transition; only a missing value takes the default
	pub in_duration: TimeMs,
	pub out_duration: TimeMs,
	pub easing: String,
}

impl Default for AnimationSettings {
	fn default() -> Self {
		Self {
			in_style: "fade".to_string(),
			out_style: "fade".to_string(),
			in_duration: 300,
			out_duration: 300,
			easing: "ease-out".to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueSettings {
	pub mode: QueueMode,
	/// Upper bound on concurrently active items in `stack` mode
	pub max_items: usize,
	/// Advisory spacing for the renderer, not enforced by the scheduler
	pub gap_between: TimeMs,
}

impl Default for QueueSettings {
	fn default() -> Self {
		Self {
			mode: QueueMode::Sequential,
			max_items: 10,
			gap_between: 500,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RandomSettings {
	pub rotation_enabled: bool,
	/// Degrees, applied symmetrically around 0
	pub max_rotation: f64,
}

impl Default for RandomSettings {
	fn default() -> Self {
		Self {
			rotation_enabled: false,
			max_rotation: 15.0,
		}
	}
}

/// A named, independently scheduled destination for media show requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayGroup {
	pub id: GroupId,
	#[serde(default)]
	pub name: String,
	#[serde(default = "default_enabled")]
	pub enabled: bool,
	#[serde(default)]
	pub placement: Placement,
	#[serde(default)]
	pub anchor: Anchor,
	#[serde(default)]
	pub position: Position,
	#[serde(default)]
	pub size: SizeSettings,
	#[serde(default)]
	pub animation: AnimationSettings,
	#[serde(default)]
	pub queue: QueueSettings,
	/// Seconds
	#[serde(default = "default_duration")]
	pub default_duration: f64,
	#[serde(default = "default_z_index")]
	pub z_index: i32,
	#[serde(default)]
	pub random_settings: RandomSettings,
}

fn default_enabled() -> bool {
	true
}

fn default_duration() -> f64 {
	FALLBACK_DURATION_SECS
}

fn default_z_index() -> i32 {
	100
}

impl DisplayGroup {
	pub fn new(id: impl Into<GroupId>) -> Self {
		let id = id.into();
		Self {
			name: id.clone(),
			id,
			enabled: true,
			placement: Placement::default(),
			anchor: Anchor::default(),
			position: Position::default(),
			size: SizeSettings::default(),
			animation: AnimationSettings::default(),
			queue: QueueSettings::default(),
			default_duration: FALLBACK_DURATION_SECS,
			z_index: default_z_index(),
			random_settings: RandomSettings::default(),
		}
	}

	pub fn with_mode(mut self, mode: impl Into<QueueMode>) -> Self {
		self.queue.mode = mode.into();
		self
	}

	pub fn with_max_items(mut self, max_items: usize) -> Self {
		self.queue.max_items = max_items;
		self
	}

	pub fn with_timings(mut self, in_duration: TimeMs, out_duration: TimeMs) -> Self {
		self.animation.in_duration = in_duration;
		self.animation.out_duration = out_duration;
		self
	}

	pub fn with_default_duration(mut self, secs: f64) -> Self {
		self.default_duration = secs;
		self
	}

	pub fn with_placement(mut self, placement: Placement) -> Self {
		self.placement = placement;
		self
	}

	pub fn with_enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	/// Resolves how long an item stays visible, in seconds.
	///
	/// The request's own duration wins when positive, then the group default, then 5s.
	pub fn resolve_duration(&self, requested: Option<f64>) -> f64 {
		[requested.unwrap_or(0.0), self.default_duration]
			.into_iter()
			.find(|secs| secs.is_finite() && *secs > 0.0)
			.unwrap_or(FALLBACK_DURATION_SECS)
	}

	pub fn hold_ms(&self, requested: Option<f64>) -> TimeMs {
		secs_to_ms(self.resolve_duration(requested))
	}

	pub fn validate(&self) -> Result<()> {
		if self.id.is_empty() {
			return Err(Error::InvalidGroup("group has empty id".to_string()));
		}
		if let QueueMode::Invalid(raw) = &self.queue.mode {
			return Err(Error::InvalidQueueMode(format!("group '{}' uses unknown mode '{}'", self.id, raw)));
		}
		Ok(())
	}
}
