use crate::types::GroupId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Substitution values for caption templates
pub type Context = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
	#[default]
	Image,
	Video,
	Audio,
}

/// A piece of media that can be shown in a display group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEvent {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group_id: Option<GroupId>,
	#[serde(default)]
	pub media_type: MediaType,
	#[serde(default)]
	pub media_url: String,
	/// Template with `${key}` placeholders until the item is admitted
	#[serde(default)]
	pub caption: String,
	/// Seconds
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_duration: Option<f64>,
	/// Presentation data for the renderer
	#[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
	pub style: serde_json::Value,
}

impl MediaEvent {
	pub fn new(id: impl Into<String>, group_id: impl Into<GroupId>) -> Self {
		Self {
			id: id.into(),
			group_id: Some(group_id.into()),
			media_type: MediaType::Image,
			media_url: String::new(),
			caption: String::new(),
			display_duration: None,
			style: serde_json::Value::Null,
		}
	}

	pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
		self.caption = caption.into();
		self
	}

	pub fn with_duration(mut self, secs: f64) -> Self {
		self.display_duration = Some(secs);
		self
	}

	pub fn with_media(mut self, media_type: MediaType, url: impl Into<String>) -> Self {
		self.media_type = media_type;
		self.media_url = url.into();
		self
	}
}

/// A request to show a media event, as delivered by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowRequest {
	pub media_event: MediaEvent,
	#[serde(default, deserialize_with = "deserialize_context")]
	pub context: Context,
}

impl ShowRequest {
	pub fn new(media_event: MediaEvent) -> Self {
		Self {
			media_event,
			context: Context::new(),
		}
	}

	pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.context.insert(key.into(), value.into());
		self
	}
}

/// Accepts any JSON scalar as a context value. Falsy values become empty strings.
fn deserialize_context<'de, D>(deserializer: D) -> Result<Context, D::Error>
where
	D: Deserializer<'de>,
{
	let raw: Option<HashMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
	Ok(raw.unwrap_or_default().into_iter().map(|(key, value)| (key, context_value(value))).collect())
}

fn context_value(value: serde_json::Value) -> String {
	use serde_json::Value;

	match value {
		Value::Null | Value::Bool(false) => String::new(),
		Value::String(s) => s,
		Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_show_request_decoding() {
		let raw = r#"{
			"mediaEvent": {
				"id": "m1",
				"groupId": "alerts",
				"mediaType": "video",
				"mediaUrl": "file:///clip.mp4",
				"caption": "Thanks ${user}",
				"displayDuration": 3
			},
			"context": { "user": "Alice", "amount": 5, "missing": null, "zero": 0 }
		}"#;
		let request: ShowRequest = serde_json::from_str(raw).unwrap();

		assert_eq!(request.media_event.group_id.as_deref(), Some("alerts"));
		assert_eq!(request.media_event.media_type, MediaType::Video);
		assert_eq!(request.media_event.display_duration, Some(3.0));
		assert_eq!(request.context["user"], "Alice");
		assert_eq!(request.context["amount"], "5");
		assert_eq!(request.context["missing"], "");
		assert_eq!(request.context["zero"], "");
	}

	#[test]
	fn test_context_is_optional() {
		let request: ShowRequest = serde_json::from_str(r#"{"mediaEvent":{"id":"m1"},"context":null}"#).unwrap();
		assert!(request.context.is_empty());

		let request: ShowRequest = serde_json::from_str(r#"{"mediaEvent":{"id":"m1"}}"#).unwrap();
		assert!(request.context.is_empty());
		assert!(request.media_event.group_id.is_none());
	}
}
