use crate::error::{Error, Result};
use crate::group::DisplayGroup;
use crate::media::ShowRequest;
use serde::{Deserialize, Serialize};

pub const CHANNEL_SHOW: &str = "media:show";
pub const CHANNEL_GROUPS_UPDATED: &str = "media-groups:updated";

/// Raw `{ channel, payload }` envelope as it arrives on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
	pub channel: String,
	#[serde(default)]
	pub payload: serde_json::Value,
}

/// Messages the scheduler understands
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
	Show(ShowRequest),
	GroupsUpdated(Vec<DisplayGroup>),
}

impl InboundMessage {
	pub fn from_envelope(envelope: Envelope) -> Result<Self> {
		match envelope.channel.as_str() {
			CHANNEL_SHOW => Ok(Self::Show(serde_json::from_value(envelope.payload)?)),
			CHANNEL_GROUPS_UPDATED => {
				// a null payload means "no groups"
				let groups: Option<Vec<DisplayGroup>> = serde_json::from_value(envelope.payload)?;
				Ok(Self::GroupsUpdated(groups.unwrap_or_default()))
			}
			_ => Err(Error::UnknownChannel(envelope.channel)),
		}
	}

	/// Decodes one JSON text message
	pub fn parse(raw: &str) -> Result<Self> {
		Self::from_envelope(serde_json::from_str(raw)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::group::QueueMode;

	#[test]
	fn test_parse_show() {
		let raw = r#"{"channel":"media:show","payload":{"mediaEvent":{"id":"m1","groupId":"g"},"context":{"user":"A"}}}"#;

		let InboundMessage::Show(request) = InboundMessage::parse(raw).unwrap() else {
			panic!("expected a show request");
		};
		assert_eq!(request.media_event.id, "m1");
		assert_eq!(request.context["user"], "A");
	}

	#[test]
	fn test_parse_groups() {
		let raw = r#"{"channel":"media-groups:updated","payload":[{"id":"a"},{"id":"b","queue":{"mode":"replace"}}]}"#;

		let InboundMessage::GroupsUpdated(groups) = InboundMessage::parse(raw).unwrap() else {
			panic!("expected a group update");
		};
		assert_eq!(groups.len(), 2);
		assert_eq!(groups[1].queue.mode, QueueMode::Replace);

		let empty = InboundMessage::parse(r#"{"channel":"media-groups:updated","payload":null}"#).unwrap();
		assert_eq!(empty, InboundMessage::GroupsUpdated(vec![]));
	}

	#[test]
	fn test_unknown_channel_and_bad_json() {
		let err = InboundMessage::parse(r#"{"channel":"media-overlay:get-debug"}"#).unwrap_err();
		assert!(matches!(err, Error::UnknownChannel(ref c) if c == "media-overlay:get-debug"));
		assert!(err.is_recoverable());

		assert!(matches!(InboundMessage::parse("{not json"), Err(Error::Serialization(_))));
	}
}
