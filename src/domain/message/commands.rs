use serde::{Deserialize, Serialize};

use super::MessageView;
use crate::domain::deserialize_id;

/// Post into an existing thread, or start a new one when `thread_id` is zero.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostMessage {
	#[serde(deserialize_with = "deserialize_id")]
	pub to_user_id: i64,
	#[serde(deserialize_with = "deserialize_id")]
	pub from_user_id: i64,
	#[serde(default)]
	pub subject: String,
	pub content: String,
	#[serde(default, deserialize_with = "deserialize_id")]
	pub thread_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PostMessageResp {
	pub new_thread_created: bool,
	pub thread_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PatchMessage {
	#[serde(deserialize_with = "deserialize_id")]
	pub to_user_id: i64,
	#[serde(deserialize_with = "deserialize_id")]
	pub from_user_id: i64,
	#[serde(deserialize_with = "deserialize_id")]
	pub message_id: i64,
	#[serde(deserialize_with = "deserialize_id")]
	pub thread_id: i64,
	pub content: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct MarkMessageRead {
	#[serde(deserialize_with = "deserialize_id")]
	pub message_id: i64,
	#[serde(deserialize_with = "deserialize_id")]
	pub thread_id: i64,
	pub readed: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct DeleteMessage {
	#[serde(deserialize_with = "deserialize_id")]
	pub from_user_id: i64,
	#[serde(deserialize_with = "deserialize_id")]
	pub message_id: i64,
	#[serde(deserialize_with = "deserialize_id")]
	pub thread_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ListMessages {
	#[serde(deserialize_with = "deserialize_id")]
	pub thread_id: i64,
	pub count: i64,
	#[serde(default, alias = "offseet")]
	pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResp {
	pub thread_id: i64,
	pub message_id: i64,
	pub from_id: i64,
	pub from_first: String,
	pub from_last: String,
	pub to_id: i64,
	pub to_first: String,
	pub to_last: String,
	pub content: String,
	pub readed: bool,
	pub created: String,
}

impl From<MessageView> for MessageResp {
	fn from(value: MessageView) -> Self {
		Self {
			thread_id: value.message.thread_id,
			message_id: value.message.id,
			from_id: value.message.from_user_id,
			from_first: value.from_first_name.unwrap_or_default(),
			from_last: value.from_last_name.unwrap_or_default(),
			to_id: value.message.to_user_id,
			to_first: value.to_first_name.unwrap_or_default(),
			to_last: value.to_last_name.unwrap_or_default(),
			content: value.message.content,
			readed: value.message.readed,
			created: value.message.created_at.to_rfc3339(),
		}
	}
}

#[test]
fn test_post_message_defaults_to_new_thread() {
	let cmd = serde_json::from_str::<PostMessage>(r#"{"to_user_id": 2, "from_user_id": 1, "content": "hello"}"#).unwrap();
	assert_eq!(cmd.thread_id, 0);
	assert_eq!(cmd.subject, "");
}

#[test]
fn test_ids_outside_u32_are_rejected() {
	let negative = serde_json::from_str::<DeleteMessage>(r#"{"from_user_id": -1, "message_id": 1, "thread_id": 1}"#);
	assert!(negative.is_err());
	let too_large = serde_json::from_str::<MarkMessageRead>(r#"{"message_id": 4294967296, "thread_id": 1, "readed": true}"#);
	assert!(too_large.is_err());

	let widest = serde_json::from_str::<MarkMessageRead>(r#"{"message_id": 4294967295, "thread_id": 1, "readed": true}"#).unwrap();
	assert_eq!(widest.message_id, 4_294_967_295);
}
