use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, FromRow)]
pub struct Message {
	pub id: i64,
	pub thread_id: i64,
	pub to_user_id: i64,
	pub from_user_id: i64,
	pub content: String,
	pub readed: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub deleted: bool,
}

/// Message row joined with the display names of both participants.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, FromRow)]
pub struct MessageView {
	#[sqlx(flatten)]
	#[serde(flatten)]
	pub message: Message,
	pub from_first_name: Option<String>,
	pub from_last_name: Option<String>,
	pub to_first_name: Option<String>,
	pub to_last_name: Option<String>,
}
