pub mod schemas;

// domain for message threads
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Conversation between two users. Either participant may appear on either side.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, FromRow)]
pub struct Thread {
	pub id: i64,
	pub to_user_id: i64,
	pub from_user_id: i64,
	pub title: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub deleted: bool,
}

impl Thread {
	pub fn has_participant(
		&self,
		user_id: i64,
	) -> bool {
		self.to_user_id == user_id || self.from_user_id == user_id
	}
}

/// A thread together with the content of its most recent message.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, FromRow)]
pub struct ThreadPreview {
	pub id: i64,
	pub to_user_id: i64,
	pub from_user_id: i64,
	pub title: String,
	pub content: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl ThreadPreview {
	pub fn new(
		thread: Thread,
		content: String,
	) -> Self {
		Self {
			id: thread.id,
			to_user_id: thread.to_user_id,
			from_user_id: thread.from_user_id,
			title: thread.title,
			content,
			created_at: thread.created_at,
			updated_at: thread.updated_at,
		}
	}
}
