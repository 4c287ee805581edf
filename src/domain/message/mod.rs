use std::ops::Deref;

pub mod commands;
pub mod entity;

pub use self::entity::{Message, MessageView};

impl Message {
	pub fn is_sender(
		&self,
		user_id: i64,
	) -> bool {
		self.from_user_id == user_id
	}

	pub fn is_recipient(
		&self,
		user_id: i64,
	) -> bool {
		self.to_user_id == user_id
	}
}

impl Deref for MessageView {
	type Target = Message;
	fn deref(&self) -> &Self::Target {
		&self.message
	}
}
