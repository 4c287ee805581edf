//! Storage operations the messaging service needs, independent of the engine behind them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
	domain::{message::MessageView, thread::ThreadPreview},
	services::response::ServiceError,
};

pub use self::{memory::MemoryRepository, postgres::PgRepository};

#[async_trait]
pub trait UserRepository: Send + Sync {
	/// `Ok(false)` when the user is absent; errors are infrastructure failures only.
	async fn user_exists(
		&self,
		user_id: i64,
	) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait ThreadRepository: Send + Sync {
	async fn thread_exists(
		&self,
		thread_id: i64,
	) -> Result<bool, ServiceError>;

	/// Always inserts; an existing thread between the same pair is not reused.
	async fn create_thread(
		&self,
		title: &str,
		to_user_id: i64,
		from_user_id: i64,
	) -> Result<i64, ServiceError>;

	/// Threads where the user is either participant, each with its latest message content,
	/// newest activity first. Threads without messages are left out.
	async fn list_threads_by_user(
		&self,
		user_id: i64,
		count: i64,
		offset: i64,
	) -> Result<Vec<ThreadPreview>, ServiceError>;
}

/// Writes filter on the full (message, thread, user) triple, so a caller who is not the
/// sender or recipient matches zero rows. The affected row count is returned untouched.
#[async_trait]
pub trait MessageRepository: Send + Sync {
	async fn message_exists(
		&self,
		message_id: i64,
	) -> Result<bool, ServiceError>;

	async fn create_message(
		&self,
		to_user_id: i64,
		from_user_id: i64,
		thread_id: i64,
		content: &str,
	) -> Result<(), ServiceError>;

	async fn update_message_content(
		&self,
		content: &str,
		from_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError>;

	async fn mark_read(
		&self,
		read: bool,
		to_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError>;

	async fn delete_message(
		&self,
		from_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError>;

	/// Messages of the thread the user sent or received, newest first.
	async fn list_messages_by_thread(
		&self,
		thread_id: i64,
		user_id: i64,
		count: i64,
		offset: i64,
	) -> Result<Vec<MessageView>, ServiceError>;

	async fn get_message_by_id(
		&self,
		to_user_id: i64,
		message_id: i64,
	) -> Result<Option<MessageView>, ServiceError>;
}

pub trait MessagingRepository: UserRepository + ThreadRepository + MessageRepository {}
impl<T: UserRepository + ThreadRepository + MessageRepository> MessagingRepository for T {}
