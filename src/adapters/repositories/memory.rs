use std::collections::BTreeMap;
#[cfg(test)]
use std::sync::{
	atomic::{AtomicUsize, Ordering},
	Mutex,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{MessageRepository, ThreadRepository, UserRepository};
#[cfg(test)]
use crate::services::response::ErrorKind;
use crate::{
	domain::{
		message::{Message, MessageView},
		thread::{Thread, ThreadPreview},
	},
	services::response::ServiceError,
};

#[derive(Debug, Clone, Default)]
pub struct UserRecord {
	pub id: i64,
	pub first_name: String,
	pub last_name: String,
}

#[derive(Default)]
struct MemoryState {
	users: BTreeMap<i64, UserRecord>,
	threads: BTreeMap<i64, Thread>,
	messages: BTreeMap<i64, Message>,
	last_thread_id: i64,
	last_message_id: i64,
}

impl MemoryState {
	fn view(
		&self,
		message: &Message,
	) -> MessageView {
		let from = self.users.get(&message.from_user_id);
		let to = self.users.get(&message.to_user_id);
		MessageView {
			message: message.clone(),
			from_first_name: from.map(|u| u.first_name.clone()),
			from_last_name: from.map(|u| u.last_name.clone()),
			to_first_name: to.map(|u| u.first_name.clone()),
			to_last_name: to.map(|u| u.last_name.clone()),
		}
	}

	fn touch_thread(
		&mut self,
		thread_id: i64,
	) {
		if let Some(thread) = self.threads.get_mut(&thread_id) {
			thread.updated_at = Utc::now();
		}
	}

	/// Live message matching the compound filter, if any.
	fn find_message_mut(
		&mut self,
		message_id: i64,
		thread_id: i64,
		matches_user: impl Fn(&Message) -> bool,
	) -> Option<&mut Message> {
		self.messages
			.get_mut(&message_id)
			.filter(|m| !m.deleted && m.thread_id == thread_id && matches_user(m))
	}
}

/// In-process store with the same filtering rules as the Postgres one.
///
/// Ids are assigned from a counter, so for equal timestamps a larger id means a later insert.
#[derive(Default)]
pub struct MemoryRepository {
	state: RwLock<MemoryState>,
	#[cfg(test)]
	calls: AtomicUsize,
	#[cfg(test)]
	message_insert_fault: Mutex<Option<ErrorKind>>,
}

impl MemoryRepository {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn add_user(
		&self,
		id: i64,
		first_name: &str,
		last_name: &str,
	) {
		self.state.write().await.users.insert(
			id,
			UserRecord {
				id,
				first_name: first_name.to_string(),
				last_name: last_name.to_string(),
			},
		);
	}

	/// Number of storage operations served so far.
	#[cfg(test)]
	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Makes every following `create_message` fail with an error of `kind`, `None` clears it.
	#[cfg(test)]
	pub fn fail_message_inserts(
		&self,
		kind: Option<ErrorKind>,
	) {
		*self.message_insert_fault.lock().unwrap() = kind;
	}

	#[cfg(test)]
	fn injected_insert_error(&self) -> Option<ServiceError> {
		match (*self.message_insert_fault.lock().unwrap())? {
			ErrorKind::ConstraintViolation => Some(ServiceError::ConstraintViolation("customer_message foreign key".into())),
			ErrorKind::NotFound => Some(ServiceError::NoResult),
			ErrorKind::InvalidArgument => Some(ServiceError::InvalidArgument("content".into())),
			ErrorKind::Unauthorized => Some(ServiceError::Unauthorized),
			ErrorKind::Infrastructure => Some(ServiceError::StorageError("customer_message insert failed".into())),
		}
	}

	pub async fn thread(
		&self,
		thread_id: i64,
	) -> Option<Thread> {
		self.state.read().await.threads.get(&thread_id).cloned()
	}

	pub async fn message(
		&self,
		message_id: i64,
	) -> Option<Message> {
		self.state.read().await.messages.get(&message_id).cloned()
	}

	pub async fn thread_count(&self) -> usize {
		self.state.read().await.threads.len()
	}

	fn record_call(&self) {
		#[cfg(test)]
		self.calls.fetch_add(1, Ordering::SeqCst);
	}
}

fn page<T>(
	items: impl Iterator<Item = T>,
	count: i64,
	offset: i64,
) -> Vec<T> {
	items
		.skip(usize::try_from(offset).unwrap_or(0))
		.take(usize::try_from(count).unwrap_or(0))
		.collect()
}

#[async_trait]
impl UserRepository for MemoryRepository {
	async fn user_exists(
		&self,
		user_id: i64,
	) -> Result<bool, ServiceError> {
		self.record_call();
		Ok(self.state.read().await.users.contains_key(&user_id))
	}
}

#[async_trait]
impl ThreadRepository for MemoryRepository {
	async fn thread_exists(
		&self,
		thread_id: i64,
	) -> Result<bool, ServiceError> {
		self.record_call();
		Ok(self.state.read().await.threads.get(&thread_id).is_some_and(|t| !t.deleted))
	}

	async fn create_thread(
		&self,
		title: &str,
		to_user_id: i64,
		from_user_id: i64,
	) -> Result<i64, ServiceError> {
		self.record_call();
		let mut state = self.state.write().await;
		if !state.users.contains_key(&to_user_id) || !state.users.contains_key(&from_user_id) {
			return Err(ServiceError::ConstraintViolation("message_thread user reference".into()));
		}

		state.last_thread_id += 1;
		let id = state.last_thread_id;
		let now = Utc::now();
		state.threads.insert(
			id,
			Thread {
				id,
				to_user_id,
				from_user_id,
				title: title.to_string(),
				created_at: now,
				updated_at: now,
				deleted: false,
			},
		);
		Ok(id)
	}

	async fn list_threads_by_user(
		&self,
		user_id: i64,
		count: i64,
		offset: i64,
	) -> Result<Vec<ThreadPreview>, ServiceError> {
		self.record_call();
		let state = self.state.read().await;

		let mut previews: Vec<(&Message, &Thread)> = state
			.threads
			.values()
			.filter(|t| !t.deleted && t.has_participant(user_id))
			.filter_map(|t| {
				state
					.messages
					.values()
					.filter(|m| m.thread_id == t.id && !m.deleted)
					.max_by_key(|m| (m.created_at, m.id))
					.map(|last| (last, t))
			})
			.collect();
		previews.sort_by(|(a, _), (b, _)| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

		Ok(page(
			previews.into_iter().map(|(last, t)| ThreadPreview::new(t.clone(), last.content.clone())),
			count,
			offset,
		))
	}
}

#[async_trait]
impl MessageRepository for MemoryRepository {
	async fn message_exists(
		&self,
		message_id: i64,
	) -> Result<bool, ServiceError> {
		self.record_call();
		Ok(self.state.read().await.messages.get(&message_id).is_some_and(|m| !m.deleted))
	}

	async fn create_message(
		&self,
		to_user_id: i64,
		from_user_id: i64,
		thread_id: i64,
		content: &str,
	) -> Result<(), ServiceError> {
		self.record_call();
		#[cfg(test)]
		if let Some(err) = self.injected_insert_error() {
			return Err(err);
		}

		let mut state = self.state.write().await;
		if !state.users.contains_key(&to_user_id)
			|| !state.users.contains_key(&from_user_id)
			|| !state.threads.contains_key(&thread_id)
		{
			return Err(ServiceError::ConstraintViolation("customer_message foreign key".into()));
		}

		state.last_message_id += 1;
		let id = state.last_message_id;
		let now = Utc::now();
		state.messages.insert(
			id,
			Message {
				id,
				thread_id,
				to_user_id,
				from_user_id,
				content: content.to_string(),
				readed: false,
				created_at: now,
				updated_at: now,
				deleted: false,
			},
		);
		state.touch_thread(thread_id);
		Ok(())
	}

	async fn update_message_content(
		&self,
		content: &str,
		from_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError> {
		self.record_call();
		let mut state = self.state.write().await;
		let Some(message) = state.find_message_mut(message_id, thread_id, |m| m.is_sender(from_user_id)) else {
			return Ok(0);
		};
		message.content = content.to_string();
		message.updated_at = Utc::now();
		state.touch_thread(thread_id);
		Ok(1)
	}

	async fn mark_read(
		&self,
		read: bool,
		to_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError> {
		self.record_call();
		let mut state = self.state.write().await;
		let Some(message) = state.find_message_mut(message_id, thread_id, |m| m.is_recipient(to_user_id)) else {
			return Ok(0);
		};
		message.readed = read;
		message.updated_at = Utc::now();
		state.touch_thread(thread_id);
		Ok(1)
	}

	async fn delete_message(
		&self,
		from_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError> {
		self.record_call();
		let mut state = self.state.write().await;
		let removable = state
			.messages
			.get(&message_id)
			.is_some_and(|m| m.thread_id == thread_id && m.is_sender(from_user_id));
		if !removable {
			return Ok(0);
		}
		state.messages.remove(&message_id);
		state.touch_thread(thread_id);
		Ok(1)
	}

	async fn list_messages_by_thread(
		&self,
		thread_id: i64,
		user_id: i64,
		count: i64,
		offset: i64,
	) -> Result<Vec<MessageView>, ServiceError> {
		self.record_call();
		let state = self.state.read().await;
		let mut messages: Vec<&Message> = state
			.messages
			.values()
			.filter(|m| !m.deleted && m.thread_id == thread_id && (m.is_sender(user_id) || m.is_recipient(user_id)))
			.collect();
		messages.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

		Ok(page(messages.into_iter().map(|m| state.view(m)), count, offset))
	}

	async fn get_message_by_id(
		&self,
		to_user_id: i64,
		message_id: i64,
	) -> Result<Option<MessageView>, ServiceError> {
		self.record_call();
		let state = self.state.read().await;
		Ok(state
			.messages
			.get(&message_id)
			.filter(|m| !m.deleted && m.is_recipient(to_user_id))
			.map(|m| state.view(m)))
	}
}
