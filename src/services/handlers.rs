use crate::{
	adapters::repositories::{MessageRepository, ThreadRepository},
	domain::{
		message::commands::{DeleteMessage, ListMessages, MarkMessageRead, MessageResp, PatchMessage, PostMessage, PostMessageResp},
		thread::schemas::{ListThreads, ThreadResp},
		user::{parse_user_id, CurrentUser},
	},
	services::{
		response::ServiceError,
		validators::{check_message_exist, check_page, check_thread_exist, check_user_exist},
		MessagingState,
	},
};

pub struct MessageHandler;
impl MessageHandler {
	/// Appends to `thread_id`, or opens a new thread titled with the subject when it is zero.
	///
	/// Thread creation and message creation are two separate writes. If the message insert
	/// fails, the freshly created thread stays behind without messages.
	pub async fn post_message(
		current_user: &CurrentUser,
		cmd: PostMessage,
		state: MessagingState,
	) -> Result<PostMessageResp, ServiceError> {
		current_user.ensure_is(cmd.from_user_id).map_err(|_| ServiceError::WrongSender)?;

		check_user_exist(&*state, cmd.from_user_id, "sender").await?;
		check_user_exist(&*state, cmd.to_user_id, "recipient").await?;

		let (thread_id, new_thread_created) = if cmd.thread_id != 0 {
			check_thread_exist(&*state, cmd.thread_id).await?;
			(cmd.thread_id, false)
		} else {
			let thread_id = state.create_thread(&cmd.subject, cmd.to_user_id, cmd.from_user_id).await.map_err(|err| {
				tracing::error!("error while create new thread: {}", err);
				err
			})?;
			tracing::debug!(thread_id, from_user_id = cmd.from_user_id, to_user_id = cmd.to_user_id, "new thread created");
			(thread_id, true)
		};

		state
			.create_message(cmd.to_user_id, cmd.from_user_id, thread_id, &cmd.content)
			.await
			.map_err(|err| {
				if new_thread_created {
					tracing::warn!(thread_id, "thread left without messages");
				}
				tracing::error!("error while create new user's message: {}", err);
				err
			})?;

		Ok(PostMessageResp {
			new_thread_created,
			thread_id,
		})
	}

	/// Content edit. Only the original sender, addressing the right thread, changes anything.
	pub async fn patch_message(
		current_user: &CurrentUser,
		cmd: PatchMessage,
		state: MessagingState,
	) -> Result<(), ServiceError> {
		current_user.ensure_is(cmd.from_user_id)?;

		check_user_exist(&*state, cmd.to_user_id, "recipient").await?;
		check_user_exist(&*state, cmd.from_user_id, "sender").await?;
		check_message_exist(&*state, cmd.message_id).await?;
		check_thread_exist(&*state, cmd.thread_id).await?;

		let affected = state
			.update_message_content(&cmd.content, cmd.from_user_id, cmd.message_id, cmd.thread_id)
			.await?;
		if affected == 0 {
			tracing::warn!(
				message_id = cmd.message_id,
				thread_id = cmd.thread_id,
				from_user_id = cmd.from_user_id,
				"message not patched: not the sender or wrong thread"
			);
			return Err(ServiceError::NoResult);
		}
		Ok(())
	}

	pub async fn delete_message(
		current_user: &CurrentUser,
		cmd: DeleteMessage,
		state: MessagingState,
	) -> Result<(), ServiceError> {
		current_user.ensure_is(cmd.from_user_id)?;

		check_thread_exist(&*state, cmd.thread_id).await?;
		check_user_exist(&*state, cmd.from_user_id, "sender").await?;
		check_message_exist(&*state, cmd.message_id).await?;

		let affected = state.delete_message(cmd.from_user_id, cmd.message_id, cmd.thread_id).await?;
		if affected == 0 {
			tracing::warn!(
				message_id = cmd.message_id,
				thread_id = cmd.thread_id,
				from_user_id = cmd.from_user_id,
				"message not deleted: not the sender or wrong thread"
			);
			return Err(ServiceError::NoResult);
		}
		Ok(())
	}

	/// Read-flag toggle by the recipient. `caller_user_id` is the raw session identifier.
	pub async fn mark_message_read(
		caller_user_id: &str,
		cmd: MarkMessageRead,
		state: MessagingState,
	) -> Result<(), ServiceError> {
		check_thread_exist(&*state, cmd.thread_id).await?;
		check_message_exist(&*state, cmd.message_id).await?;

		let user_id = parse_user_id(caller_user_id).map_err(|err| {
			tracing::warn!("error while mark message readed: {}", err);
			err
		})?;
		check_user_exist(&*state, user_id, "recipient").await?;

		let affected = state.mark_read(cmd.readed, user_id, cmd.message_id, cmd.thread_id).await?;
		if affected == 0 {
			tracing::warn!(message_id = cmd.message_id, thread_id = cmd.thread_id, user_id, "error while mark message readed: 0 rows affected");
			return Err(ServiceError::NoResult);
		}
		Ok(())
	}

	pub async fn list_threads(
		current_user: &CurrentUser,
		req: ListThreads,
		state: MessagingState,
	) -> Result<Vec<ThreadResp>, ServiceError> {
		check_page(req.count, req.offset)?;
		let user_id = current_user.id()?;

		let threads = state.list_threads_by_user(user_id, req.count, req.offset).await.map_err(|err| {
			tracing::error!("error while get user's threads: {}", err);
			err
		})?;
		Ok(threads.into_iter().map(ThreadResp::from).collect())
	}

	pub async fn list_messages(
		current_user: &CurrentUser,
		req: ListMessages,
		state: MessagingState,
	) -> Result<Vec<MessageResp>, ServiceError> {
		check_page(req.count, req.offset)?;
		if req.thread_id == 0 {
			return Err(ServiceError::InvalidArgument("thread ID is 0".into()));
		}
		let user_id = current_user.id()?;

		let messages = state
			.list_messages_by_thread(req.thread_id, user_id, req.count, req.offset)
			.await
			.map_err(|err| {
				tracing::error!("error while get customers messages list: {}", err);
				err
			})?;
		Ok(messages.into_iter().map(MessageResp::from).collect())
	}

	/// Single message addressed to the caller.
	pub async fn get_message(
		current_user: &CurrentUser,
		message_id: i64,
		state: MessagingState,
	) -> Result<MessageResp, ServiceError> {
		let user_id = current_user.id()?;
		state
			.get_message_by_id(user_id, message_id)
			.await?
			.map(MessageResp::from)
			.ok_or(ServiceError::NoResult)
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use rand::Rng;

	use super::MessageHandler;
	use crate::{
		adapters::repositories::MemoryRepository,
		domain::{
			message::commands::{DeleteMessage, ListMessages, MarkMessageRead, PatchMessage, PostMessage},
			thread::schemas::ListThreads,
			user::{CurrentUser, Role},
		},
		services::{
			response::{ErrorKind, ServiceError},
			MessagingState,
		},
	};

	async fn set_up() -> (Arc<MemoryRepository>, MessagingState) {
		let repo = Arc::new(MemoryRepository::new());
		repo.add_user(1, "Ann", "Lee").await;
		repo.add_user(2, "Bob", "Ray").await;
		repo.add_user(3, "Cid", "Moe").await;
		let state = MessagingState::from(repo.clone());
		(repo, state)
	}

	fn user(id: i64) -> CurrentUser {
		CurrentUser::new(id.to_string(), Role::Customer)
	}

	fn post(
		from: i64,
		to: i64,
		thread_id: i64,
		content: &str,
	) -> PostMessage {
		PostMessage {
			to_user_id: to,
			from_user_id: from,
			subject: "s".to_string(),
			content: content.to_string(),
			thread_id,
		}
	}

	fn list(thread_id: i64) -> ListMessages {
		ListMessages {
			thread_id,
			count: 100,
			offset: 0,
		}
	}

	#[tokio::test]
	async fn test_post_without_thread_creates_one() {
		let (repo, state) = set_up().await;

		let resp = MessageHandler::post_message(&user(1), post(1, 2, 0, "hello"), state.clone()).await.unwrap();

		assert!(resp.new_thread_created);
		assert_ne!(resp.thread_id, 0);
		assert_eq!(repo.thread_count().await, 1);
		let thread = repo.thread(resp.thread_id).await.unwrap();
		assert_eq!(thread.title, "s");
		assert_eq!((thread.from_user_id, thread.to_user_id), (1, 2));
	}

	#[tokio::test]
	async fn test_post_into_existing_thread_creates_none() {
		let (repo, state) = set_up().await;
		let first = MessageHandler::post_message(&user(1), post(1, 2, 0, "hello"), state.clone()).await.unwrap();

		let second = MessageHandler::post_message(&user(2), post(2, 1, first.thread_id, "reply"), state.clone()).await.unwrap();

		assert!(!second.new_thread_created);
		assert_eq!(second.thread_id, first.thread_id);
		assert_eq!(repo.thread_count().await, 1);
	}

	#[tokio::test]
	async fn test_post_without_thread_never_reuses_pair_thread() {
		let (repo, state) = set_up().await;
		let first = MessageHandler::post_message(&user(1), post(1, 2, 0, "a"), state.clone()).await.unwrap();
		let second = MessageHandler::post_message(&user(1), post(1, 2, 0, "b"), state.clone()).await.unwrap();

		assert!(second.new_thread_created);
		assert_ne!(first.thread_id, second.thread_id);
		assert_eq!(repo.thread_count().await, 2);
	}

	#[tokio::test]
	async fn test_post_rejects_missing_users_and_thread() {
		let (repo, state) = set_up().await;

		let err = MessageHandler::post_message(&user(9), post(9, 2, 0, "x"), state.clone()).await.unwrap_err();
		assert!(matches!(err, ServiceError::UserNotExist));
		let err = MessageHandler::post_message(&user(1), post(1, 9, 0, "x"), state.clone()).await.unwrap_err();
		assert!(matches!(err, ServiceError::UserNotExist));
		let err = MessageHandler::post_message(&user(1), post(1, 2, 77, "x"), state.clone()).await.unwrap_err();
		assert!(matches!(err, ServiceError::ThreadNotExist));

		assert_eq!(repo.thread_count().await, 0);
	}

	#[tokio::test]
	async fn test_post_as_someone_else_is_unauthorized() {
		let (repo, state) = set_up().await;

		let err = MessageHandler::post_message(&user(2), post(1, 2, 0, "x"), state).await.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Unauthorized);
		assert!(matches!(err, ServiceError::WrongSender));
		assert_eq!(repo.call_count(), 0);
	}

	#[tokio::test]
	async fn test_post_reports_constraint_violation_from_store() {
		let (repo, state) = set_up().await;
		let created = MessageHandler::post_message(&user(1), post(1, 2, 0, "hello"), state.clone()).await.unwrap();
		repo.fail_message_inserts(Some(ErrorKind::ConstraintViolation));

		let err = MessageHandler::post_message(&user(1), post(1, 2, created.thread_id, "again"), state.clone()).await.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
		let messages = MessageHandler::list_messages(&user(1), list(created.thread_id), state).await.unwrap();
		assert_eq!(messages.len(), 1);
	}

	#[tokio::test]
	async fn test_failed_message_insert_leaves_orphan_thread() {
		let (repo, state) = set_up().await;
		repo.fail_message_inserts(Some(ErrorKind::Infrastructure));

		let err = MessageHandler::post_message(&user(1), post(1, 2, 0, "hello"), state.clone()).await.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Infrastructure);
		assert_eq!(repo.thread_count().await, 1);
		let threads = MessageHandler::list_threads(&user(1), ListThreads { count: 10, offset: 0 }, state).await.unwrap();
		assert!(threads.is_empty());
	}

	#[tokio::test]
	async fn test_two_posts_listed_newest_first() {
		let (_repo, state) = set_up().await;
		let first = MessageHandler::post_message(&user(1), post(1, 1, 0, "hello"), state.clone()).await.unwrap();
		assert!(first.new_thread_created);
		let second = MessageHandler::post_message(&user(1), post(1, 1, first.thread_id, "second"), state.clone()).await.unwrap();
		assert!(!second.new_thread_created);

		let messages = MessageHandler::list_messages(&user(1), list(first.thread_id), state.clone()).await.unwrap();
		assert_eq!(messages.len(), 2);
		assert_eq!(messages[0].content, "second");
		assert_eq!(messages[1].content, "hello");

		// reversed, the page reads in posting order
		let chronological: Vec<_> = messages.iter().rev().map(|m| m.content.as_str()).collect();
		assert_eq!(chronological, vec!["hello", "second"]);
	}

	#[tokio::test]
	async fn test_end_to_end_scenario() {
		let (repo, state) = set_up().await;
		let a = user(1);

		let created = MessageHandler::post_message(&a, post(1, 1, 0, "hello"), state.clone()).await.unwrap();
		let thread_id = created.thread_id;
		MessageHandler::post_message(&a, post(1, 1, thread_id, "second"), state.clone()).await.unwrap();
		let messages = MessageHandler::list_messages(&a, list(thread_id), state.clone()).await.unwrap();
		let (second_id, first_id) = (messages[0].message_id, messages[1].message_id);

		// sender edits the second message
		let patch = PatchMessage {
			to_user_id: 1,
			from_user_id: 1,
			message_id: second_id,
			thread_id,
			content: "edited".to_string(),
		};
		MessageHandler::patch_message(&a, patch.clone(), state.clone()).await.unwrap();
		let messages = MessageHandler::list_messages(&a, list(thread_id), state.clone()).await.unwrap();
		assert_eq!(messages[0].content, "edited");

		// another user claiming to be the sender does not match the row
		let foreign = PatchMessage {
			from_user_id: 2,
			content: "hijacked".to_string(),
			..patch.clone()
		};
		let err = MessageHandler::patch_message(&user(2), foreign.clone(), state.clone()).await.unwrap_err();
		assert!(matches!(err, ServiceError::NoResult));
		// and the session must match the claimed sender
		let err = MessageHandler::patch_message(&a, foreign, state.clone()).await.unwrap_err();
		assert!(matches!(err, ServiceError::Unauthorized));
		assert_eq!(repo.message(second_id).await.unwrap().content, "edited");

		// recipient marks the first message read
		MessageHandler::mark_message_read(
			"1",
			MarkMessageRead {
				message_id: first_id,
				thread_id,
				readed: true,
			},
			state.clone(),
		)
		.await
		.unwrap();
		assert!(repo.message(first_id).await.unwrap().readed);
		assert!(!repo.message(second_id).await.unwrap().readed);
	}

	#[tokio::test]
	async fn test_patch_checks_run_before_any_write() {
		let (repo, state) = set_up().await;
		let created = MessageHandler::post_message(&user(1), post(1, 2, 0, "hello"), state.clone()).await.unwrap();
		let base = PatchMessage {
			to_user_id: 2,
			from_user_id: 1,
			message_id: 1,
			thread_id: created.thread_id,
			content: "changed".to_string(),
		};

		let cases = [
			(PatchMessage { to_user_id: 9, ..base.clone() }, "user"),
			(PatchMessage { message_id: 9, ..base.clone() }, "message"),
			(PatchMessage { thread_id: 9, ..base.clone() }, "thread"),
		];
		for (cmd, what) in cases {
			let err = MessageHandler::patch_message(&user(1), cmd, state.clone()).await.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::NotFound, "{what}");
		}
		assert_eq!(repo.message(1).await.unwrap().content, "hello");
	}

	#[tokio::test]
	async fn test_patch_check_order_recipient_first() {
		let (_repo, state) = set_up().await;
		// everything is missing: the recipient is reported before message and thread
		let cmd = PatchMessage {
			to_user_id: 9,
			from_user_id: 1,
			message_id: 9,
			thread_id: 9,
			content: "x".to_string(),
		};
		let err = MessageHandler::patch_message(&user(1), cmd, state).await.unwrap_err();
		assert!(matches!(err, ServiceError::UserNotExist));
	}

	#[tokio::test]
	async fn test_mark_read_only_targets_one_message() {
		let (repo, state) = set_up().await;
		let created = MessageHandler::post_message(&user(1), post(1, 2, 0, "one"), state.clone()).await.unwrap();
		for content in ["two", "three"] {
			MessageHandler::post_message(&user(1), post(1, 2, created.thread_id, content), state.clone()).await.unwrap();
		}

		let cmd = MarkMessageRead {
			message_id: 2,
			thread_id: created.thread_id,
			readed: true,
		};
		MessageHandler::mark_message_read("2", cmd, state.clone()).await.unwrap();

		assert!(!repo.message(1).await.unwrap().readed);
		assert!(repo.message(2).await.unwrap().readed);
		assert!(!repo.message(3).await.unwrap().readed);

		// sender is not the recipient, nothing matches
		let err = MessageHandler::mark_message_read("1", cmd, state.clone()).await.unwrap_err();
		assert!(matches!(err, ServiceError::NoResult));
	}

	#[tokio::test]
	async fn test_mark_read_caller_errors() {
		let (_repo, state) = set_up().await;
		let created = MessageHandler::post_message(&user(1), post(1, 2, 0, "one"), state.clone()).await.unwrap();
		let cmd = MarkMessageRead {
			message_id: 1,
			thread_id: created.thread_id,
			readed: true,
		};

		let err = MessageHandler::mark_message_read("not-a-number", cmd, state.clone()).await.unwrap_err();
		assert!(matches!(err, ServiceError::UnparsableUserId(_)));
		let err = MessageHandler::mark_message_read("9", cmd, state.clone()).await.unwrap_err();
		assert!(matches!(err, ServiceError::UserNotExist));

		// thread is checked before the caller id is even parsed
		let err = MessageHandler::mark_message_read(
			"not-a-number",
			MarkMessageRead { thread_id: 99, ..cmd },
			state.clone(),
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ServiceError::ThreadNotExist));
	}

	#[tokio::test]
	async fn test_delete_removes_exactly_one() {
		let (repo, state) = set_up().await;
		let created = MessageHandler::post_message(&user(1), post(1, 2, 0, "one"), state.clone()).await.unwrap();
		MessageHandler::post_message(&user(1), post(1, 2, created.thread_id, "two"), state.clone()).await.unwrap();
		let before = MessageHandler::list_messages(&user(1), list(created.thread_id), state.clone()).await.unwrap();

		let cmd = DeleteMessage {
			from_user_id: 1,
			message_id: 1,
			thread_id: created.thread_id,
		};
		MessageHandler::delete_message(&user(1), cmd, state.clone()).await.unwrap();

		let after = MessageHandler::list_messages(&user(1), list(created.thread_id), state.clone()).await.unwrap();
		assert_eq!(after.len(), before.len() - 1);
		assert!(after.iter().all(|m| m.message_id != 1));
		assert!(repo.message(1).await.is_none());

		// gone now, the existence check fails
		let err = MessageHandler::delete_message(&user(1), cmd, state).await.unwrap_err();
		assert!(matches!(err, ServiceError::MessageNotExist));
	}

	#[tokio::test]
	async fn test_delete_checks_thread_first_and_scopes_to_sender() {
		let (repo, state) = set_up().await;
		let created = MessageHandler::post_message(&user(1), post(1, 2, 0, "one"), state.clone()).await.unwrap();

		let err = MessageHandler::delete_message(
			&user(9),
			DeleteMessage {
				from_user_id: 9,
				message_id: 9,
				thread_id: 9,
			},
			state.clone(),
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ServiceError::ThreadNotExist));

		let err = MessageHandler::delete_message(
			&user(2),
			DeleteMessage {
				from_user_id: 2,
				message_id: 1,
				thread_id: created.thread_id,
			},
			state.clone(),
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ServiceError::NoResult));
		assert!(repo.message(1).await.is_some());

		let err = MessageHandler::delete_message(
			&user(1),
			DeleteMessage {
				from_user_id: 2,
				message_id: 1,
				thread_id: created.thread_id,
			},
			state,
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ServiceError::Unauthorized));
	}

	#[tokio::test]
	async fn test_invalid_pages_never_reach_storage() {
		let (repo, state) = set_up().await;

		for (count, offset) in [(0, 0), (10, -1)] {
			let err = MessageHandler::list_threads(&user(1), ListThreads { count, offset }, state.clone()).await.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::InvalidArgument);
			let err = MessageHandler::list_messages(
				&user(1),
				ListMessages {
					thread_id: 1,
					count,
					offset,
				},
				state.clone(),
			)
			.await
			.unwrap_err();
			assert_eq!(err.kind(), ErrorKind::InvalidArgument);
		}
		let err = MessageHandler::list_messages(&user(1), list(0), state.clone()).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidArgument);
		let err = MessageHandler::list_threads(
			&CurrentUser::new("abc", Role::Customer),
			ListThreads { count: 1, offset: 0 },
			state,
		)
		.await
		.unwrap_err();
		assert!(matches!(err, ServiceError::UnparsableUserId(_)));

		assert_eq!(repo.call_count(), 0);
	}

	#[tokio::test]
	async fn test_list_threads_visible_to_both_participants() {
		let (_repo, state) = set_up().await;
		let created = MessageHandler::post_message(&user(1), post(1, 2, 0, "hello"), state.clone()).await.unwrap();
		MessageHandler::post_message(&user(2), post(2, 1, created.thread_id, "hi back"), state.clone()).await.unwrap();

		for viewer in [1, 2] {
			let threads = MessageHandler::list_threads(&user(viewer), ListThreads { count: 10, offset: 0 }, state.clone()).await.unwrap();
			assert_eq!(threads.len(), 1);
			assert_eq!(threads[0].id, created.thread_id);
			assert_eq!(threads[0].title, "s");
			assert_eq!(threads[0].content, "hi back");
		}
		let threads = MessageHandler::list_threads(&user(3), ListThreads { count: 10, offset: 0 }, state).await.unwrap();
		assert!(threads.is_empty());
	}

	#[tokio::test]
	async fn test_list_messages_pages_through_thread() {
		let (_repo, state) = set_up().await;
		let total = rand::thread_rng().gen_range(3..12);
		let created = MessageHandler::post_message(&user(1), post(1, 2, 0, "m0"), state.clone()).await.unwrap();
		for i in 1..total {
			MessageHandler::post_message(&user(1), post(1, 2, created.thread_id, &format!("m{i}")), state.clone()).await.unwrap();
		}

		let mut seen = Vec::new();
		let mut offset = 0;
		loop {
			let page = MessageHandler::list_messages(
				&user(2),
				ListMessages {
					thread_id: created.thread_id,
					count: 2,
					offset,
				},
				state.clone(),
			)
			.await
			.unwrap();
			if page.is_empty() {
				break;
			}
			offset += page.len() as i64;
			seen.extend(page.into_iter().map(|m| m.content));
		}

		let expected: Vec<String> = (0..total).rev().map(|i| format!("m{i}")).collect();
		assert_eq!(seen, expected);

		// an outsider sees nothing of it
		let outsider = MessageHandler::list_messages(&user(3), list(created.thread_id), state).await.unwrap();
		assert!(outsider.is_empty());
	}

	#[tokio::test]
	async fn test_get_message_for_recipient_only() {
		let (_repo, state) = set_up().await;
		MessageHandler::post_message(&user(1), post(1, 2, 0, "hello"), state.clone()).await.unwrap();

		let message = MessageHandler::get_message(&user(2), 1, state.clone()).await.unwrap();
		assert_eq!(message.content, "hello");
		assert_eq!((message.from_first.as_str(), message.to_first.as_str()), ("Ann", "Bob"));

		let err = MessageHandler::get_message(&user(1), 1, state).await.unwrap_err();
		assert!(matches!(err, ServiceError::NoResult));
	}
}
