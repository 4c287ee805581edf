//! Guard clauses run before every write. Absence becomes a typed "not exist" error here;
//! the stores themselves only ever answer `true`/`false`.

use crate::{
	adapters::repositories::{MessageRepository, ThreadRepository, UserRepository},
	services::response::ServiceError,
};

pub async fn check_user_exist<R: UserRepository + ?Sized>(
	repo: &R,
	user_id: i64,
	side: &'static str,
) -> Result<(), ServiceError> {
	let exists = repo.user_exists(user_id).await.map_err(|err| {
		tracing::error!(user_id, side, "error while check is user exist: {}", err);
		err
	})?;
	if !exists {
		tracing::info!(user_id, side, "user not exist");
		return Err(ServiceError::UserNotExist);
	}
	Ok(())
}

pub async fn check_thread_exist<R: ThreadRepository + ?Sized>(
	repo: &R,
	thread_id: i64,
) -> Result<(), ServiceError> {
	let exists = repo.thread_exists(thread_id).await.map_err(|err| {
		tracing::error!(thread_id, "error while check is thread exist: {}", err);
		err
	})?;
	if !exists {
		tracing::info!(thread_id, "thread not exist");
		return Err(ServiceError::ThreadNotExist);
	}
	Ok(())
}

pub async fn check_message_exist<R: MessageRepository + ?Sized>(
	repo: &R,
	message_id: i64,
) -> Result<(), ServiceError> {
	let exists = repo.message_exists(message_id).await.map_err(|err| {
		tracing::error!(message_id, "error while check is message exist: {}", err);
		err
	})?;
	if !exists {
		tracing::info!(message_id, "message not exist");
		return Err(ServiceError::MessageNotExist);
	}
	Ok(())
}

pub fn check_page(
	count: i64,
	offset: i64,
) -> Result<(), ServiceError> {
	if count < 1 {
		return Err(ServiceError::InvalidArgument("count less than 1".into()));
	}
	if offset < 0 {
		return Err(ServiceError::InvalidArgument("offset less than 0".into()));
	}
	Ok(())
}
