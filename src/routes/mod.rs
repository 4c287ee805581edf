use axum::{
	extract::{
		rejection::{JsonRejection, PathRejection},
		Path, State,
	},
	middleware,
	routing::{get, patch, post},
	Extension, Json, Router,
};

use crate::{
	common::middleware_session::set_current_user,
	domain::{
		message::commands::{DeleteMessage, ListMessages, MarkMessageRead, MessageResp, PatchMessage, PostMessage, PostMessageResp},
		thread::schemas::{ListThreads, ThreadResp},
		user::CurrentUser,
	},
	services::{
		handlers::MessageHandler,
		response::{Ack, ServiceError},
		MessagingState,
	},
};

async fn post_message_route(
	State(state): State<MessagingState>,
	Extension(current_user): Extension<CurrentUser>,
	payload: Result<Json<PostMessage>, JsonRejection>,
) -> Result<Json<PostMessageResp>, ServiceError> {
	let Json(cmd) = payload?;
	MessageHandler::post_message(&current_user, cmd, state).await.map(Json)
}

async fn list_threads_route(
	State(state): State<MessagingState>,
	Extension(current_user): Extension<CurrentUser>,
	payload: Result<Json<ListThreads>, JsonRejection>,
) -> Result<Json<Vec<ThreadResp>>, ServiceError> {
	let Json(req) = payload?;
	MessageHandler::list_threads(&current_user, req, state).await.map(Json)
}

async fn list_messages_route(
	State(state): State<MessagingState>,
	Extension(current_user): Extension<CurrentUser>,
	payload: Result<Json<ListMessages>, JsonRejection>,
) -> Result<Json<Vec<MessageResp>>, ServiceError> {
	let Json(req) = payload?;
	MessageHandler::list_messages(&current_user, req, state).await.map(Json)
}

async fn get_message_route(
	State(state): State<MessagingState>,
	Extension(current_user): Extension<CurrentUser>,
	path: Result<Path<u32>, PathRejection>,
) -> Result<Json<MessageResp>, ServiceError> {
	let Path(message_id) = path?;
	MessageHandler::get_message(&current_user, i64::from(message_id), state).await.map(Json)
}

async fn mark_message_read_route(
	State(state): State<MessagingState>,
	Extension(current_user): Extension<CurrentUser>,
	payload: Result<Json<MarkMessageRead>, JsonRejection>,
) -> Result<Ack, ServiceError> {
	let Json(cmd) = payload?;
	MessageHandler::mark_message_read(&current_user.user_id, cmd, state).await?;
	Ok(Ack)
}

async fn patch_message_route(
	State(state): State<MessagingState>,
	Extension(current_user): Extension<CurrentUser>,
	payload: Result<Json<PatchMessage>, JsonRejection>,
) -> Result<Ack, ServiceError> {
	let Json(cmd) = payload?;
	MessageHandler::patch_message(&current_user, cmd, state).await?;
	Ok(Ack)
}

async fn delete_message_route(
	State(state): State<MessagingState>,
	Extension(current_user): Extension<CurrentUser>,
	payload: Result<Json<DeleteMessage>, JsonRejection>,
) -> Result<Ack, ServiceError> {
	let Json(cmd) = payload?;
	MessageHandler::delete_message(&current_user, cmd, state).await?;
	Ok(Ack)
}

/// Every route requires the session user, attached by [`set_current_user`].
pub fn create_routes() -> Router<MessagingState> {
	Router::new()
		.route("/api/user/message", post(post_message_route).patch(mark_message_read_route))
		.route("/api/user/message/threads", post(list_threads_route))
		.route("/api/user/message/list", post(list_messages_route))
		.route("/api/user/messages/:message_id", get(get_message_route))
		.route("/api/admin/message", patch(patch_message_route).delete(delete_message_route))
		.route_layer(middleware::from_fn(set_current_user))
}
