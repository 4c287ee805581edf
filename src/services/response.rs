use axum::{
	extract::rejection::{JsonRejection, PathRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;

/// Coarse classification of a [`ServiceError`]. Callers branch on this, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	NotFound,
	ConstraintViolation,
	InvalidArgument,
	Unauthorized,
	Infrastructure,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("user does not exist")]
	UserNotExist,
	#[error("thread does not exist")]
	ThreadNotExist,
	#[error("message does not exist")]
	MessageNotExist,
	/// A compound-filter write or scoped lookup matched nothing.
	#[error("result not found")]
	NoResult,
	#[error("constraint fails: {0}")]
	ConstraintViolation(String),
	#[error("bad request: {0}")]
	InvalidArgument(String),
	#[error("can't parse user ID: {0}")]
	UnparsableUserId(String),
	#[error("wrong user ID")]
	Unauthorized,
	/// Sender of a new message is not the session user. Same kind as `Unauthorized`, answered as a bad request.
	#[error("wrong user ID")]
	WrongSender,
	#[error("missing session")]
	Unauthenticated,
	#[error("database error: {0}")]
	DatabaseError(#[source] Box<sqlx::Error>),
	#[error("storage error: {0}")]
	StorageError(String),
}

impl ServiceError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::UserNotExist | Self::ThreadNotExist | Self::MessageNotExist | Self::NoResult => ErrorKind::NotFound,
			Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
			Self::InvalidArgument(_) | Self::UnparsableUserId(_) => ErrorKind::InvalidArgument,
			Self::Unauthorized | Self::WrongSender | Self::Unauthenticated => ErrorKind::Unauthorized,
			Self::DatabaseError(_) | Self::StorageError(_) => ErrorKind::Infrastructure,
		}
	}

	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::Unauthenticated => StatusCode::UNAUTHORIZED,
			Self::Unauthorized => StatusCode::CONFLICT,
			Self::WrongSender => StatusCode::BAD_REQUEST,
			_ => match self.kind() {
				ErrorKind::NotFound | ErrorKind::ConstraintViolation => StatusCode::NOT_FOUND,
				ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
				ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
				ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
			},
		}
	}
}

impl From<sqlx::Error> for ServiceError {
	fn from(err: sqlx::Error) -> Self {
		match err {
			sqlx::Error::RowNotFound => ServiceError::NoResult,
			sqlx::Error::Database(ref db_err) if is_constraint_code(db_err.code().as_deref()) => {
				ServiceError::ConstraintViolation(db_err.message().to_string())
			}
			err => ServiceError::DatabaseError(Box::new(err)),
		}
	}
}

impl From<JsonRejection> for ServiceError {
	fn from(rejection: JsonRejection) -> Self {
		ServiceError::InvalidArgument(format!("can't parse request: {}", rejection.body_text()))
	}
}

impl From<PathRejection> for ServiceError {
	fn from(rejection: PathRejection) -> Self {
		ServiceError::InvalidArgument(rejection.body_text())
	}
}

// 23503 foreign_key_violation, 23505 unique_violation
fn is_constraint_code(code: Option<&str>) -> bool {
	matches!(code, Some("23503") | Some("23505"))
}

/// Body shared by acknowledgements and errors.
#[derive(Debug, Serialize)]
pub struct StatusBody {
	#[serde(rename = "statusCode")]
	pub status_code: u16,
	pub message: String,
	pub error: String,
}

impl StatusBody {
	pub fn new(
		status: StatusCode,
		error: impl Into<String>,
	) -> Self {
		Self {
			status_code: status.as_u16(),
			message: status.canonical_reason().unwrap_or_default().to_string(),
			error: error.into(),
		}
	}
}

/// Empty success answer for mutations that return nothing.
pub struct Ack;

impl IntoResponse for Ack {
	fn into_response(self) -> Response {
		(StatusCode::OK, Json(StatusBody::new(StatusCode::OK, ""))).into_response()
	}
}

impl IntoResponse for ServiceError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		let detail = match self.kind() {
			ErrorKind::Infrastructure => {
				tracing::error!(error = %self, "request failed on infrastructure error");
				"internal server error".to_string()
			}
			_ => self.to_string(),
		};
		(status, Json(StatusBody::new(status, detail))).into_response()
	}
}
