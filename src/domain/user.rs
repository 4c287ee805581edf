use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::services::response::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
	#[default]
	Default,
	Staff,
	Supervisor,
	Admin,
	Customer,
}

impl From<i32> for Role {
	fn from(value: i32) -> Self {
		match value {
			1 => Role::Staff,
			2 => Role::Supervisor,
			3 => Role::Admin,
			4 => Role::Customer,
			_ => Role::Default,
		}
	}
}

/// Identity handed over by the session layer for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
	pub user_id: String,
	pub role: Role,
}

impl CurrentUser {
	pub fn new(
		user_id: impl Into<String>,
		role: Role,
	) -> Self {
		Self {
			user_id: user_id.into(),
			role,
		}
	}

	/// Session ids are decimal strings of an unsigned 32 bit integer.
	pub fn id(&self) -> Result<i64, ServiceError> {
		parse_user_id(&self.user_id)
	}

	/// The session user must be the one the request claims as sender.
	pub fn ensure_is(
		&self,
		claimed_user_id: i64,
	) -> Result<(), ServiceError> {
		if self.user_id.trim() == claimed_user_id.to_string() {
			return Ok(());
		}
		tracing::warn!(session_user = %self.user_id, claimed_user_id, "user ID from session and request are not equal");
		Err(ServiceError::Unauthorized)
	}
}

pub fn parse_user_id(raw: &str) -> Result<i64, ServiceError> {
	u32::from_str(raw.trim())
		.map(i64::from)
		.map_err(|err| ServiceError::UnparsableUserId(format!("{raw:?}: {err}")))
}
