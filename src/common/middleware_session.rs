use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::user::{CurrentUser, Role};
use crate::services::response::ServiceError;

/// Set by the upstream session layer once the caller is authenticated.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

pub async fn set_current_user<B>(mut request: Request<B>, next: Next<B>) -> Result<Response, ServiceError> {
    let headers = request.headers();

    let user_id = headers
        .get(USER_ID_HEADER)
        .ok_or(ServiceError::Unauthenticated)?
        .to_str()
        .map_err(|_error| ServiceError::Unauthenticated)?
        .trim()
        .to_owned();
    if user_id.is_empty() {
        return Err(ServiceError::Unauthenticated);
    }

    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i32>().ok())
        .map(Role::from)
        .unwrap_or_default();

    tracing::debug!(user_id = %user_id, role = ?role, "session user attached");
    let extensions = request.extensions_mut();
    extensions.insert(CurrentUser { user_id, role });

    Ok(next.run(request).await)
}
