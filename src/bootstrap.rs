use std::sync::Arc;

use axum::{
	http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
	Router,
};
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	trace::TraceLayer,
};

use crate::{
	adapters::repositories::PgRepository,
	common::middleware_session::{USER_ID_HEADER, USER_ROLE_HEADER},
	config::{Config, ConfigError},
	database,
	dependencies::connection_pool,
	routes::create_routes,
	services::{response::ServiceError, MessagingState},
};

pub const SERVICE_NAME: &str = "/krust-messaging";

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Service(#[from] ServiceError),
	#[error("migration failed: {0}")]
	Migration(#[from] sqlx::migrate::MigrateError),
	#[error("invalid listen address {0}")]
	Address(String),
	#[error("server error: {0}")]
	Server(Box<dyn std::error::Error + Send + Sync>),
}

pub struct Bootstrap;
impl Bootstrap {
	/// Connects the pool, brings the schema up to date and wraps the pool in the store.
	pub async fn postgres(config: &Config) -> Result<MessagingState, BootstrapError> {
		let pool = connection_pool(config).await?;
		database::migrate(pool).await?;
		Ok(MessagingState::from(Arc::new(PgRepository::new(pool.clone()))))
	}

	pub fn app(
		state: MessagingState,
		config: &Config,
	) -> Router {
		let origins: Vec<HeaderValue> = config
			.allowed_origins()
			.iter()
			.filter_map(|origin| match HeaderValue::from_str(origin) {
				Ok(value) => Some(value),
				Err(_) => {
					tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
					None
				}
			})
			.collect();

		let routers = create_routes().with_state(state);

		Router::new()
			.nest(SERVICE_NAME, routers)
			.layer(
				CorsLayer::new()
					.allow_origin(AllowOrigin::list(origins))
					.allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
					.allow_headers([
						CONTENT_TYPE,
						HeaderName::from_static(USER_ID_HEADER),
						HeaderName::from_static(USER_ROLE_HEADER),
					]),
			)
			.layer(TraceLayer::new_for_http())
	}
}
