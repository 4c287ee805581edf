use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::postgres::PgPool;

use crate::config::Config;
use crate::services::response::ServiceError;

pub async fn connect(config: &Config) -> Result<PgPool, ServiceError> {
	PgPoolOptions::new()
		.max_connections(config.database_max_connections)
		.connect(&config.database_url)
		.await
		.map_err(|err| {
			tracing::error!("Error occurred while connecting to database : {:?}", err);
			ServiceError::from(err)
		})
}

/// Applies the schema under `migrations/`.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
	sqlx::migrate!("./migrations").run(pool).await
}
