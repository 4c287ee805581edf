use std::{net::SocketAddr, str::FromStr};

use messaging::{
	bootstrap::{Bootstrap, BootstrapError},
	dependencies::config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), BootstrapError> {
	dotenv::dotenv().ok();
	let config = config()?;

	// ! Tracing
	let fallback = format!("messaging={level},web={level},tower_http=debug,axum::rejection=trace", level = config.log_level);
	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
		.with(tracing_subscriber::fmt::layer())
		.init();

	// ! Connection
	tracing::info!("Connections Are Being Pooled...");
	let state = Bootstrap::postgres(config).await?;

	let app = Bootstrap::app(state, config);

	let addr = SocketAddr::from_str(&config.server_ip_port).map_err(|_| BootstrapError::Address(config.server_ip_port.clone()))?;
	tracing::info!(%addr, "Start Web Server...");
	axum::Server::bind(&addr)
		.serve(app.into_make_service())
		.await
		.map_err(|err| BootstrapError::Server(Box::new(err)))
}
