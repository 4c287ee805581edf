#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} has an invalid value: {value}")]
	Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
	/// Which errors we want to log
	pub log_level: String,

	/// Port server is listening to
	pub server_ip_port: String,
	pub database_url: String,
	pub database_max_connections: u32,
	pub allow_origins: String,
}

impl Config {
	pub fn new() -> Result<Config, ConfigError> {
		dotenv::dotenv().ok();
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Builds the config from an arbitrary variable source so tests don't have to touch the process env.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
		let log_level = lookup("LOG_LEVEL").unwrap_or("warn".to_string());
		let server_ip_port = lookup("SERVER_IP_PORT").unwrap_or("0.0.0.0:80".into());
		let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
		let allow_origins = lookup("ALLOW_ORIGINS").unwrap_or("http://localhost:3000,http://localhost:3001".to_string());
		let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
			None => 30,
			Some(value) => value.parse::<u32>().ok().filter(|n| *n > 0).ok_or(ConfigError::Invalid {
				name: "DATABASE_MAX_CONNECTIONS",
				value,
			})?,
		};

		Ok(Config {
			log_level,
			server_ip_port,
			database_url,
			database_max_connections,
			allow_origins,
		})
	}

	pub fn allowed_origins(&self) -> Vec<String> {
		self.allow_origins
			.split(',')
			.map(str::trim)
			.filter(|origin| !origin.is_empty())
			.map(String::from)
			.collect()
	}
}
