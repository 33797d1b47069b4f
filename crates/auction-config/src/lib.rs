//! Configuration loading for the auction coordinator.
//!
//! Configuration is read from a TOML, JSON or YAML file (picked by
//! extension), `${VAR}` references are substituted from the environment,
//! prefixed environment variables override individual settings, and the
//! result is validated before anything uses it.

use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "AUCTION_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	/// Loads, overrides and validates. Without a file the defaults are used
	/// as the base.
	pub async fn load(&self) -> Result<AuctionConfig, ConfigError> {
		let mut config = match &self.file_path {
			Some(path) => self.load_from_file(path).await?,
			None => {
				debug!("No configuration file given, starting from defaults");
				AuctionConfig::default()
			}
		};

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, path: &Path) -> Result<AuctionConfig, ConfigError> {
		info!("Loading configuration from {:?}", path);

		let content = match tokio::fs::read_to_string(path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(path.display().to_string()));
			}
			Err(e) => return Err(e.into()),
		};

		let substituted = substitute_env_vars(&content)?;

		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => parse_toml(&substituted),
			Some("json") => serde_json::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {}", e))),
			Some("yaml") | Some("yml") => serde_yaml::from_str(&substituted)
				.map_err(|e| ConfigError::ParseError(format!("Failed to parse YAML: {}", e))),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {:?}",
				path
			))),
		}
	}

	fn apply_env_overrides(&self, config: &mut AuctionConfig) -> Result<(), ConfigError> {
		let var = |name: &str| env::var(format!("{}{}", self.env_prefix, name)).ok();

		if let Some(base_url) = var("BASE_URL") {
			debug!("Overriding backend base URL from environment");
			config.backend.base_url = base_url;
		}

		if let Some(token) = var("API_TOKEN") {
			debug!("Overriding API token from environment");
			config.backend.token = Some(token);
		}

		if let Some(timeout) = var("REQUEST_TIMEOUT_SECS") {
			config.backend.request_timeout_secs = timeout.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid request timeout: {}", e))
			})?;
		}

		if let Some(interval) = var("POLL_INTERVAL_SECS") {
			config.polling.interval_secs = interval.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid poll interval: {}", e))
			})?;
		}

		if let Some(policy) = var("POLL_POLICY") {
			config.polling.policy = policy.parse().map_err(ConfigError::ValidationError)?;
		}

		Ok(())
	}
}

/// Parses a TOML document into a configuration without validating it.
pub fn parse_toml(content: &str) -> Result<AuctionConfig, ConfigError> {
	toml::from_str(content)
		.map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))
}

/// Replaces every `${VAR_NAME}` with the value of that environment variable.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

pub fn validate_config(config: &AuctionConfig) -> Result<(), ConfigError> {
	let base_url = config.backend.base_url.trim();
	if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
		return Err(ConfigError::ValidationError(format!(
			"backend.base_url must be an http(s) URL, got '{}'",
			config.backend.base_url
		)));
	}

	if !config.backend.api_prefix.is_empty() && !config.backend.api_prefix.starts_with('/') {
		return Err(ConfigError::ValidationError(
			"backend.api_prefix must start with '/'".to_string(),
		));
	}

	if config.backend.request_timeout_secs == 0 || config.backend.request_timeout_secs > 120 {
		return Err(ConfigError::ValidationError(
			"backend.request_timeout_secs must be between 1 and 120".to_string(),
		));
	}

	if config.polling.interval_secs == 0 {
		return Err(ConfigError::ValidationError(
			"polling.interval_secs must be greater than zero".to_string(),
		));
	}

	if config.polling.jitter_ms >= config.polling.interval_secs.saturating_mul(1000) {
		return Err(ConfigError::ValidationError(
			"polling.jitter_ms must be shorter than the poll interval".to_string(),
		));
	}

	if config.listing.page == 0 || config.listing.limit == 0 {
		return Err(ConfigError::ValidationError(
			"listing.page and listing.limit must be at least 1".to_string(),
		));
	}

	if config.events.capacity == 0 {
		return Err(ConfigError::ValidationError(
			"events.capacity must be greater than zero".to_string(),
		));
	}

	Ok(())
}
