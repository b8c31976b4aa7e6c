use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVICE_URL: &str = "wss://stream.watsonplatform.net/speech-to-text/api";
pub const DEFAULT_MODEL: &str = "en-US_BroadbandModel";
pub const DEFAULT_CONTENT_TYPE: &str = "audio/wav";
pub const DEFAULT_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_PACING_MS: u64 = 10;
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u32 = 600;
pub const DEFAULT_MAX_ALTERNATIVES: u32 = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
	#[error("threads must be at least 1")]
	NoThreads,

	#[error("chunk_size must be greater than 0")]
	EmptyChunk,

	#[error("pacing interval must be greater than 0")]
	ZeroPacing,

	#[error("{0} must not be empty")]
	Empty(&'static str),

	#[error("service url must use ws:// or wss://, got {0}")]
	Scheme(String),
}

/// How the websocket handshake is authorised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
	/// `Authorization: Basic ...` built from the stored credentials
	#[default]
	Basic,
	/// `X-Watson-Authorization-Token` fetched once before any session opens
	Token,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizeConfig {
	pub service_url: String,
	pub model: String,
	pub content_type: String,
	pub threads: usize,
	pub chunk_size: usize,
	pub pacing: Duration,
	pub inactivity_timeout_secs: u32,
	pub max_alternatives: u32,
	pub connect_timeout: Duration,
	pub close_timeout: Duration,
	pub output_dir: PathBuf,
	pub opt_out: bool,
	pub auth: AuthMode,
	pub credentials_file: PathBuf,
}

impl Default for RecognizeConfig {
	fn default() -> Self {
		Self {
			service_url: DEFAULT_SERVICE_URL.to_string(),
			model: DEFAULT_MODEL.to_string(),
			content_type: DEFAULT_CONTENT_TYPE.to_string(),
			threads: 1,
			chunk_size: DEFAULT_CHUNK_SIZE,
			pacing: Duration::from_millis(DEFAULT_PACING_MS),
			inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
			max_alternatives: DEFAULT_MAX_ALTERNATIVES,
			connect_timeout: Duration::from_secs(10),
			close_timeout: Duration::from_secs(10),
			output_dir: PathBuf::from("output"),
			opt_out: false,
			auth: AuthMode::Basic,
			credentials_file: PathBuf::from("auth.json"),
		}
	}
}

impl RecognizeConfig {
	/// Validate configuration values
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.threads == 0 {
			return Err(ConfigError::NoThreads);
		}

		if self.chunk_size == 0 {
			return Err(ConfigError::EmptyChunk);
		}

		if self.pacing.is_zero() {
			return Err(ConfigError::ZeroPacing);
		}

		if self.model.trim().is_empty() {
			return Err(ConfigError::Empty("model"));
		}

		if self.content_type.trim().is_empty() {
			return Err(ConfigError::Empty("content_type"));
		}

		if !(self.service_url.starts_with("wss://") || self.service_url.starts_with("ws://")) {
			return Err(ConfigError::Scheme(self.service_url.clone()));
		}

		Ok(())
	}

	/// Websocket endpoint every session connects to
	pub fn recognize_url(&self) -> String {
		format!("{}/v1/recognize?model={}", self.service_url.trim_end_matches('/'), self.model)
	}

	/// `https://<host>`, whatever scheme the service url carries
	pub fn http_origin(&self) -> String {
		let rest = self
			.service_url
			.strip_prefix("wss://")
			.or_else(|| self.service_url.strip_prefix("ws://"))
			.unwrap_or(&self.service_url);
		let host = rest.split('/').next().unwrap_or(rest);
		format!("https://{host}")
	}

	/// Token endpoint for the speech-to-text service on the same host
	pub fn token_url(&self) -> String {
		let origin = self.http_origin();
		format!("{origin}/authorization/api/v1/token?url={origin}/speech-to-text/api")
	}
}
