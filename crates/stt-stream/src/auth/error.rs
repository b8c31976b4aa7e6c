use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading credentials or exchanging them for a token
#[derive(Debug, Error)]
pub enum AuthError {
	#[error("Failed to read credentials file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Malformed credentials file {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("Credentials file {path} has no '{service}' section")]
	MissingService { path: PathBuf, service: &'static str },

	#[error("Token request failed: {0}")]
	TokenRequest(#[from] reqwest::Error),

	#[error("Token endpoint returned {status}: {body}")]
	TokenStatus { status: u16, body: String },

	#[error("Token response carried no token")]
	MissingToken,
}
