use super::AuthError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Which service section of the credentials file to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
	SpeechToText,
	TextToSpeech,
}

impl ServiceKind {
	pub const fn key(self) -> &'static str {
		match self {
			Self::SpeechToText => "stt",
			Self::TextToSpeech => "tts",
		}
	}
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Credentials {
	pub username: String,
	pub password: String,
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials").field("username", &self.username).field("password", &"***").finish()
	}
}

impl Credentials {
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			password: password.into(),
		}
	}

	/// Load one service's credentials from a file shaped
	/// `{"stt": {"username": .., "password": ..}, "tts": {..}}`
	pub fn load(path: &Path, service: ServiceKind) -> Result<Self, AuthError> {
		let raw = std::fs::read_to_string(path).map_err(|source| AuthError::Read {
			path: path.to_path_buf(),
			source,
		})?;

		Self::parse(&raw, service, path)
	}

	pub fn from_json(raw: &str, service: ServiceKind) -> Result<Self, AuthError> {
		Self::parse(raw, service, Path::new("<inline>"))
	}

	fn parse(raw: &str, service: ServiceKind, path: &Path) -> Result<Self, AuthError> {
		let parse_error = |source| AuthError::Parse {
			path: path.to_path_buf(),
			source,
		};

		let mut sections: HashMap<String, serde_json::Value> = serde_json::from_str(raw).map_err(parse_error)?;
		let section = sections.remove(service.key()).ok_or_else(|| AuthError::MissingService {
			path: path.to_path_buf(),
			service: service.key(),
		})?;

		serde_json::from_value(section).map_err(parse_error)
	}
}
