mod credentials;
mod error;
mod token;

pub use credentials::{Credentials, ServiceKind};
pub use error::AuthError;
pub use token::TokenProvider;

use crate::config::{AuthMode, RecognizeConfig};
use base64::engine::Engine;

pub const AUTHORIZATION: &str = "Authorization";
pub const TOKEN_HEADER: &str = "X-Watson-Authorization-Token";
pub const OPT_OUT_HEADER: &str = "X-WDC-PL-OPT-OUT";

/// Handshake authorisation, decided once and shared by every session
#[derive(Clone, PartialEq, Eq)]
pub enum AuthHeader {
	Basic(String),
	Token(String),
}

impl std::fmt::Debug for AuthHeader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Basic(_) => f.write_str("AuthHeader::Basic(***)"),
			Self::Token(_) => f.write_str("AuthHeader::Token(***)"),
		}
	}
}

impl AuthHeader {
	pub fn basic(credentials: &Credentials) -> Self {
		let pair = format!("{}:{}", credentials.username, credentials.password);
		Self::Basic(format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(pair)))
	}

	/// Header name and value to attach to the websocket handshake
	pub fn header(&self) -> (&'static str, &str) {
		match self {
			Self::Basic(value) => (AUTHORIZATION, value),
			Self::Token(token) => (TOKEN_HEADER, token),
		}
	}

	/// Load credentials and pick the header the config asks for.
	/// Token mode performs the HTTP exchange here, before any connection opens.
	pub async fn resolve(config: &RecognizeConfig) -> Result<Self, AuthError> {
		let credentials = Credentials::load(&config.credentials_file, ServiceKind::SpeechToText)?;

		match config.auth {
			AuthMode::Basic => Ok(Self::basic(&credentials)),
			AuthMode::Token => {
				let provider = TokenProvider::new(config.token_url())?;
				Ok(Self::Token(provider.fetch_token(&credentials).await?))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn basic_header_is_base64_pair() {
		let header = AuthHeader::basic(&Credentials::new("user", "pass"));
		assert_eq!(header.header(), (AUTHORIZATION, "Basic dXNlcjpwYXNz"));
	}

	#[test]
	fn token_header_uses_watson_name() {
		let header = AuthHeader::Token("abc".to_string());
		assert_eq!(header.header(), (TOKEN_HEADER, "abc"));
	}

	#[tokio::test]
	async fn resolve_fails_before_network_on_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let config = RecognizeConfig {
			credentials_file: dir.path().join("missing.json"),
			auth: AuthMode::Token,
			..RecognizeConfig::default()
		};

		let err = AuthHeader::resolve(&config).await.unwrap_err();
		assert!(matches!(err, AuthError::Read { .. }));
	}
}
