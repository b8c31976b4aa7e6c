use super::{AuthError, Credentials};
use reqwest::{header::ACCEPT, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
	token: Option<String>,
}

/// Exchanges stored credentials for a short-lived bearer token
pub struct TokenProvider {
	client: Client,
	token_url: String,
}

impl TokenProvider {
	pub fn new(token_url: impl Into<String>) -> Result<Self, AuthError> {
		let client = Client::builder().timeout(TOKEN_TIMEOUT).build()?;
		Ok(Self {
			client,
			token_url: token_url.into(),
		})
	}

	pub async fn fetch_token(&self, credentials: &Credentials) -> Result<String, AuthError> {
		debug!(url = %self.token_url, "Requesting authorization token");

		let response = self
			.client
			.get(&self.token_url)
			.basic_auth(&credentials.username, Some(&credentials.password))
			.header(ACCEPT, "application/json")
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(AuthError::TokenStatus { status: status.as_u16(), body });
		}

		let token = response.json::<TokenResponse>().await?.token.filter(|t| !t.is_empty()).ok_or(AuthError::MissingToken)?;

		info!("Authorization token acquired");
		Ok(token)
	}
}
