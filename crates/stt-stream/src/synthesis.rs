use crate::auth::Credentials;
use bytes::Bytes;
use reqwest::{header::ACCEPT, Client};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_TTS_URL: &str = "https://stream.watsonplatform.net/text-to-speech/api";
pub const DEFAULT_VOICE: &str = "en-US_MichaelVoice";
pub const DEFAULT_ACCEPT: &str = "audio/wav";

#[derive(Debug, Error)]
pub enum SynthesisError {
	#[error("Synthesis request failed: {0}")]
	Request(#[from] reqwest::Error),

	#[error("Synthesis endpoint returned {status}: {body}")]
	Status { status: u16, body: String },

	#[error("Synthesis returned no audio")]
	EmptyAudio,

	#[error("Failed to write audio to {path}: {source}")]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Blocking-call style text-to-speech client
pub struct TextToSpeech {
	client: Client,
	base_url: String,
	voice: String,
	accept: String,
	credentials: Credentials,
}

impl TextToSpeech {
	pub fn new(credentials: Credentials) -> Result<Self, SynthesisError> {
		let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
		Ok(Self {
			client,
			base_url: DEFAULT_TTS_URL.to_string(),
			voice: DEFAULT_VOICE.to_string(),
			accept: DEFAULT_ACCEPT.to_string(),
			credentials,
		})
	}

	#[must_use]
	pub fn with_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	#[must_use]
	pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
		self.voice = voice.into();
		self
	}

	pub fn synthesize_url(&self) -> String {
		format!("{}/v1/synthesize", self.base_url.trim_end_matches('/'))
	}

	pub async fn synthesize(&self, text: &str) -> Result<Bytes, SynthesisError> {
		let response = self
			.client
			.post(self.synthesize_url())
			.query(&[("voice", self.voice.as_str())])
			.basic_auth(&self.credentials.username, Some(&self.credentials.password))
			.header(ACCEPT, &self.accept)
			.json(&json!({ "text": text }))
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(SynthesisError::Status { status: status.as_u16(), body });
		}

		let audio = response.bytes().await?;
		if audio.is_empty() {
			return Err(SynthesisError::EmptyAudio);
		}
		Ok(audio)
	}

	/// Synthesize and write the audio to `path`
	pub async fn synthesize_to_file(&self, text: &str, path: &Path) -> Result<PathBuf, SynthesisError> {
		let audio = self.synthesize(text).await?;
		tokio::fs::write(path, &audio).await.map_err(|source| SynthesisError::Write {
			path: path.to_path_buf(),
			source,
		})?;

		info!(path = %path.display(), bytes = audio.len(), voice = %self.voice, "Synthesized audio written");
		Ok(path.to_path_buf())
	}
}
