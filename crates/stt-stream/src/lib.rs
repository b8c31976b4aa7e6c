// stt-stream
//
// Streams audio to a remote speech-recognition service over websockets and
// rebuilds final transcripts from interleaved interim and final results.
// A bounded pool of sessions drains a shared work queue; each session owns
// one connection and one item, and writes its outcome to a shared result
// table read once the queue is done.

pub mod audio;
pub mod auth;
pub mod config;
pub mod engine;
pub mod messages;
pub mod queue;
pub mod results;
pub mod synthesis;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub use audio::AudioSource;
pub use auth::{AuthError, AuthHeader, Credentials, ServiceKind};
pub use config::{AuthMode, ConfigError, RecognizeConfig};
pub use engine::{Dispatcher, PoolStats, SessionContext, SessionError};
pub use queue::{WorkItem, WorkQueue};
pub use results::{CloseStatus, ResultRecord, ResultTable};
pub use synthesis::{SynthesisError, TextToSpeech};

/// Errors for stt-stream crate
#[derive(Debug, Error)]
pub enum SttError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("Authentication error: {0}")]
	Auth(#[from] AuthError),

	#[error("Session setup error: {0}")]
	Session(#[from] SessionError),

	#[error("Failed to prepare output directory {path}: {source}")]
	OutputDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Synthesis error: {0}")]
	Synthesis(#[from] SynthesisError),
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
	pub results: BTreeMap<usize, ResultRecord>,
	pub stats: PoolStats,
}

impl RunReport {
	/// Transcript of one item, `None` unless it closed normally
	pub fn transcript(&self, index: usize) -> Option<&str> {
		self.results.get(&index).and_then(ResultRecord::transcript)
	}

	pub fn all_succeeded(&self) -> bool {
		self.results.values().all(ResultRecord::is_success)
	}
}

/// Owns the resolved configuration and the handshake shared by every session
pub struct Recognizer {
	config: RecognizeConfig,
	context: Arc<SessionContext>,
}

impl Recognizer {
	/// Validate, load credentials and settle on the auth header
	pub async fn new(config: RecognizeConfig) -> Result<Self, SttError> {
		config.validate()?;
		let auth = AuthHeader::resolve(&config).await?;
		Self::with_auth(config, &auth).await
	}

	/// Same as [`Recognizer::new`] with an already resolved header
	pub async fn with_auth(config: RecognizeConfig, auth: &AuthHeader) -> Result<Self, SttError> {
		config.validate()?;
		tokio::fs::create_dir_all(&config.output_dir).await.map_err(|source| SttError::OutputDir {
			path: config.output_dir.clone(),
			source,
		})?;

		let context = Arc::new(SessionContext::new(&config, auth)?);
		Ok(Self { config, context })
	}

	pub const fn config(&self) -> &RecognizeConfig {
		&self.config
	}

	/// Recognize every source, indexed in order, and wait for all of them
	pub async fn recognize_all<I, S>(&self, sources: I) -> RunReport
	where
		I: IntoIterator<Item = S>,
		S: Into<AudioSource>,
	{
		let queue = Arc::new(WorkQueue::from_sources(sources));
		let results = Arc::new(ResultTable::new());
		let dispatcher = Dispatcher::new(queue, results.clone(), self.context.clone(), self.config.threads);

		let stats = dispatcher.run().await;
		RunReport {
			results: results.snapshot(),
			stats,
		}
	}

	/// Transcript of a single source, or `None` when its connection did not
	/// close normally
	pub async fn recognize(&self, source: impl Into<AudioSource>) -> Option<String> {
		self.recognize_all([source.into()]).await.transcript(0).map(str::to_owned)
	}
}

/// One-shot recognition of a single source
pub async fn recognize(source: impl Into<AudioSource>, config: RecognizeConfig) -> Result<Option<String>, SttError> {
	let recognizer = Recognizer::new(config).await?;
	Ok(recognizer.recognize(source).await)
}
