use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use stt_stream::config::{DEFAULT_CHUNK_SIZE, DEFAULT_CONTENT_TYPE, DEFAULT_INACTIVITY_TIMEOUT_SECS, DEFAULT_MAX_ALTERNATIVES, DEFAULT_MODEL, DEFAULT_PACING_MS, DEFAULT_SERVICE_URL};
use stt_stream::synthesis::{DEFAULT_TTS_URL, DEFAULT_VOICE};
use stt_stream::{AuthMode, RecognizeConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "stt-client")]
#[command(about = "Stream audio files to a speech-to-text service and collect transcripts", long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,

	#[command(flatten)]
	pub service: ServiceArgs,

	/// Emit logs as JSON lines
	#[arg(long, env = "STT_LOG_JSON", global = true)]
	pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
	/// Transcribe every file, printing one line per file
	Recognize {
		#[arg(required = true)]
		files: Vec<PathBuf>,
	},

	/// Turn text into a wav file
	Synthesize {
		#[arg(long)]
		text: String,

		#[arg(long)]
		out: PathBuf,
	},

	/// Transcribe a file, then speak the transcript back into the output directory
	Roundtrip { file: PathBuf },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthArg {
	Basic,
	Token,
}

impl From<AuthArg> for AuthMode {
	fn from(arg: AuthArg) -> Self {
		match arg {
			AuthArg::Basic => Self::Basic,
			AuthArg::Token => Self::Token,
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
	/// Speech-to-text base url (ws:// or wss://)
	#[arg(long, env = "STT_SERVICE_URL", default_value = DEFAULT_SERVICE_URL, global = true)]
	pub service_url: String,

	/// Recognition model
	#[arg(long, env = "STT_MODEL", default_value = DEFAULT_MODEL, global = true)]
	pub model: String,

	/// Content type announced in the start frame
	#[arg(long, env = "STT_CONTENT_TYPE", default_value = DEFAULT_CONTENT_TYPE, global = true)]
	pub content_type: String,

	/// Concurrent connections
	#[arg(long, short = 't', env = "STT_THREADS", default_value_t = 1, global = true)]
	pub threads: usize,

	/// Bytes per audio frame
	#[arg(long, env = "STT_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE, global = true)]
	pub chunk_size: usize,

	/// Milliseconds between audio frames
	#[arg(long, env = "STT_PACING_MS", default_value_t = DEFAULT_PACING_MS, global = true)]
	pub pacing_ms: u64,

	#[arg(long, env = "STT_INACTIVITY_TIMEOUT", default_value_t = DEFAULT_INACTIVITY_TIMEOUT_SECS, global = true)]
	pub inactivity_timeout: u32,

	#[arg(long, env = "STT_MAX_ALTERNATIVES", default_value_t = DEFAULT_MAX_ALTERNATIVES, global = true)]
	pub max_alternatives: u32,

	/// Seconds allowed for the opening and closing handshakes
	#[arg(long, env = "STT_HANDSHAKE_TIMEOUT", default_value_t = 10, global = true)]
	pub handshake_timeout_secs: u64,

	/// Where per-item result logs and synthesized audio go
	#[arg(long, short = 'o', env = "STT_OUTPUT_DIR", default_value = "output", global = true)]
	pub output_dir: PathBuf,

	/// Ask the service not to keep the audio for training
	#[arg(long, env = "STT_OPT_OUT", global = true)]
	pub opt_out: bool,

	#[arg(long, env = "STT_AUTH", value_enum, default_value_t = AuthArg::Basic, global = true)]
	pub auth: AuthArg,

	/// JSON file with `stt` and `tts` username/password sections
	#[arg(long, short = 'c', env = "STT_CREDENTIALS", default_value = "auth.json", global = true)]
	pub credentials: PathBuf,

	/// Text-to-speech base url
	#[arg(long, env = "TTS_URL", default_value = DEFAULT_TTS_URL, global = true)]
	pub tts_url: String,

	#[arg(long, env = "TTS_VOICE", default_value = DEFAULT_VOICE, global = true)]
	pub voice: String,
}

impl ServiceArgs {
	pub fn recognize_config(&self) -> RecognizeConfig {
		let handshake = Duration::from_secs(self.handshake_timeout_secs);
		RecognizeConfig {
			service_url: self.service_url.clone(),
			model: self.model.clone(),
			content_type: self.content_type.clone(),
			threads: self.threads,
			chunk_size: self.chunk_size,
			pacing: Duration::from_millis(self.pacing_ms),
			inactivity_timeout_secs: self.inactivity_timeout,
			max_alternatives: self.max_alternatives,
			connect_timeout: handshake,
			close_timeout: handshake,
			output_dir: self.output_dir.clone(),
			opt_out: self.opt_out,
			auth: self.auth.into(),
			credentials_file: self.credentials.clone(),
		}
	}
}
