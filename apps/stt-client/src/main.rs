mod config;
mod observability;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};
use stt_stream::{AudioSource, Credentials, Recognizer, RunReport, ServiceKind, TextToSpeech};
use tokio::signal;
use tracing::{info, warn};

use config::{Cli, Command, ServiceArgs};

#[tokio::main]
async fn main() -> Result<()> {
	dotenvy::dotenv().ok();

	let cli = Cli::parse();
	observability::init_tracing(cli.log_json);

	tokio::select! {
		result = run(cli) => result,
		() = wait_for_shutdown_signal() => {
			warn!("Interrupted, abandoning open sessions");
			std::process::exit(130);
		}
	}
}

async fn run(cli: Cli) -> Result<()> {
	match cli.command {
		Command::Recognize { files } => recognize_files(&cli.service, files).await,
		Command::Synthesize { text, out } => {
			let path = synthesizer(&cli.service)?.synthesize_to_file(&text, &out).await?;
			println!("{}", path.display());
			Ok(())
		}
		Command::Roundtrip { file } => roundtrip(&cli.service, &file).await,
	}
}

async fn recognize_files(args: &ServiceArgs, files: Vec<PathBuf>) -> Result<()> {
	let recognizer = Recognizer::new(args.recognize_config()).await.context("failed to set up recognizer")?;
	info!(files = files.len(), threads = args.threads, "Recognizing");

	let report = recognizer.recognize_all(files.iter().cloned().map(AudioSource::from)).await;
	print_report(&files, &report);

	let failed = report.results.values().filter(|record| !record.is_success()).count();
	if failed > 0 {
		bail!("{failed} of {} items did not close normally", files.len());
	}
	Ok(())
}

fn print_report(files: &[PathBuf], report: &RunReport) {
	for (index, record) in &report.results {
		let file = files.get(*index).map_or_else(String::new, |f| f.display().to_string());
		match (record.transcript(), &record.status) {
			(Some(text), _) => println!("{index}\t{file}\t{text}"),
			(None, Some(status)) => {
				let code = status.code.map_or_else(|| "none".to_string(), |c| c.to_string());
				println!("{index}\t{file}\tFAILED code={code} reason={}", status.reason);
			}
			(None, None) => println!("{index}\t{file}\tFAILED unfinished"),
		}
	}
}

async fn roundtrip(args: &ServiceArgs, file: &Path) -> Result<()> {
	let config = args.recognize_config();
	let output_dir = config.output_dir.clone();
	let recognizer = Recognizer::new(config).await.context("failed to set up recognizer")?;

	let text = recognizer.recognize(file.to_path_buf()).await.filter(|text| !text.trim().is_empty());

	let audio_file = match &text {
		Some(text) => {
			let name = file.file_name().with_context(|| format!("{} has no file name", file.display()))?;
			let out = output_dir.join(name);
			Some(synthesizer(args)?.synthesize_to_file(text, &out).await?)
		}
		None => {
			warn!(file = %file.display(), "No transcript, skipping synthesis");
			None
		}
	};

	println!("{}", json!({ "text": text, "audio_file": audio_file }));
	Ok(())
}

fn synthesizer(args: &ServiceArgs) -> Result<TextToSpeech> {
	let credentials = Credentials::load(&args.credentials, ServiceKind::TextToSpeech)?;
	Ok(TextToSpeech::new(credentials)?.with_url(args.tts_url.clone()).with_voice(args.voice.clone()))
}

async fn wait_for_shutdown_signal() {
	let ctrl_c = async {
		if signal::ctrl_c().await.is_err() {
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(_) => std::future::pending::<()>().await,
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
}
