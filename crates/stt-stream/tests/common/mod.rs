#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stt_stream::{AuthHeader, Credentials, RecognizeConfig};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::Message;

/// How the fake service answers once it has the whole utterance
#[derive(Debug, Clone)]
pub enum Reply {
	/// Send these text frames, then the second listening state
	Messages(Vec<String>),
	/// Drop the TCP connection without a close handshake
	Drop,
	/// Send these text frames, then close with the given code
	CloseWith(Vec<String>, u16),
}

pub fn final_result(text: &str) -> String {
	serde_json::json!({
		"result_index": 0,
		"results": [{"final": true, "alternatives": [{"transcript": text, "confidence": 0.93}]}]
	})
	.to_string()
}

pub fn interim_result(text: &str) -> String {
	serde_json::json!({
		"result_index": 0,
		"results": [{"final": false, "alternatives": [{"transcript": text}]}]
	})
	.to_string()
}

/// What the fake service saw on one connection
#[derive(Debug, Clone, Default)]
pub struct ConnectionLog {
	pub path: String,
	pub query: Option<String>,
	pub authorization: Option<String>,
	pub opt_out: Option<String>,
	pub start: Option<Value>,
	pub audio_frames: usize,
	pub audio_bytes: Vec<u8>,
	pub terminal_frames: usize,
	pub client_close_code: Option<u16>,
	pub frames_after_terminal: usize,
}

type Behaviour = Arc<dyn Fn(&[u8]) -> Reply + Send + Sync>;

pub struct MockService {
	pub addr: SocketAddr,
	logs: Arc<Mutex<Vec<ConnectionLog>>>,
	active: Arc<AtomicUsize>,
	peak: Arc<AtomicUsize>,
}

impl MockService {
	pub async fn start<F>(behaviour: F) -> Self
	where
		F: Fn(&[u8]) -> Reply + Send + Sync + 'static,
	{
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let behaviour: Behaviour = Arc::new(behaviour);
		let logs = Arc::new(Mutex::new(Vec::new()));
		let active = Arc::new(AtomicUsize::new(0));
		let peak = Arc::new(AtomicUsize::new(0));

		{
			let logs = logs.clone();
			let active = active.clone();
			let peak = peak.clone();
			tokio::spawn(async move {
				while let Ok((stream, _)) = listener.accept().await {
					let behaviour = behaviour.clone();
					let logs = logs.clone();
					let active = active.clone();
					let peak = peak.clone();
					tokio::spawn(async move {
						let now = active.fetch_add(1, Ordering::SeqCst) + 1;
						peak.fetch_max(now, Ordering::SeqCst);
						let log = serve(stream, behaviour).await;
						active.fetch_sub(1, Ordering::SeqCst);
						logs.lock().unwrap().push(log);
					});
				}
			});
		}

		Self { addr, logs, active, peak }
	}

	pub fn service_url(&self) -> String {
		format!("ws://{}/speech-to-text/api", self.addr)
	}

	pub fn logs(&self) -> Vec<ConnectionLog> {
		self.logs.lock().unwrap().clone()
	}

	pub fn peak_connections(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}

	/// Handlers record their log after the client has gone; give them a moment
	pub async fn wait_for_logs(&self, count: usize) -> Vec<ConnectionLog> {
		for _ in 0..100 {
			let logs = self.logs();
			if logs.len() >= count {
				return logs;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		self.logs()
	}
}

async fn serve(stream: TcpStream, behaviour: Behaviour) -> ConnectionLog {
	let mut log = ConnectionLog::default();

	let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
		log.path = req.uri().path().to_string();
		log.query = req.uri().query().map(str::to_owned);
		log.authorization = req.headers().get("Authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
		log.opt_out = req.headers().get("X-WDC-PL-OPT-OUT").and_then(|v| v.to_str().ok()).map(str::to_owned);
		Ok(resp)
	})
	.await;

	let Ok(mut ws) = ws else {
		return log;
	};

	// Start frame, then the first listening acknowledgment
	if let Some(Ok(Message::Text(text))) = ws.next().await {
		log.start = serde_json::from_str(text.as_str()).ok();
	}
	let _ = ws.send(Message::Text(r#"{"state": "listening"}"#.into())).await;

	while let Some(Ok(msg)) = ws.next().await {
		match msg {
			Message::Binary(bytes) if bytes.is_empty() => {
				log.terminal_frames += 1;
				break;
			}
			Message::Binary(bytes) => {
				log.audio_frames += 1;
				log.audio_bytes.extend_from_slice(&bytes);
			}
			Message::Close(_) => return log,
			_ => {}
		}
	}

	match behaviour(&log.audio_bytes) {
		Reply::Drop => return log,
		Reply::Messages(messages) => {
			for message in messages {
				let _ = ws.send(Message::Text(message.into())).await;
			}
			let _ = ws.send(Message::Text(r#"{"state": "listening"}"#.into())).await;
		}
		Reply::CloseWith(messages, code) => {
			for message in messages {
				let _ = ws.send(Message::Text(message.into())).await;
			}
			let _ = ws
				.send(Message::Close(Some(CloseFrame {
					code: CloseCode::from(code),
					reason: String::from("server closing").into(),
				})))
				.await;
		}
	}

	while let Some(Ok(msg)) = ws.next().await {
		match msg {
			Message::Close(frame) => {
				log.client_close_code = frame.map(|f| u16::from(f.code));
			}
			Message::Binary(_) | Message::Text(_) => log.frames_after_terminal += 1,
			_ => {}
		}
	}

	log
}

pub fn test_config(service: &MockService, output_dir: &Path) -> RecognizeConfig {
	RecognizeConfig {
		service_url: service.service_url(),
		output_dir: output_dir.to_path_buf(),
		pacing: Duration::from_millis(2),
		connect_timeout: Duration::from_secs(5),
		close_timeout: Duration::from_secs(2),
		..RecognizeConfig::default()
	}
}

pub fn test_auth() -> AuthHeader {
	AuthHeader::basic(&Credentials::new("user", "pass"))
}

/// Audio whose every byte is `tag`, so the fake service can tell items apart
pub fn tagged_audio(tag: u8, len: usize) -> Vec<u8> {
	vec![tag; len]
}
