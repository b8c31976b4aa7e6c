use super::SessionError;
use crate::audio::{AudioChunker, Frame};
use crate::auth::{AuthHeader, OPT_OUT_HEADER};
use crate::config::RecognizeConfig;
use crate::messages::{pretty_json, ServiceMessage, StartMessage};
use crate::queue::WorkItem;
use crate::results::{CloseStatus, ResultTable};
use bytes::Bytes;
use futures_util::{
	sink::SinkExt,
	stream::{SplitSink, SplitStream, StreamExt},
};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{
	client::IntoClientRequest,
	handshake::client::Request,
	http::{HeaderName, HeaderValue},
	protocol::{frame::coding::CloseCode, CloseFrame},
	Message,
};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Listening acknowledgments after which the service has nothing more to say
const ACKS_BEFORE_CLOSE: u8 = 2;
/// Close code reported when the peer's close frame carries no status
const NO_STATUS_RECEIVED: u16 = 1005;

/// Everything sessions share: endpoint, handshake headers, start frame, pacing
#[derive(Debug)]
pub struct SessionContext {
	url: String,
	headers: Vec<(HeaderName, HeaderValue)>,
	start_frame: String,
	output_dir: PathBuf,
	chunk_size: usize,
	pacing: Duration,
	connect_timeout: Duration,
	close_timeout: Duration,
}

impl SessionContext {
	pub fn new(config: &RecognizeConfig, auth: &AuthHeader) -> Result<Self, SessionError> {
		let (name, value) = auth.header();
		let mut headers = vec![(header_name(name)?, HeaderValue::from_str(value).map_err(|_| SessionError::InvalidHeader(name))?)];
		if config.opt_out {
			headers.push((header_name(OPT_OUT_HEADER)?, HeaderValue::from_static("1")));
		}

		Ok(Self {
			url: config.recognize_url(),
			headers,
			start_frame: StartMessage::from_config(config).to_json()?,
			output_dir: config.output_dir.clone(),
			chunk_size: config.chunk_size,
			pacing: config.pacing,
			connect_timeout: config.connect_timeout,
			close_timeout: config.close_timeout,
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	fn handshake_request(&self) -> Result<Request, SessionError> {
		let mut request = self.url.as_str().into_client_request()?;
		let headers = request.headers_mut();
		for (name, value) in &self.headers {
			headers.insert(name.clone(), value.clone());
		}
		Ok(request)
	}

	/// `<output_dir>/<index>.json.txt`
	pub fn log_path(&self, index: usize) -> PathBuf {
		self.output_dir.join(format!("{index}.json.txt"))
	}
}

fn header_name(name: &'static str) -> Result<HeaderName, SessionError> {
	HeaderName::from_bytes(name.as_bytes()).map_err(|_| SessionError::InvalidHeader(name))
}

/// Lifecycle of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	Connecting,
	/// Start frame sent
	Open,
	/// Audio frames going out on the pacing timer
	Streaming,
	/// Terminal frame sent, collecting results
	AwaitingFinal,
	/// Close handshake in progress, from either side
	Closing,
	Closed,
}

impl fmt::Display for SessionPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Connecting => "connecting",
			Self::Open => "open",
			Self::Streaming => "streaming",
			Self::AwaitingFinal => "awaiting_final",
			Self::Closing => "closing",
			Self::Closed => "closed",
		};
		f.write_str(name)
	}
}

/// Per-connection bookkeeping, never shared
#[derive(Debug, Clone)]
pub struct SessionState {
	pub index: usize,
	pub bytes_sent: usize,
	pub listening_acks: u8,
	pub log_path: PathBuf,
}

/// What a finished session reports back to the dispatcher
#[derive(Debug, Clone)]
pub struct SessionOutcome {
	pub index: usize,
	pub status: CloseStatus,
	pub bytes_sent: usize,
	pub listening_acks: u8,
}

impl SessionOutcome {
	pub fn is_success(&self) -> bool {
		self.status.is_normal()
	}
}

/// Drives one work item through connect, start, paced streaming, result
/// collection and close.
pub struct Session {
	context: Arc<SessionContext>,
	results: Arc<ResultTable>,
	item: WorkItem,
	state: SessionState,
	phase: SessionPhase,
}

impl Session {
	/// Bind an item to a new session; its result record starts empty
	pub fn new(context: Arc<SessionContext>, results: Arc<ResultTable>, item: WorkItem) -> Self {
		results.begin(item.index);
		let state = SessionState {
			index: item.index,
			bytes_sent: 0,
			listening_acks: 0,
			log_path: context.log_path(item.index),
		};

		Self {
			context,
			results,
			item,
			state,
			phase: SessionPhase::Connecting,
		}
	}

	pub const fn phase(&self) -> SessionPhase {
		self.phase
	}

	pub const fn state(&self) -> &SessionState {
		&self.state
	}

	/// Run to a terminal status. Never fails: every outcome lands in the
	/// result table.
	pub async fn run(mut self) -> SessionOutcome {
		self.reset_log().await;

		let status = match self.drive().await {
			Ok(status) => status,
			Err(e) => {
				warn!(index = self.state.index, error = %e, "Session failed before streaming");
				e.close_status()
			}
		};

		self.close(status)
	}

	async fn drive(&mut self) -> Result<CloseStatus, SessionError> {
		let audio = self.item.source.load().await?;
		let ws = self.connect().await?;
		let (mut sink, stream) = ws.split();

		if let Err(e) = self.open(&mut sink).await {
			return Ok(CloseStatus::abnormal(e.to_string()));
		}

		Ok(self.pump(sink, stream, audio).await)
	}

	/// Connecting: websocket handshake with the shared headers
	async fn connect(&mut self) -> Result<WsStream, SessionError> {
		self.phase = SessionPhase::Connecting;
		debug!(index = self.state.index, url = %self.context.url, "Connecting");

		let request = self.context.handshake_request()?;
		let (ws, _) = tokio::time::timeout(self.context.connect_timeout, connect_async(request))
			.await
			.map_err(|_| SessionError::ConnectTimeout(self.context.connect_timeout))??;

		Ok(ws)
	}

	/// Connecting -> Open: send the start frame
	async fn open(&mut self, sink: &mut WsSink) -> Result<(), tokio_tungstenite::tungstenite::Error> {
		sink.send(Message::Text(self.context.start_frame.clone().into())).await?;
		self.phase = SessionPhase::Open;
		info!(index = self.state.index, source = %self.item.source, "Recognition started");
		Ok(())
	}

	/// Interleave paced sends with inbound frames until the connection ends
	async fn pump(&mut self, mut sink: WsSink, mut stream: WsSource, audio: Bytes) -> CloseStatus {
		let mut chunker = AudioChunker::new(audio, self.context.chunk_size);
		let mut pacer = tokio::time::interval(self.context.pacing);
		pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);

		self.phase = SessionPhase::Streaming;
		let mut close_deadline: Option<Instant> = None;
		let mut status: Option<CloseStatus> = None;

		loop {
			tokio::select! {
				_ = pacer.tick(), if self.phase == SessionPhase::Streaming => {
					if let Err(e) = self.stream_tick(&mut sink, &mut chunker).await {
						warn!(index = self.state.index, error = %e, "Failed to send audio");
						status.get_or_insert_with(|| CloseStatus::abnormal(e.to_string()));
						break;
					}
				}
				msg = stream.next() => {
					match msg {
						Some(Ok(Message::Text(text))) => {
							if self.on_text(text.as_str()).await && close_deadline.is_none() {
								close_deadline = Some(Instant::now() + self.context.close_timeout);
								if let Err(e) = self.request_close(&mut sink).await {
									status.get_or_insert_with(|| CloseStatus::abnormal(e.to_string()));
									break;
								}
							}
						}
						Some(Ok(Message::Close(frame))) => {
							let received = frame.map_or_else(
								|| CloseStatus::new(Some(NO_STATUS_RECEIVED), ""),
								|f| CloseStatus::new(Some(u16::from(f.code)), f.reason.as_str()),
							);
							debug!(index = self.state.index, code = ?received.code, "Close frame received");
							status.get_or_insert(received);
							close_deadline.get_or_insert_with(|| Instant::now() + self.context.close_timeout);
							self.phase = SessionPhase::Closing;
						}
						Some(Ok(_)) => {}
						Some(Err(e)) => {
							warn!(index = self.state.index, error = %e, phase = %self.phase, "WebSocket error");
							status.get_or_insert_with(|| CloseStatus::abnormal(e.to_string()));
							break;
						}
						None => break,
					}
				}
				_ = tokio::time::sleep_until(close_deadline.unwrap_or_else(Instant::now)), if close_deadline.is_some() => {
					warn!(index = self.state.index, "Close handshake timed out");
					status.get_or_insert_with(|| CloseStatus::abnormal("close handshake timed out"));
					break;
				}
			}
		}

		status.unwrap_or_else(|| CloseStatus::abnormal("connection ended without a close frame"))
	}

	/// Streaming: one pacing tick. Moves to AwaitingFinal after the terminal frame.
	async fn stream_tick(&mut self, sink: &mut WsSink, chunker: &mut AudioChunker) -> Result<(), tokio_tungstenite::tungstenite::Error> {
		for frame in chunker.next_tick() {
			match frame {
				Frame::Audio(chunk) => {
					self.state.bytes_sent += chunk.len();
					sink.send(Message::binary(chunk)).await?;
				}
				Frame::EndOfStream => {
					sink.send(Message::binary(Bytes::new())).await?;
					self.phase = SessionPhase::AwaitingFinal;
					debug!(index = self.state.index, bytes_sent = self.state.bytes_sent, "Audio fully sent");
				}
			}
		}
		Ok(())
	}

	/// Handle one inbound text frame. Returns true when the session should
	/// ask to close.
	async fn on_text(&mut self, text: &str) -> bool {
		match ServiceMessage::parse(text) {
			ServiceMessage::State(state) => {
				self.state.listening_acks = self.state.listening_acks.saturating_add(1);
				debug!(index = self.state.index, state = %state, acks = self.state.listening_acks, "Listening acknowledgment");
				self.state.listening_acks == ACKS_BEFORE_CLOSE
			}
			ServiceMessage::Results { results, raw } => {
				if results.is_empty() {
					return false;
				}

				self.persist(&raw).await;

				if let Some(hypothesis) = results.first_hypothesis() {
					if hypothesis.is_final {
						info!(index = self.state.index, hypothesis = %hypothesis.transcript, "Final hypothesis");
						self.results.append(self.state.index, &hypothesis.transcript);
					} else {
						debug!(index = self.state.index, hypothesis = %hypothesis.transcript, "Interim hypothesis");
					}
				}
				false
			}
			ServiceMessage::Error(error) => {
				warn!(index = self.state.index, error = %error, "Service reported an error");
				false
			}
			ServiceMessage::Unknown => {
				debug!(index = self.state.index, "Ignoring unrecognised message");
				false
			}
		}
	}

	/// Ask for a normal close; nothing else is sent afterwards
	async fn request_close(&mut self, sink: &mut WsSink) -> Result<(), tokio_tungstenite::tungstenite::Error> {
		self.phase = SessionPhase::Closing;
		debug!(index = self.state.index, "Requesting close");
		sink.send(Message::Close(Some(CloseFrame {
			code: CloseCode::Normal,
			reason: String::new().into(),
		})))
		.await
	}

	/// Closed: record the terminal status
	fn close(mut self, status: CloseStatus) -> SessionOutcome {
		self.phase = SessionPhase::Closed;
		self.results.finalize(self.state.index, status.clone());

		if status.is_normal() {
			info!(index = self.state.index, code = ?status.code, bytes_sent = self.state.bytes_sent, "Session closed");
		} else {
			warn!(index = self.state.index, code = ?status.code, reason = %status.reason, "Session closed abnormally");
		}

		SessionOutcome {
			index: self.state.index,
			status,
			bytes_sent: self.state.bytes_sent,
			listening_acks: self.state.listening_acks,
		}
	}

	async fn reset_log(&self) {
		match tokio::fs::remove_file(&self.state.log_path).await {
			Ok(()) => {}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
			Err(e) => warn!(path = %self.state.log_path.display(), error = %e, "Failed to clear result log"),
		}
	}

	/// Append a results message to the item's audit log
	async fn persist(&self, raw: &Value) {
		let rendered = match pretty_json(raw) {
			Ok(rendered) => rendered,
			Err(e) => {
				warn!(index = self.state.index, error = %e, "Failed to render result message");
				return;
			}
		};

		let written = async {
			let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.state.log_path).await?;
			file.write_all(rendered.as_bytes()).await?;
			file.flush().await
		}
		.await;

		if let Err(e) = written {
			warn!(path = %self.state.log_path.display(), error = %e, "Failed to append result log");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::Credentials;

	fn context(config: &RecognizeConfig) -> SessionContext {
		SessionContext::new(config, &AuthHeader::basic(&Credentials::new("u", "p"))).unwrap()
	}

	#[test]
	fn handshake_carries_auth_and_opt_out() {
		let config = RecognizeConfig { opt_out: true, ..RecognizeConfig::default() };
		let request = context(&config).handshake_request().unwrap();

		assert_eq!(request.headers().get("Authorization").unwrap(), "Basic dTpw");
		assert_eq!(request.headers().get(OPT_OUT_HEADER).unwrap(), "1");
		assert_eq!(request.uri().path(), "/speech-to-text/api/v1/recognize");
	}

	#[test]
	fn opt_out_header_is_optional() {
		let request = context(&RecognizeConfig::default()).handshake_request().unwrap();
		assert!(request.headers().get(OPT_OUT_HEADER).is_none());
	}

	#[test]
	fn log_path_uses_index() {
		let config = RecognizeConfig {
			output_dir: PathBuf::from("/tmp/out"),
			..RecognizeConfig::default()
		};
		assert_eq!(context(&config).log_path(4), PathBuf::from("/tmp/out/4.json.txt"));
	}

	#[test]
	fn new_session_resets_its_record() {
		let results = Arc::new(ResultTable::new());
		results.begin(0);
		results.append(0, "old");

		let session = Session::new(Arc::new(context(&RecognizeConfig::default())), results.clone(), WorkItem::new(0, vec![1u8]));

		assert_eq!(session.phase(), SessionPhase::Connecting);
		assert_eq!(session.state().bytes_sent, 0);
		assert_eq!(results.get(0).unwrap().hypothesis, "");
	}

	#[tokio::test]
	async fn second_state_requests_close() {
		let dir = tempfile::tempdir().unwrap();
		let config = RecognizeConfig {
			output_dir: dir.path().to_path_buf(),
			..RecognizeConfig::default()
		};
		let results = Arc::new(ResultTable::new());
		let mut session = Session::new(Arc::new(context(&config)), results.clone(), WorkItem::new(2, vec![1u8]));

		assert!(!session.on_text(r#"{"state": "listening"}"#).await);
		assert!(!session.on_text(r#"{"results": [{"final": true, "alternatives": [{"transcript": "hi "}]}]}"#).await);
		assert!(!session.on_text(r#"{"results": [{"final": false, "alternatives": [{"transcript": "there"}]}]}"#).await);
		assert!(session.on_text(r#"{"state": "listening"}"#).await);
		assert!(!session.on_text(r#"{"state": "listening"}"#).await);

		assert_eq!(results.get(2).unwrap().hypothesis, "hi ");

		let log = std::fs::read_to_string(dir.path().join("2.json.txt")).unwrap();
		assert!(log.contains("\"transcript\": \"hi \""));
		assert!(log.contains("\"transcript\": \"there\""));
	}

	#[tokio::test]
	async fn empty_results_are_not_logged() {
		let dir = tempfile::tempdir().unwrap();
		let config = RecognizeConfig {
			output_dir: dir.path().to_path_buf(),
			..RecognizeConfig::default()
		};
		let mut session = Session::new(Arc::new(context(&config)), Arc::new(ResultTable::new()), WorkItem::new(0, vec![1u8]));

		session.on_text(r#"{"results": []}"#).await;
		assert!(!dir.path().join("0.json.txt").exists());
	}
}
