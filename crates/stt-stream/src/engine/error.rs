use crate::results::CloseStatus;
use std::time::Duration;
use thiserror::Error;

/// Failures that stop a session before a websocket exists
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("Failed to read audio source: {0}")]
	Audio(#[from] std::io::Error),

	#[error("Failed to connect to WebSocket: {0}")]
	WebSocketConnection(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("Connection timeout after {0:?}")]
	ConnectTimeout(Duration),

	#[error("Invalid value for header {0}")]
	InvalidHeader(&'static str),

	#[error("Failed to encode start message: {0}")]
	Encode(#[from] serde_json::Error),
}

impl SessionError {
	/// Status recorded for an item whose connection never opened
	pub fn close_status(&self) -> CloseStatus {
		CloseStatus::failed(self.to_string())
	}
}
