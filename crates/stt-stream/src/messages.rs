mod service;
mod start;

pub use service::{Alternative, Hypothesis, RecognitionResults, ServiceMessage, SpeechResult};
pub use start::StartMessage;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

/// Four-space indented rendering used for the per-item audit log
pub fn pretty_json(value: &Value) -> Result<String, serde_json::Error> {
	let mut out = Vec::new();
	let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
	value.serialize(&mut serializer)?;
	Ok(String::from_utf8_lossy(&out).into_owned())
}
