use crate::config::RecognizeConfig;
use serde::Serialize;

/// The single control frame that opens a recognition request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StartMessage {
	pub action: &'static str,
	#[serde(rename = "content-type")]
	pub content_type: String,
	pub continuous: bool,
	pub interim_results: bool,
	pub inactivity_timeout: u32,
	pub word_confidence: bool,
	pub timestamps: bool,
	pub max_alternatives: u32,
}

impl StartMessage {
	pub fn from_config(config: &RecognizeConfig) -> Self {
		Self {
			action: "start",
			content_type: config.content_type.clone(),
			continuous: true,
			interim_results: true,
			inactivity_timeout: config.inactivity_timeout_secs,
			word_confidence: true,
			timestamps: true,
			max_alternatives: config.max_alternatives,
		}
	}

	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}
}
