use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Alternative {
	#[serde(default)]
	pub transcript: String,
	#[serde(default)]
	pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SpeechResult {
	#[serde(rename = "final", default)]
	pub is_final: bool,
	#[serde(default)]
	pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RecognitionResults {
	#[serde(default)]
	pub results: Vec<SpeechResult>,
	#[serde(default)]
	pub result_index: Option<u64>,
}

/// Text picked out of one results message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hypothesis {
	pub transcript: String,
	pub is_final: bool,
}

impl RecognitionResults {
	/// First alternative of the first result; everything else is discarded
	pub fn first_hypothesis(&self) -> Option<Hypothesis> {
		let result = self.results.first()?;
		let alternative = result.alternatives.first()?;
		Some(Hypothesis {
			transcript: alternative.transcript.clone(),
			is_final: result.is_final,
		})
	}

	pub fn is_empty(&self) -> bool {
		self.results.is_empty()
	}
}

/// Inbound text frame, classified by the keys it carries
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceMessage {
	/// `{"state": ...}` listening acknowledgment
	State(String),
	/// `{"results": [...]}`, with the raw document kept for the audit log
	Results { results: RecognitionResults, raw: Value },
	/// `{"error": ...}` reported by the service
	Error(String),
	/// Anything else, including text that is not JSON
	Unknown,
}

impl ServiceMessage {
	pub fn parse(text: &str) -> Self {
		let Ok(raw) = serde_json::from_str::<Value>(text) else {
			return Self::Unknown;
		};

		if let Some(state) = raw.get("state") {
			return Self::State(state.as_str().map_or_else(|| state.to_string(), str::to_owned));
		}

		if raw.get("results").is_some() {
			return match serde_json::from_value::<RecognitionResults>(raw.clone()) {
				Ok(results) => Self::Results { results, raw },
				Err(_) => Self::Unknown,
			};
		}

		if let Some(error) = raw.get("error") {
			return Self::Error(error.as_str().map_or_else(|| error.to_string(), str::to_owned));
		}

		Self::Unknown
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn state_message_is_listening_ack() {
		assert_eq!(ServiceMessage::parse(r#"{"state": "listening"}"#), ServiceMessage::State("listening".to_string()));
	}

	#[test]
	fn state_wins_over_results() {
		let msg = ServiceMessage::parse(r#"{"state": "listening", "results": []}"#);
		assert!(matches!(msg, ServiceMessage::State(_)));
	}

	#[test]
	fn picks_first_alternative_of_first_result() {
		let text = r#"{
			"result_index": 0,
			"results": [
				{"final": true, "alternatives": [{"transcript": "hello world ", "confidence": 0.9}, {"transcript": "yellow world "}]},
				{"final": false, "alternatives": [{"transcript": "ignored"}]}
			]
		}"#;

		let ServiceMessage::Results { results, .. } = ServiceMessage::parse(text) else {
			panic!("expected results");
		};

		assert_eq!(
			results.first_hypothesis(),
			Some(Hypothesis {
				transcript: "hello world ".to_string(),
				is_final: true
			})
		);
	}

	#[test]
	fn interim_results_are_not_final() {
		let text = r#"{"results": [{"final": false, "alternatives": [{"transcript": "hel"}]}]}"#;
		let ServiceMessage::Results { results, .. } = ServiceMessage::parse(text) else {
			panic!("expected results");
		};
		assert!(!results.first_hypothesis().unwrap().is_final);
	}

	#[test]
	fn empty_results_have_no_hypothesis() {
		let ServiceMessage::Results { results, .. } = ServiceMessage::parse(r#"{"results": []}"#) else {
			panic!("expected results");
		};
		assert!(results.is_empty());
		assert_eq!(results.first_hypothesis(), None);
	}

	#[test]
	fn result_without_alternatives_has_no_hypothesis() {
		let ServiceMessage::Results { results, .. } = ServiceMessage::parse(r#"{"results": [{"final": true, "alternatives": []}]}"#) else {
			panic!("expected results");
		};
		assert_eq!(results.first_hypothesis(), None);
	}

	#[test]
	fn anomalies_are_unknown() {
		assert_eq!(ServiceMessage::parse("not json"), ServiceMessage::Unknown);
		assert_eq!(ServiceMessage::parse(r#"{"warnings": ["x"]}"#), ServiceMessage::Unknown);
		assert_eq!(ServiceMessage::parse(r#"{"results": "oops"}"#), ServiceMessage::Unknown);
	}

	#[test]
	fn service_errors_are_surfaced() {
		assert_eq!(
			ServiceMessage::parse(r#"{"error": "No speech detected for 30s."}"#),
			ServiceMessage::Error("No speech detected for 30s.".to_string())
		);
	}
}
