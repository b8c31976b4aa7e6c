use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// The only close code that counts as success
pub const NORMAL_CLOSURE: u16 = 1000;
/// Code recorded when the transport dies without a close handshake
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Terminal outcome of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloseStatus {
	/// Close code, absent when no connection was ever established
	pub code: Option<u16>,
	pub reason: String,
}

impl CloseStatus {
	pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
		Self { code, reason: reason.into() }
	}

	pub fn abnormal(reason: impl Into<String>) -> Self {
		Self::new(Some(ABNORMAL_CLOSURE), reason)
	}

	/// A failure before any close code could exist
	pub fn failed(reason: impl Into<String>) -> Self {
		Self::new(None, reason)
	}

	pub fn is_normal(&self) -> bool {
		self.code == Some(NORMAL_CLOSURE)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
	/// Concatenation of every final transcript, in arrival order
	pub hypothesis: String,
	/// `None` until the session closes
	pub status: Option<CloseStatus>,
}

impl ResultRecord {
	pub fn is_finalized(&self) -> bool {
		self.status.is_some()
	}

	pub fn is_success(&self) -> bool {
		self.status.as_ref().is_some_and(CloseStatus::is_normal)
	}

	/// The hypothesis when the item closed normally
	pub fn transcript(&self) -> Option<&str> {
		self.is_success().then_some(self.hypothesis.as_str())
	}
}

/// Per-item outcomes, written by sessions and read once the queue drains.
/// Each index is written only by the session holding that item.
#[derive(Debug, Default)]
pub struct ResultTable {
	records: DashMap<usize, ResultRecord>,
}

impl ResultTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fresh record at assignment time
	pub fn begin(&self, index: usize) {
		self.records.insert(index, ResultRecord::default());
	}

	/// Append a final transcript. Ignored once the record is finalized.
	pub fn append(&self, index: usize, text: &str) -> bool {
		let mut record = self.records.entry(index).or_default();
		if record.is_finalized() {
			tracing::warn!(index, "Dropping transcript for finalized result");
			return false;
		}
		record.hypothesis.push_str(text);
		true
	}

	/// Set the terminal status; only the first call takes effect
	pub fn finalize(&self, index: usize, status: CloseStatus) -> bool {
		let mut record = self.records.entry(index).or_default();
		if record.is_finalized() {
			tracing::warn!(index, ?status, "Result already finalized");
			return false;
		}
		record.status = Some(status);
		true
	}

	pub fn get(&self, index: usize) -> Option<ResultRecord> {
		self.records.get(&index).map(|r| r.clone())
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Ordered copy of every record
	pub fn snapshot(&self) -> BTreeMap<usize, ResultRecord> {
		self.records.iter().map(|entry| (*entry.key(), entry.value().clone())).collect()
	}
}
