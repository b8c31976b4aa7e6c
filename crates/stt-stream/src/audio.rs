use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;

/// Where a work item's audio comes from
#[derive(Clone)]
pub enum AudioSource {
	File(PathBuf),
	Bytes(Bytes),
}

impl fmt::Debug for AudioSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::File(path) => f.debug_tuple("File").field(path).finish(),
			Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
		}
	}
}

impl fmt::Display for AudioSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::File(path) => write!(f, "{}", path.display()),
			Self::Bytes(bytes) => write!(f, "<{} bytes in memory>", bytes.len()),
		}
	}
}

impl From<PathBuf> for AudioSource {
	fn from(path: PathBuf) -> Self {
		Self::File(path)
	}
}

impl From<Vec<u8>> for AudioSource {
	fn from(bytes: Vec<u8>) -> Self {
		Self::Bytes(Bytes::from(bytes))
	}
}

impl AudioSource {
	/// Read the whole payload
	pub async fn load(&self) -> std::io::Result<Bytes> {
		match self {
			Self::File(path) => tokio::fs::read(path).await.map(Bytes::from),
			Self::Bytes(bytes) => Ok(bytes.clone()),
		}
	}
}

/// One outbound binary frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
	Audio(Bytes),
	/// Zero-length frame marking end of input
	EndOfStream,
}

/// Splits a payload into paced frames.
///
/// When no more than one chunk remains, the remainder goes out and is
/// followed by exactly one [`Frame::EndOfStream`]; `L` bytes therefore take
/// `ceil(L / C)` audio frames.
#[derive(Debug)]
pub struct AudioChunker {
	data: Bytes,
	chunk_size: usize,
	sent: usize,
	finished: bool,
}

impl AudioChunker {
	pub fn new(data: Bytes, chunk_size: usize) -> Self {
		Self {
			data,
			chunk_size: chunk_size.max(1),
			sent: 0,
			finished: false,
		}
	}

	pub const fn bytes_sent(&self) -> usize {
		self.sent
	}

	pub fn total(&self) -> usize {
		self.data.len()
	}

	/// Frames for the next pacing tick: one audio chunk, or the final
	/// remainder plus the terminal frame. Empty once the stream is finished.
	pub fn next_tick(&mut self) -> Vec<Frame> {
		if self.finished {
			return Vec::new();
		}

		let len = self.data.len();
		if self.sent + self.chunk_size >= len {
			self.finished = true;
			let mut frames = Vec::with_capacity(2);
			if len > self.sent {
				frames.push(Frame::Audio(self.data.slice(self.sent..len)));
				self.sent = len;
			}
			frames.push(Frame::EndOfStream);
			return frames;
		}

		let end = self.sent + self.chunk_size;
		let chunk = self.data.slice(self.sent..end);
		self.sent = end;
		vec![Frame::Audio(chunk)]
	}

	pub const fn is_finished(&self) -> bool {
		self.finished
	}
}
