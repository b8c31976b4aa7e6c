use crate::audio::AudioSource;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// One audio item awaiting transcription. Immutable once enqueued.
#[derive(Debug, Clone)]
pub struct WorkItem {
	pub index: usize,
	pub source: AudioSource,
}

impl WorkItem {
	pub fn new(index: usize, source: impl Into<AudioSource>) -> Self {
		Self { index, source: source.into() }
	}
}

/// FIFO of pending items plus an outstanding counter.
///
/// Every enqueued item is popped at most once; [`WorkQueue::join`] resolves
/// once each enqueued item has been marked done.
#[derive(Debug)]
pub struct WorkQueue {
	pending: Mutex<VecDeque<WorkItem>>,
	outstanding: watch::Sender<usize>,
}

impl Default for WorkQueue {
	fn default() -> Self {
		Self::new()
	}
}

impl WorkQueue {
	pub fn new() -> Self {
		let (outstanding, _) = watch::channel(0);
		Self {
			pending: Mutex::new(VecDeque::new()),
			outstanding,
		}
	}

	/// Queue the sources in order, indexed from zero
	pub fn from_sources<I, S>(sources: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<AudioSource>,
	{
		let queue = Self::new();
		for (index, source) in sources.into_iter().enumerate() {
			queue.enqueue(WorkItem::new(index, source));
		}
		queue
	}

	fn pending(&self) -> MutexGuard<'_, VecDeque<WorkItem>> {
		self.pending.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn enqueue(&self, item: WorkItem) {
		self.pending().push_back(item);
		self.outstanding.send_modify(|n| *n += 1);
	}

	/// Take the head without waiting
	pub fn try_pop(&self) -> Option<WorkItem> {
		self.pending().pop_front()
	}

	/// Record that a popped item reached a terminal state
	pub fn mark_done(&self, index: usize) {
		self.outstanding.send_modify(|n| {
			if *n == 0 {
				tracing::warn!(index, "mark_done called with nothing outstanding");
			}
			*n = n.saturating_sub(1);
		});
	}

	/// Items not yet popped
	pub fn len(&self) -> usize {
		self.pending().len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending().is_empty()
	}

	/// Items enqueued but not yet marked done
	pub fn outstanding(&self) -> usize {
		*self.outstanding.borrow()
	}

	/// Wait until every enqueued item has been marked done
	pub async fn join(&self) {
		let mut rx = self.outstanding.subscribe();
		// The sender lives in `self`, so this cannot observe a closed channel.
		let _ = rx.wait_for(|n| *n == 0).await;
	}
}
