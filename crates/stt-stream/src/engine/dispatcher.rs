use super::{Session, SessionContext, SessionOutcome};
use crate::queue::{WorkItem, WorkQueue};
use crate::results::ResultTable;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Counters describing one dispatcher run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
	/// Most sessions ever open at once
	pub peak_active: usize,
	pub sessions_run: usize,
	pub succeeded: usize,
	pub failed: usize,
}

#[derive(Debug, Default)]
struct ActivityGauge {
	active: AtomicUsize,
	peak: AtomicUsize,
	sessions: AtomicUsize,
	succeeded: AtomicUsize,
}

impl ActivityGauge {
	fn enter(&self) -> usize {
		let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);
		now
	}

	fn exit(&self, outcome: &SessionOutcome) {
		self.active.fetch_sub(1, Ordering::SeqCst);
		self.sessions.fetch_add(1, Ordering::SeqCst);
		if outcome.is_success() {
			self.succeeded.fetch_add(1, Ordering::SeqCst);
		}
	}

	fn stats(&self) -> PoolStats {
		let sessions_run = self.sessions.load(Ordering::SeqCst);
		let succeeded = self.succeeded.load(Ordering::SeqCst);
		PoolStats {
			peak_active: self.peak.load(Ordering::SeqCst),
			sessions_run,
			succeeded,
			failed: sessions_run - succeeded,
		}
	}
}

/// Marks its item done when dropped, so a slot that dies mid-session still
/// releases the queue's join
struct ItemGuard {
	queue: Arc<WorkQueue>,
	index: usize,
}

impl Drop for ItemGuard {
	fn drop(&mut self) {
		self.queue.mark_done(self.index);
	}
}

/// Bounded pool of sessions over a shared work queue
pub struct Dispatcher {
	queue: Arc<WorkQueue>,
	results: Arc<ResultTable>,
	context: Arc<SessionContext>,
	threads: usize,
	gauge: Arc<ActivityGauge>,
}

impl Dispatcher {
	pub fn new(queue: Arc<WorkQueue>, results: Arc<ResultTable>, context: Arc<SessionContext>, threads: usize) -> Self {
		Self {
			queue,
			results,
			context,
			threads: threads.max(1),
			gauge: Arc::new(ActivityGauge::default()),
		}
	}

	pub fn results(&self) -> &Arc<ResultTable> {
		&self.results
	}

	/// Open `min(threads, queued)` slots and return once every queued item
	/// has been marked done
	pub async fn run(&self) -> PoolStats {
		let queued = self.queue.len();
		let initial = self.threads.min(queued);
		info!(threads = self.threads, queued, slots = initial, url = %self.context.url(), "Starting recognition pool");

		let mut slots = JoinSet::new();
		for slot in 0..initial {
			let Some(item) = self.queue.try_pop() else {
				break;
			};
			slots.spawn(run_slot(slot, item, self.queue.clone(), self.results.clone(), self.context.clone(), self.gauge.clone()));
		}

		self.queue.join().await;

		while let Some(joined) = slots.join_next().await {
			if let Err(e) = joined {
				error!(error = %e, "Pool slot terminated abnormally");
			}
		}

		let stats = self.gauge.stats();
		info!(
			sessions = stats.sessions_run,
			succeeded = stats.succeeded,
			failed = stats.failed,
			peak_active = stats.peak_active,
			"Recognition pool drained"
		);
		stats
	}
}

/// One pool slot: run a session, then pull the next item until the queue is empty
async fn run_slot(slot: usize, first: WorkItem, queue: Arc<WorkQueue>, results: Arc<ResultTable>, context: Arc<SessionContext>, gauge: Arc<ActivityGauge>) {
	let mut next = Some(first);

	while let Some(item) = next {
		let guard = ItemGuard {
			queue: queue.clone(),
			index: item.index,
		};

		let active = gauge.enter();
		debug!(slot, index = item.index, active, "Opening session");

		let outcome = Session::new(context.clone(), results.clone(), item).run().await;
		gauge.exit(&outcome);
		drop(guard);

		next = queue.try_pop();
	}

	debug!(slot, "Queue empty, retiring slot");
}
