use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::exe;

const TARGET: &str = "tabdb::core::dbs::queue";

/// Identifies the kind of a delayed task, for logging and cancellation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum TimerId {
	/// The periodic client metadata refresh and lease re-evaluation
	ClientMetadataRefresh,
}

type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A FIFO queue which runs every coordinator-initiated operation on one
/// logical executor.
///
/// Tasks run strictly one at a time in enqueue order, so coordinator state
/// is never mutated concurrently within a process. Caller transactions do
/// not pass through the queue; they serialise at the datastore instead.
#[non_exhaustive]
pub struct AsyncQueue {
	sender: channel::Sender<Task>,
}

impl AsyncQueue {
	/// Creates a new queue and spawns its worker.
	pub fn new() -> Self {
		let (sender, receiver) = channel::unbounded::<Task>();
		exe::spawn(async move {
			while let Ok(task) = receiver.recv().await {
				task.await;
			}
			trace!(target: TARGET, "Queue worker finished");
		});
		Self {
			sender,
		}
	}

	/// Schedules a task, ignoring its outcome.
	///
	/// Tasks enqueued after the queue was closed are dropped silently; this
	/// happens only during shutdown.
	pub fn enqueue_and_forget<F>(&self, task: F)
	where
		F: Future<Output = ()> + Send + 'static,
	{
		if self.sender.try_send(Box::pin(task)).is_err() {
			trace!(target: TARGET, "Dropped a task enqueued after shutdown");
		}
	}

	/// Schedules a task to be enqueued once after a delay.
	///
	/// Cancellation is best-effort: a task which already reached the queue
	/// will still run.
	pub fn enqueue_after<F>(&self, timer: TimerId, delay: Duration, task: F) -> DelayedTask
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let cancelled = Arc::new(AtomicBool::new(false));
		let handle = DelayedTask {
			timer,
			cancelled: cancelled.clone(),
		};
		let sender = self.sender.clone();
		exe::spawn(async move {
			exe::sleep(delay).await;
			if cancelled.load(Ordering::SeqCst) {
				trace!(target: TARGET, "Skipping cancelled timer {:?}", timer);
				return;
			}
			if sender.try_send(Box::pin(task) as Task).is_err() {
				trace!(target: TARGET, "Dropped timer {:?} fired after shutdown", timer);
			}
		});
		handle
	}

	/// Closes the queue. The worker drains any queued tasks and exits.
	pub fn close(&self) {
		self.sender.close();
	}

	/// Waits until every task enqueued before this call has completed.
	#[cfg(test)]
	pub(crate) async fn flush(&self) {
		let (sender, receiver) = channel::bounded::<()>(1);
		self.enqueue_and_forget(async move {
			let _ = sender.send(()).await;
		});
		let _ = receiver.recv().await;
	}
}

impl Default for AsyncQueue {
	fn default() -> Self {
		Self::new()
	}
}

/// A handle to a task scheduled with [`AsyncQueue::enqueue_after`].
#[non_exhaustive]
pub struct DelayedTask {
	timer: TimerId,
	cancelled: Arc<AtomicBool>,
}

impl DelayedTask {
	/// The timer this task was scheduled under.
	pub fn timer(&self) -> TimerId {
		self.timer
	}

	/// Prevents the task from running if it has not yet been enqueued.
	pub fn cancel(&self) {
		trace!(target: TARGET, "Cancelling timer {:?}", self.timer);
		self.cancelled.store(true, Ordering::SeqCst);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	#[tokio::test]
	async fn tasks_run_in_fifo_order() {
		let queue = AsyncQueue::new();
		let order = Arc::new(Mutex::new(Vec::new()));
		for i in 0..10 {
			let order = order.clone();
			queue.enqueue_and_forget(async move {
				order.lock().unwrap().push(i);
			});
		}
		queue.flush().await;
		assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
	}

	#[tokio::test]
	async fn cancelled_timers_do_not_run() {
		let queue = AsyncQueue::new();
		let fired = Arc::new(AtomicBool::new(false));
		let flag = fired.clone();
		let task = queue.enqueue_after(
			TimerId::ClientMetadataRefresh,
			Duration::from_millis(10),
			async move {
				flag.store(true, Ordering::SeqCst);
			},
		);
		task.cancel();
		tokio::time::sleep(Duration::from_millis(50)).await;
		queue.flush().await;
		assert!(!fired.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn delayed_tasks_run_after_the_delay() {
		let queue = AsyncQueue::new();
		let fired = Arc::new(AtomicBool::new(false));
		let flag = fired.clone();
		queue.enqueue_after(
			TimerId::ClientMetadataRefresh,
			Duration::from_millis(10),
			async move {
				flag.store(true, Ordering::SeqCst);
			},
		);
		tokio::time::sleep(Duration::from_millis(50)).await;
		queue.flush().await;
		assert!(fired.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn closed_queues_drop_new_tasks() {
		let queue = AsyncQueue::new();
		queue.close();
		let fired = Arc::new(AtomicBool::new(false));
		let flag = fired.clone();
		queue.enqueue_and_forget(async move {
			flag.store(true, Ordering::SeqCst);
		});
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!fired.load(Ordering::SeqCst));
	}
}
