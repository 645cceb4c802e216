#![cfg(feature = "kv-mem")]

mod scenarios;

use std::sync::{Arc, Mutex};

use crate::dbs::client::Timestamp;
use crate::dbs::coordinator::{Coordinator, CoordinatorOptions};
use crate::dbs::side::MemorySideChannel;
use crate::dbs::window::ManualWindow;
use crate::kvs::{Datastore, FakeClock, SizedClock};

/// A shared database with a controllable clock, hosting several simulated
/// clients the way browser tabs share one IndexedDB database.
pub(crate) struct TestContext {
	pub ds: Arc<Datastore>,
	pub clock: Arc<SizedClock>,
	pub side: Arc<MemorySideChannel>,
}

/// One simulated client: a coordinator, its window, and a log of every
/// primary state notification it received.
pub(crate) struct TestClient {
	pub coordinator: Arc<Coordinator>,
	pub window: Arc<ManualWindow>,
	pub notifications: Arc<Mutex<Vec<bool>>>,
}

impl TestContext {
	pub async fn new() -> Self {
		let clock = Arc::new(SizedClock::Fake(FakeClock::new(Timestamp::from(1_700_000_000_000))));
		let ds = Datastore::new_with_clock("memory", Some(clock.clone())).await.unwrap();
		Self {
			ds: Arc::new(ds),
			clock,
			side: Arc::new(MemorySideChannel::new()),
		}
	}

	/// Move the shared clock forwards.
	pub async fn advance(&self, ms: u64) {
		let now = self.clock.now().await;
		self.clock.set(Timestamp::from(now.value + ms)).await;
	}

	/// Create a client with the given network and visibility state.
	pub fn client(&self, network_enabled: bool, in_foreground: bool) -> TestClient {
		self.client_with_synchronization(network_enabled, in_foreground, true)
	}

	pub fn client_with_synchronization(
		&self,
		network_enabled: bool,
		in_foreground: bool,
		allow_tab_synchronization: bool,
	) -> TestClient {
		let window = ManualWindow::new();
		let mut options = CoordinatorOptions::new(
			self.ds.clone(),
			"main",
			"app",
			self.side.clone(),
			window.clone(),
		);
		options.network_enabled = network_enabled;
		options.in_foreground = in_foreground;
		options.allow_tab_synchronization = allow_tab_synchronization;
		TestClient {
			coordinator: Coordinator::new(options),
			window,
			notifications: Arc::new(Mutex::new(Vec::new())),
		}
	}
}

impl TestClient {
	/// Register a listener which records every primary state notification.
	pub async fn attach_listener(&self) {
		let log = self.notifications.clone();
		self.coordinator
			.set_primary_state_listener(Arc::new(move |is_primary| {
				let log = log.clone();
				Box::pin(async move {
					log.lock().unwrap().push(is_primary);
				})
			}))
			.await;
	}

	/// Run one metadata refresh and lease re-evaluation directly.
	pub async fn refresh(&self) {
		self.coordinator.update_metadata_and_try_become_primary().await.unwrap();
	}

	/// Wait for every queued coordinator task to complete.
	pub async fn flush(&self) {
		self.coordinator.queue.flush().await;
	}

	/// The primary state notifications received so far.
	pub fn notified(&self) -> Vec<bool> {
		self.notifications.lock().unwrap().clone()
	}
}
