use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::cf;
use crate::cnf::{
	CLIENT_METADATA_MAX_AGE_MS, CLIENT_METADATA_REFRESH_INTERVAL_MS,
	CLIENT_STATE_GARBAGE_COLLECTION_THRESHOLD_MS, PRIMARY_LEASE_MAX_AGE_MS, SCAN_BATCH_SIZE,
};
use crate::dbs::client::{ClientMetadata, PrimaryClient, Timestamp};
use crate::dbs::queue::{AsyncQueue, DelayedTask, TimerId};
use crate::dbs::side::{zombie_key, SideChannel};
use crate::dbs::window::{ListenerId, Window};
use crate::doc::{MutationQueue, QueryCache, RemoteDocumentCache};
use crate::err::Error;
use crate::kvs::{
	Datastore, SystemClock, Transaction, TransactionType, TxFuture, ALL_STORES,
	CLIENT_STATE_STORES, GC_STORES,
};

const TARGET: &str = "tabdb::core::dbs::coordinator";

/// Derives the storage prefix shared by every client of one database, of
/// the form `firestore/<persistenceKey>/<projectId[.databaseId]>/`.
///
/// Dots are unambiguous because project ids are DNS labels.
pub fn storage_prefix(persistence_key: &str, project_id: &str, database_id: Option<&str>) -> String {
	match database_id {
		Some(database_id) => format!("firestore/{}/{}.{}/", persistence_key, project_id, database_id),
		None => format!("firestore/{}/{}/", persistence_key, project_id),
	}
}

/// A callback invoked on the async queue whenever the local client gains
/// or loses the primary role.
pub type PrimaryStateListener =
	Arc<dyn Fn(bool) -> BoxFuture<'static, ()> + Send + Sync + 'static>;

/// The lifecycle state of a coordinator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum State {
	Starting,
	Secondary,
	Primary,
	Failed,
	Stopped,
}

struct LocalState {
	state: State,
	is_primary: bool,
	network_enabled: bool,
	in_foreground: bool,
	started: bool,
	error: Option<String>,
}

/// The inputs needed to create a [`Coordinator`].
#[non_exhaustive]
pub struct CoordinatorOptions {
	/// The opened datastore, shared by every client of the same database
	/// within this process.
	pub datastore: Arc<Datastore>,
	/// The persistence key identifying this application instance.
	pub persistence_key: String,
	/// The project this database belongs to.
	pub project_id: String,
	/// The database within the project, if not the default.
	pub database_id: Option<String>,
	/// Whether this client opts into shared multi-client access.
	pub allow_tab_synchronization: bool,
	/// Whether network I/O is currently enabled for this client.
	pub network_enabled: bool,
	/// Whether the hosting surface is currently user-visible.
	pub in_foreground: bool,
	/// The synchronous side channel used for zombie markers.
	pub side: Arc<dyn SideChannel>,
	/// The source of visibility and unload events.
	pub window: Arc<dyn Window>,
}

impl CoordinatorOptions {
	pub fn new(
		datastore: Arc<Datastore>,
		persistence_key: &str,
		project_id: &str,
		side: Arc<dyn SideChannel>,
		window: Arc<dyn Window>,
	) -> Self {
		Self {
			datastore,
			persistence_key: persistence_key.to_owned(),
			project_id: project_id.to_owned(),
			database_id: None,
			allow_tab_synchronization: true,
			network_enabled: true,
			in_foreground: true,
			side,
			window,
		}
	}
}

/// Coordinates the clients sharing one on-disk database, electing a
/// unique primary among them.
///
/// Clients coordinate only through the shared transactional store and the
/// synchronous side channel; there is no dedicated server and no reliable
/// interprocess signalling. The primary role is a time-bounded lease: it
/// is extended by every primary transaction and heartbeat, claimed by an
/// eligible peer once it goes stale, and handed over deliberately when a
/// better suited peer appears.
#[non_exhaustive]
pub struct Coordinator {
	// A self-reference handed to spawned tasks and window listeners
	myself: Weak<Coordinator>,
	// The shared datastore for this database
	ds: Arc<Datastore>,
	// The stable identifier for this client, unique per instance
	id: Uuid,
	// The storage prefix shared by every client of this database
	prefix: String,
	// Whether this client opts into shared multi-client access
	allow_tab_synchronization: bool,
	// The queue serialising all coordinator-initiated operations
	pub(crate) queue: AsyncQueue,
	// The synchronous side channel used for zombie markers
	side: Arc<dyn SideChannel>,
	// The source of visibility and unload events
	window: Arc<dyn Window>,
	// The mutable local state of the lease state machine
	state: Mutex<LocalState>,
	// The registered primary state listener, if any
	listener: Mutex<Option<PrimaryStateListener>>,
	// The highest document change id this client has processed
	cursor: AtomicU64,
	// The handle for the scheduled metadata refresher tick
	refresher: Mutex<Option<DelayedTask>>,
	// The attached window listeners, detached again on shutdown
	observers: Mutex<Vec<ListenerId>>,
	// When the last garbage collection pass ran
	last_gc: Mutex<Option<Timestamp>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	match mutex.lock() {
		Ok(guard) => guard,
		Err(poisoned) => poisoned.into_inner(),
	}
}

impl Coordinator {
	/// Creates a new coordinator for one client of a shared database.
	pub fn new(options: CoordinatorOptions) -> Arc<Coordinator> {
		let id = Uuid::new_v4();
		let prefix = storage_prefix(
			&options.persistence_key,
			&options.project_id,
			options.database_id.as_deref(),
		);
		debug!(target: TARGET, "Created client {} for {}", id, prefix);
		Arc::new_cyclic(|myself| Coordinator {
			myself: myself.clone(),
			ds: options.datastore,
			id,
			prefix,
			allow_tab_synchronization: options.allow_tab_synchronization,
			queue: AsyncQueue::new(),
			side: options.side,
			window: options.window,
			state: Mutex::new(LocalState {
				state: State::Starting,
				is_primary: false,
				network_enabled: options.network_enabled,
				in_foreground: options.in_foreground,
				started: false,
				error: None,
			}),
			listener: Mutex::new(None),
			cursor: AtomicU64::new(0),
			refresher: Mutex::new(None),
			observers: Mutex::new(Vec::new()),
			last_gc: Mutex::new(None),
		})
	}

	/// The stable identifier of this client.
	pub fn client_id(&self) -> Uuid {
		self.id
	}

	/// Whether this client currently believes it is primary.
	pub fn is_primary(&self) -> bool {
		lock(&self.state).is_primary
	}

	/// Whether this coordinator has been started and not yet shut down.
	pub fn started(&self) -> bool {
		lock(&self.state).started
	}

	/// The current lifecycle state of this coordinator.
	pub fn state(&self) -> State {
		lock(&self.state).state
	}

	/// Starts this client: attaches the visibility and unload observers,
	/// runs the first heartbeat, and schedules the periodic refresher.
	#[instrument(err, level = "debug", target = "tabdb::core::dbs::coordinator", skip(self))]
	pub async fn start(&self) -> Result<(), Error> {
		{
			let mut st = lock(&self.state);
			if st.started {
				return Ok(());
			}
			if let Some(message) = st.error.clone() {
				return Err(Error::Ds(message));
			}
			// A stopped coordinator can not be restarted
			if matches!(st.state, State::Stopped) {
				return Err(Error::Internal("The client was already shut down".to_owned()));
			}
			st.state = State::Starting;
			st.started = true;
		}
		info!(target: TARGET, "Starting client {}", self.id);
		// Attach the visibility and unload observers
		let weak = self.myself.clone();
		let visibility = self.window.on_visibility_changed(Box::new(move |in_foreground| {
			if let Some(this) = weak.upgrade() {
				this.visibility_changed(in_foreground);
			}
		}));
		let weak = self.myself.clone();
		let unload = self.window.on_unload(Box::new(move || {
			if let Some(this) = weak.upgrade() {
				this.unload();
			}
		}));
		{
			let mut observers = lock(&self.observers);
			observers.push(visibility);
			observers.push(unload);
		}
		// Run the first heartbeat, surfacing startup failures to the caller
		if let Err(e) = self.update_metadata_and_try_become_primary().await {
			error!(target: TARGET, "Unable to start client {}: {}", self.id, e);
			// Release every resource acquired so far
			self.detach_observers();
			let mut st = lock(&self.state);
			st.started = false;
			st.state = State::Failed;
			if let Error::Ds(message) = &e {
				st.error = Some(message.clone());
			}
			return Err(e);
		}
		// Schedule the periodic metadata refresher
		self.schedule_refresh();
		Ok(())
	}

	/// Stops this client, releasing the lease and removing its metadata.
	///
	/// This is idempotent, and is also enqueued automatically when the
	/// window reports an unload.
	#[instrument(err, level = "debug", target = "tabdb::core::dbs::coordinator", skip(self))]
	pub async fn shutdown(&self, delete_data: bool) -> Result<(), Error> {
		{
			let mut st = lock(&self.state);
			if matches!(st.state, State::Stopped) {
				return Ok(());
			}
			st.started = false;
			st.state = State::Stopped;
		}
		info!(target: TARGET, "Stopping client {}", self.id);
		// Mark this client as terminated before touching shared state
		self.write_zombie_marker();
		// Stop the periodic refresher
		if let Some(task) = lock(&self.refresher).take() {
			task.cancel();
		}
		// Detach the visibility and unload observers
		self.detach_observers();
		// Release the lease and remove our own metadata record
		let mut tx = self.ds.transaction(TransactionType::Write, CLIENT_STATE_STORES).await?;
		catch!(tx, self.release_lease_if_held(&mut tx).await);
		catch!(tx, tx.del_client(self.id).await);
		tx.commit().await?;
		// Stop accepting coordinator work
		self.queue.close();
		// The metadata record is gone, so the zombie marker may follow
		let key = zombie_key(&self.prefix, self.id);
		if let Err(e) = self.side.remove(&key) {
			warn!(target: TARGET, "Unable to remove a zombie marker: {}", e);
		}
		// Remove the underlying data if requested
		if delete_data {
			info!(target: TARGET, "Deleting all data for {}", self.prefix);
			self.ds.clear().await?;
		}
		Ok(())
	}

	/// Updates the network state of this client, scheduling an immediate
	/// lease re-evaluation if the state changed.
	pub fn set_network_enabled(&self, network_enabled: bool) {
		{
			let mut st = lock(&self.state);
			if st.network_enabled == network_enabled {
				return;
			}
			st.network_enabled = network_enabled;
		}
		debug!(target: TARGET, "Client {} network enabled: {}", self.id, network_enabled);
		self.schedule_lease_reevaluation();
	}

	/// Registers the listener notified of primary state transitions.
	///
	/// The listener is invoked once on registration with the current value.
	pub async fn set_primary_state_listener(&self, listener: PrimaryStateListener) {
		*lock(&self.listener) = Some(listener.clone());
		let is_primary = self.is_primary();
		self.queue.enqueue_and_forget(async move {
			listener(is_primary).await;
		});
	}

	/// Advances the change log cursor of this client. The cursor is
	/// persisted with the next heartbeat and bounds change log truncation.
	pub fn note_processed_change(&self, change_id: u64) {
		self.cursor.fetch_max(change_id, Ordering::SeqCst);
	}

	/// Returns the ids of every active, non-zombied client.
	pub async fn get_active_clients(&self) -> Result<Vec<Uuid>, Error> {
		let mut tx = self.ds.transaction(TransactionType::Read, CLIENT_STATE_STORES).await?;
		let now = tx.clock().await;
		let clients = catch!(tx, tx.scan_cl(*SCAN_BATCH_SIZE).await);
		tx.cancel().await?;
		Ok(clients
			.iter()
			.filter(|client| self.is_active_client(client, now))
			.map(|client| client.client_id)
			.collect())
	}

	/// The staged mutation queue for this database.
	pub fn mutation_queue(&self) -> Result<MutationQueue, Error> {
		self.ensure_started()?;
		Ok(MutationQueue::new())
	}

	/// The query target cache for this database.
	pub fn query_cache(&self) -> Result<QueryCache, Error> {
		self.ensure_started()?;
		Ok(QueryCache::new())
	}

	/// The remote document cache for this database.
	pub fn remote_document_cache(&self) -> Result<RemoteDocumentCache, Error> {
		self.ensure_started()?;
		Ok(RemoteDocumentCache::new())
	}

	/// Runs a body within one read-write transaction over every object
	/// store, enforcing the primary lease requirement.
	///
	/// When the primary role is required, the lease is verified before the
	/// body and extended after it, within the same transaction, so the
	/// stored lease timestamp covers long-running work. When it is not,
	/// the transaction still verifies that no exclusive peer holds the
	/// lease.
	#[instrument(level = "trace", target = "tabdb::core::dbs::coordinator", skip(self, body))]
	pub async fn run_transaction<T, F>(
		&self,
		action: &str,
		require_primary: bool,
		body: F,
	) -> Result<T, Error>
	where
		F: for<'a> FnOnce(&'a mut Transaction) -> TxFuture<'a, T>,
	{
		// Reject immediately when the datastore failed at startup
		if let Some(message) = lock(&self.state).error.clone() {
			return Err(Error::Ds(message));
		}
		trace!(target: TARGET, "Starting transaction {}", action);
		// Caller transactions open every object store read-write
		let mut tx = self.ds.transaction(TransactionType::Write, ALL_STORES).await?;
		if require_primary {
			let can = catch!(tx, self.can_act_as_primary(&mut tx).await);
			if !can {
				info!(target: TARGET, "Failing transaction {} as the primary lease was lost", action);
				let _ = tx.cancel().await;
				self.set_is_primary(false);
				self.notify_primary_state(false);
				return Err(Error::PrimaryLeaseLost);
			}
			let result = catch!(tx, body(&mut tx).await);
			// Extend the lease after the body so the stored timestamp
			// reflects actual completion
			catch!(tx, self.acquire_or_extend_lease(&mut tx).await);
			tx.commit().await?;
			Ok(result)
		} else {
			catch!(tx, self.verify_allow_tab_synchronization(&mut tx).await);
			run!(tx, body(&mut tx).await)
		}
	}

	/// Rewrites this client's metadata record and re-evaluates the lease,
	/// in one transaction. Primary state transitions are announced to the
	/// registered listener outside the transaction.
	pub(crate) async fn update_metadata_and_try_become_primary(&self) -> Result<(), Error> {
		let (network_enabled, in_foreground, was_primary) = {
			let st = lock(&self.state);
			(st.network_enabled, st.in_foreground, st.is_primary)
		};
		let cursor = self.cursor.load(Ordering::SeqCst);
		let mut tx = self.ds.transaction(TransactionType::Write, CLIENT_STATE_STORES).await?;
		// Write this client's heartbeat
		let now = tx.clock().await;
		let client =
			ClientMetadata::new(self.id, now, network_enabled, in_foreground, cursor);
		catch!(tx, tx.set_client(&client).await);
		// Re-evaluate lease eligibility within the same transaction
		let can = catch!(tx, self.can_act_as_primary(&mut tx).await);
		if was_primary && !can {
			catch!(tx, self.release_lease_if_held(&mut tx).await);
		} else if can {
			catch!(tx, self.acquire_or_extend_lease(&mut tx).await);
		}
		tx.commit().await?;
		// Apply and announce the outcome outside the transaction. The
		// lease release above already lowered the local primary bit, so
		// transitions are detected against the state on entry
		self.set_is_primary(can);
		if was_primary != can {
			debug!(
				target: TARGET,
				"Client {} is now {}",
				self.id,
				if can {
					"primary"
				} else {
					"secondary"
				}
			);
			self.notify_primary_state(can);
		}
		Ok(())
	}

	/// Evaluates whether this client may hold the primary lease, within an
	/// active transaction.
	async fn can_act_as_primary(&self, tx: &mut Transaction) -> Result<bool, Error> {
		let (network_enabled, in_foreground) = {
			let st = lock(&self.state);
			(st.network_enabled, st.in_foreground)
		};
		let now = tx.clock().await;
		// Check the state of the current lease holder
		if let Some(primary) = tx.get_primary().await? {
			let lease_valid = self.is_within_age(primary.lease_timestamp, now, PRIMARY_LEASE_MAX_AGE_MS)
				&& !self.is_client_zombied(primary.owner_id);
			if lease_valid {
				if primary.owner_id != self.id {
					// A valid remote holder must have opted into shared access
					if !primary.allow_tab_synchronization {
						return Err(Error::PrimaryLeaseExclusive);
					}
					return Ok(false);
				}
				// The local holder keeps the lease while its network is
				// enabled and no peer is better suited
				if network_enabled
					&& !self.preferred_peer_exists(tx, now, network_enabled, in_foreground).await?
				{
					return Ok(true);
				}
			}
		}
		// The lease is stale or surrendered. A networked, foregrounded
		// client may claim it outright
		if network_enabled && in_foreground {
			return Ok(true);
		}
		// Otherwise defer to any better suited active peer
		Ok(!self.preferred_peer_exists(tx, now, network_enabled, in_foreground).await?)
	}

	/// Whether an active peer is better suited for the primary role than
	/// this client. Ties are broken in favour of this client.
	async fn preferred_peer_exists(
		&self,
		tx: &mut Transaction,
		now: Timestamp,
		network_enabled: bool,
		in_foreground: bool,
	) -> Result<bool, Error> {
		let clients = tx.scan_cl(*SCAN_BATCH_SIZE).await?;
		Ok(clients.iter().any(|peer| {
			if peer.client_id == self.id {
				return false;
			}
			if !self.is_active_client(peer, now) {
				return false;
			}
			(peer.network_enabled && !network_enabled)
				|| (peer.in_foreground
					&& !in_foreground
					&& peer.network_enabled == network_enabled)
		}))
	}

	/// Writes a fresh lease for this client. Callers must have verified
	/// eligibility within the same transaction.
	async fn acquire_or_extend_lease(&self, tx: &mut Transaction) -> Result<(), Error> {
		let now = tx.clock().await;
		trace!(target: TARGET, "Extending the primary lease for client {}", self.id);
		tx.set_primary(&PrimaryClient::new(self.id, now, self.allow_tab_synchronization)).await
	}

	/// Deletes the lease record if this client holds it. The local client
	/// is marked non-primary either way.
	async fn release_lease_if_held(&self, tx: &mut Transaction) -> Result<(), Error> {
		self.set_is_primary(false);
		if let Some(primary) = tx.get_primary().await? {
			if primary.owner_id == self.id {
				trace!(target: TARGET, "Releasing the primary lease for client {}", self.id);
				tx.del_primary().await?;
			}
		}
		Ok(())
	}

	/// Fails when a valid remote leaseholder has not opted into shared
	/// multi-client access.
	async fn verify_allow_tab_synchronization(&self, tx: &mut Transaction) -> Result<(), Error> {
		let now = tx.clock().await;
		if let Some(primary) = tx.get_primary().await? {
			let lease_valid = self.is_within_age(primary.lease_timestamp, now, PRIMARY_LEASE_MAX_AGE_MS)
				&& !self.is_client_zombied(primary.owner_id);
			if lease_valid && primary.owner_id != self.id && !primary.allow_tab_synchronization {
				return Err(Error::PrimaryLeaseExclusive);
			}
		}
		Ok(())
	}

	/// One tick of the metadata refresher. Errors are logged and dropped;
	/// the refresher always reschedules itself while the client runs.
	pub(crate) async fn run_refresh(&self) {
		if !self.started() {
			return;
		}
		if let Err(e) = self.update_metadata_and_try_become_primary().await {
			match e {
				Error::PrimaryLeaseExclusive => {
					warn!(target: TARGET, "Deferring to an exclusive primary client: {}", e)
				}
				e => error!(target: TARGET, "Unable to refresh client metadata: {}", e),
			}
		}
		if let Err(e) = self.maybe_garbage_collect_multi_client_state().await {
			error!(target: TARGET, "Unable to garbage collect client state: {}", e);
		}
		self.schedule_refresh();
	}

	/// Collects the state of inactive peers, at most once per threshold
	/// period, and only while this client is primary.
	pub(crate) async fn maybe_garbage_collect_multi_client_state(&self) -> Result<(), Error> {
		// Only the primary collects shared client state
		if !self.is_primary() {
			return Ok(());
		}
		let now = self.ds.clock_now().await;
		{
			let mut last = lock(&self.last_gc);
			if let Some(previous) = *last {
				if now.value.saturating_sub(previous.value)
					< CLIENT_STATE_GARBAGE_COLLECTION_THRESHOLD_MS
				{
					return Ok(());
				}
			}
			*last = Some(now);
		}
		debug!(target: TARGET, "Garbage collecting inactive client state");
		let mut tx = self.ds.transaction(TransactionType::Write, GC_STORES).await?;
		let clients = catch!(tx, tx.scan_cl(*SCAN_BATCH_SIZE).await);
		// Partition the clients by metadata age and zombie markers
		let (active, inactive): (Vec<ClientMetadata>, Vec<ClientMetadata>) =
			clients.into_iter().partition(|client| {
				client.update_time.within_age(now, CLIENT_STATE_GARBAGE_COLLECTION_THRESHOLD_MS)
					&& !self.is_client_zombied(client.client_id)
			});
		// Remove the metadata records of inactive clients
		for client in inactive.iter() {
			trace!(target: TARGET, "Deleting inactive client {}", client.client_id);
			catch!(tx, tx.del_client(client.client_id).await);
		}
		// Truncate the change log up to the oldest cursor still needed by
		// an active peer. With no active peers there is no bound to apply
		let oldest = active
			.iter()
			.filter(|client| client.client_id != self.id)
			.map(|client| client.last_processed_change_id)
			.min();
		if let Some(watermark) = oldest {
			catch!(tx, cf::gc::truncate_through(&mut tx, watermark).await);
		}
		tx.commit().await?;
		// Remove side channel markers only after the on-disk state is
		// gone, so a zombied client can not be revived
		for client in inactive.iter() {
			let key = zombie_key(&self.prefix, client.client_id);
			if let Err(e) = self.side.remove(&key) {
				warn!(target: TARGET, "Unable to remove a zombie marker: {}", e);
			}
		}
		Ok(())
	}

	/// Handles a visibility transition reported by the window.
	pub(crate) fn visibility_changed(&self, in_foreground: bool) {
		trace!(target: TARGET, "Client {} visibility changed: {}", self.id, in_foreground);
		lock(&self.state).in_foreground = in_foreground;
		self.schedule_lease_reevaluation();
	}

	/// Handles imminent process termination reported by the window.
	///
	/// The zombie marker write is synchronous and mandatory; the graceful
	/// shutdown behind it may not complete before the process dies.
	pub(crate) fn unload(&self) {
		info!(target: TARGET, "Client {} is unloading", self.id);
		self.write_zombie_marker();
		let Some(this) = self.myself.upgrade() else {
			return;
		};
		self.queue.enqueue_and_forget(async move {
			if let Err(e) = this.shutdown(false).await {
				error!(target: TARGET, "Unable to shut down cleanly on unload: {}", e);
			}
		});
	}

	fn schedule_lease_reevaluation(&self) {
		let Some(this) = self.myself.upgrade() else {
			return;
		};
		self.queue.enqueue_and_forget(async move {
			if !this.started() {
				return;
			}
			if let Err(e) = this.update_metadata_and_try_become_primary().await {
				match e {
					Error::PrimaryLeaseExclusive => {
						warn!(target: TARGET, "Deferring to an exclusive primary client: {}", e)
					}
					e => error!(target: TARGET, "Unable to re-evaluate the primary lease: {}", e),
				}
			}
		});
	}

	fn schedule_refresh(&self) {
		let this = self.myself.clone();
		let task = self.queue.enqueue_after(
			TimerId::ClientMetadataRefresh,
			Duration::from_millis(CLIENT_METADATA_REFRESH_INTERVAL_MS),
			async move {
				if let Some(this) = this.upgrade() {
					this.run_refresh().await;
				}
			},
		);
		*lock(&self.refresher) = Some(task);
	}

	fn detach_observers(&self) {
		for id in lock(&self.observers).drain(..) {
			self.window.detach(id);
		}
	}

	fn write_zombie_marker(&self) {
		let key = zombie_key(&self.prefix, self.id);
		let value = SystemClock::new().now().value.to_string();
		if let Err(e) = self.side.set(&key, &value) {
			warn!(target: TARGET, "Unable to write a zombie marker: {}", e);
		}
	}

	fn is_client_zombied(&self, client: Uuid) -> bool {
		let key = zombie_key(&self.prefix, client);
		match self.side.get(&key) {
			Ok(marker) => marker.is_some(),
			Err(e) => {
				// Degrade to "not zombied", preserving liveness
				warn!(target: TARGET, "Unable to read a zombie marker: {}", e);
				false
			}
		}
	}

	fn is_active_client(&self, client: &ClientMetadata, now: Timestamp) -> bool {
		self.is_within_age(client.update_time, now, CLIENT_METADATA_MAX_AGE_MS)
			&& !self.is_client_zombied(client.client_id)
	}

	fn is_within_age(&self, ts: Timestamp, now: Timestamp, max_age_ms: u64) -> bool {
		if ts.is_future(now) {
			warn!(
				target: TARGET,
				"Ignoring a timestamp {}ms ahead of the local clock",
				ts.value - now.value
			);
			return false;
		}
		ts.within_age(now, max_age_ms)
	}

	fn set_is_primary(&self, is_primary: bool) {
		let mut st = lock(&self.state);
		st.is_primary = is_primary;
		if matches!(st.state, State::Starting | State::Primary | State::Secondary) {
			st.state = if is_primary {
				State::Primary
			} else {
				State::Secondary
			};
		}
	}

	fn notify_primary_state(&self, is_primary: bool) {
		if !self.started() {
			return;
		}
		let listener = lock(&self.listener).clone();
		if let Some(listener) = listener {
			self.queue.enqueue_and_forget(async move {
				listener(is_primary).await;
			});
		}
	}

	fn ensure_started(&self) -> Result<(), Error> {
		if self.started() {
			Ok(())
		} else {
			Err(Error::NotStarted)
		}
	}
}
