use std::fmt;
use std::sync::Arc;

use crate::dbs::client::Timestamp;
use crate::err::Error;
use crate::kvs::clock::{SizedClock, SystemClock};
use crate::kvs::{ObjectStore, TransactionType, TxFuture, ALL_STORES};

use super::tx::Transaction;

const TARGET: &str = "tabdb::core::kvs::ds";

/// The underlying datastore instance which stores the dataset.
///
/// One datastore is shared by every client of the same database within a
/// process, the same way browser tabs share a single on-disk database.
#[non_exhaustive]
pub struct Datastore {
	// The inner datastore type
	inner: Inner,
	// Clock for tracking time. It is read only and accessible to all transactions.
	clock: Arc<SizedClock>,
}

pub(super) enum Inner {
	#[cfg(feature = "kv-mem")]
	Mem(super::mem::Datastore),
	#[cfg(feature = "kv-indxdb")]
	IndxDB(super::indxdb::Datastore),
}

impl fmt::Display for Datastore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		#![allow(unused_variables)]
		match &self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(_) => write!(f, "memory"),
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(_) => write!(f, "indxdb"),
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}
}

impl Datastore {
	/// Creates a new datastore instance.
	///
	/// # Examples
	///
	/// ```rust,no_run
	/// # use tabdb_core::kvs::Datastore;
	/// # use tabdb_core::err::Error;
	/// # #[tokio::main]
	/// # async fn main() -> Result<(), Error> {
	/// let ds = Datastore::new("memory").await?;
	/// # Ok(())
	/// # }
	/// ```
	///
	/// Or to open a browser IndexedDB-backed store:
	///
	/// ```rust,no_run
	/// # use tabdb_core::kvs::Datastore;
	/// # use tabdb_core::err::Error;
	/// # #[tokio::main]
	/// # async fn main() -> Result<(), Error> {
	/// let ds = Datastore::new("indxdb:app").await?;
	/// # Ok(())
	/// # }
	/// ```
	pub async fn new(path: &str) -> Result<Datastore, Error> {
		Self::new_with_clock(path, None).await
	}

	/// Creates a new datastore instance with a specific clock.
	#[doc(hidden)]
	pub async fn new_with_clock(
		path: &str,
		clock: Option<Arc<SizedClock>>,
	) -> Result<Datastore, Error> {
		// Initiate the desired datastore
		let inner = match path {
			"memory" => {
				#[cfg(feature = "kv-mem")]
				{
					info!(target: TARGET, "Starting kvs store in {}", path);
					let v = super::mem::Datastore::new().await.map(Inner::Mem)?;
					info!(target: TARGET, "Started kvs store in {}", path);
					v
				}
				#[cfg(not(feature = "kv-mem"))]
				return Err(Error::Ds("Cannot connect to the `memory` storage engine as it is not enabled in this build of TabDB".to_owned()));
			}
			// Parse and initiate an IndxDB database
			s if s.starts_with("indxdb:") => {
				#[cfg(feature = "kv-indxdb")]
				{
					info!(target: TARGET, "Starting kvs store at {}", path);
					let s = s.trim_start_matches("indxdb://");
					let s = s.trim_start_matches("indxdb:");
					let v = super::indxdb::Datastore::new(s).await.map(Inner::IndxDB)?;
					info!(target: TARGET, "Started kvs store at {}", path);
					v
				}
				#[cfg(not(feature = "kv-indxdb"))]
				return Err(Error::Ds("Cannot connect to the `indxdb` storage engine as it is not enabled in this build of TabDB".to_owned()));
			}
			// The datastore path is not valid
			_ => {
				info!(target: TARGET, "Unable to load the specified datastore {}", path);
				return Err(Error::Ds("Unable to load the specified datastore".into()));
			}
		};
		// Set the default clock if none was provided
		let clock = clock.unwrap_or_else(|| Arc::new(SizedClock::System(SystemClock::new())));
		Ok(Datastore {
			inner,
			clock,
		})
	}

	/// Opens a datastore, creating or upgrading its schema as needed.
	///
	/// The upgrader is supplied by the embedding layer and runs within one
	/// write transaction whenever the stored schema version is behind the
	/// requested version. This should be invoked once per database.
	pub async fn open_or_create<F>(path: &str, version: u32, upgrade: F) -> Result<Datastore, Error>
	where
		F: for<'a> FnOnce(&'a mut Transaction, u32, u32) -> TxFuture<'a, ()>,
	{
		let ds = Self::new(path).await?;
		ds.ensure_schema(version, upgrade).await?;
		Ok(ds)
	}

	/// Checks the stored schema version, running the upgrader if needed.
	pub async fn ensure_schema<F>(&self, version: u32, upgrade: F) -> Result<(), Error>
	where
		F: for<'a> FnOnce(&'a mut Transaction, u32, u32) -> TxFuture<'a, ()>,
	{
		let mut tx = self.transaction(TransactionType::Write, ALL_STORES).await?;
		let current = catch!(tx, tx.get_version().await).unwrap_or(0);
		// Refuse to open a database written by a newer schema
		if current > version {
			let _ = tx.cancel().await;
			return Err(Error::Ds(format!(
				"Unable to open a datastore with schema version {} using the older schema version {}",
				current, version
			)));
		}
		// Nothing to do when the schema is current
		if current == version {
			return tx.cancel().await;
		}
		debug!(target: TARGET, "Upgrading datastore schema from version {} to {}", current, version);
		catch!(tx, upgrade(&mut tx, current, version).await);
		catch!(tx, tx.set_version(version).await);
		tx.commit().await
	}

	/// Retrieve the current timestamp from the datastore clock.
	pub async fn clock_now(&self) -> Timestamp {
		self.clock.now().await
	}

	/// Start a new transaction over a set of object stores.
	#[instrument(level = "trace", target = "tabdb::core::kvs::ds", skip(self))]
	pub async fn transaction(
		&self,
		write: TransactionType,
		scope: &'static [ObjectStore],
	) -> Result<Transaction, Error> {
		let write = matches!(write, TransactionType::Write);
		let inner = match &self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => {
				let tx = v.transaction(write).await?;
				super::tx::Inner::Mem(tx)
			}
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => {
				let tx = v.transaction(write).await?;
				super::tx::Inner::IndxDB(tx)
			}
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		};
		Ok(Transaction {
			inner,
			scope,
			clock: self.clock.clone(),
		})
	}

	/// Run a body within one read-only transaction.
	///
	/// The transaction is always cancelled once the body completes, and any
	/// error from the body propagates to the caller unchanged.
	pub async fn run_read_only<T, F>(
		&self,
		scope: &'static [ObjectStore],
		body: F,
	) -> Result<T, Error>
	where
		F: for<'a> FnOnce(&'a mut Transaction) -> TxFuture<'a, T>,
	{
		let mut tx = self.transaction(TransactionType::Read, scope).await?;
		let res = catch!(tx, body(&mut tx).await);
		tx.cancel().await?;
		Ok(res)
	}

	/// Run a body within one read-write transaction.
	///
	/// The transaction commits when the body succeeds and is cancelled when
	/// the body fails; errors propagate to the caller unchanged.
	pub async fn run_read_write<T, F>(
		&self,
		scope: &'static [ObjectStore],
		body: F,
	) -> Result<T, Error>
	where
		F: for<'a> FnOnce(&'a mut Transaction) -> TxFuture<'a, T>,
	{
		let mut tx = self.transaction(TransactionType::Write, scope).await?;
		run!(tx, body(&mut tx).await)
	}

	/// Delete every record in the datastore.
	pub async fn clear(&self) -> Result<(), Error> {
		let mut tx = self.transaction(TransactionType::Write, ALL_STORES).await?;
		run!(tx, tx.delr(vec![0x00]..vec![0xff], *crate::cnf::SCAN_BATCH_SIZE).await)
	}
}
