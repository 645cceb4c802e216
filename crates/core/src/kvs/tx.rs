use std::ops::Range;
use std::sync::Arc;

use uuid::Uuid;

use crate::cf::ChangeEntry;
use crate::dbs::client::{ClientMetadata, PrimaryClient, Timestamp};
use crate::doc::{DocRecord, MutationBatch, TargetRecord};
use crate::err::Error;
use crate::key::sq::Sequence;
use crate::kvs::clock::SizedClock;
use crate::kvs::{from_val, to_val};
use crate::kvs::{Key, ObjectStore, Val};

use super::api::Transaction as _;

/// A set of updates and requests against the database keyspace.
///
/// A transaction is opened over a set of object stores, and the typed
/// accessors verify that the store they touch is within that scope.
#[non_exhaustive]
pub struct Transaction {
	pub(super) inner: Inner,
	pub(super) scope: &'static [ObjectStore],
	pub(super) clock: Arc<SizedClock>,
}

pub(super) enum Inner {
	#[cfg(feature = "kv-mem")]
	Mem(super::mem::Transaction),
	#[cfg(feature = "kv-indxdb")]
	IndxDB(super::indxdb::Transaction),
}

impl Transaction {
	/// Check if this transaction is finished.
	pub fn closed(&self) -> bool {
		#![allow(unused_variables)]
		match &self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.closed(),
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => v.closed(),
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	/// Cancel this transaction.
	pub async fn cancel(&mut self) -> Result<(), Error> {
		match &mut self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.cancel().await,
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => v.cancel().await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	/// Commit this transaction.
	pub async fn commit(&mut self) -> Result<(), Error> {
		match &mut self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.commit().await,
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => v.commit().await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	/// Fetch a key from the database.
	pub async fn get(&mut self, key: Key) -> Result<Option<Val>, Error> {
		match &mut self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.get(key).await,
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => v.get(key).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	/// Insert or update a key in the database.
	pub async fn set(&mut self, key: Key, val: Val) -> Result<(), Error> {
		match &mut self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.set(key, val).await,
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => v.set(key, val).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	/// Delete a key from the database.
	pub async fn del(&mut self, key: Key) -> Result<(), Error> {
		match &mut self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.del(key).await,
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => v.del(key).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	/// Retrieve a range of keys from the database.
	pub async fn keys(&mut self, rng: Range<Key>, limit: u32) -> Result<Vec<Key>, Error> {
		match &mut self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.keys(rng, limit).await,
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => v.keys(rng, limit).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	/// Retrieve a range of key-value pairs from the database.
	pub async fn scan(&mut self, rng: Range<Key>, limit: u32) -> Result<Vec<(Key, Val)>, Error> {
		match &mut self.inner {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.scan(rng, limit).await,
			#[cfg(feature = "kv-indxdb")]
			Inner::IndxDB(v) => v.scan(rng, limit).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	/// Delete a range of keys from the database, in batches.
	pub async fn delr(&mut self, rng: Range<Key>, batch: u32) -> Result<(), Error> {
		let mut beg = rng.start;
		loop {
			// Fetch the next batch of keys
			let keys = self.keys(beg..rng.end.clone(), batch).await?;
			let Some(last) = keys.last().cloned() else {
				break;
			};
			let exhausted = (keys.len() as u32) < batch;
			// Delete the batch
			for key in keys {
				self.del(key).await?;
			}
			if exhausted {
				break;
			}
			// Continue from after the last deleted key
			beg = last;
			beg.push(0x00);
		}
		Ok(())
	}

	/// Retrieve the current timestamp from the datastore clock.
	///
	/// Monotonicity is not guaranteed across clients; timestamps are used
	/// for unreliable ordering of events and handling of timeouts.
	pub async fn clock(&self) -> Timestamp {
		self.clock.now().await
	}

	/// Check that an object store is within the scope of this transaction.
	fn check_scope(&self, store: ObjectStore) -> Result<(), Error> {
		if self.scope.contains(&store) {
			Ok(())
		} else {
			Err(Error::TxStoreScope(store))
		}
	}

	// --------------------------------------------------
	// Schema version
	// --------------------------------------------------

	/// Retrieve the stored schema version, if any.
	pub async fn get_version(&mut self) -> Result<Option<u32>, Error> {
		self.check_scope(ObjectStore::Meta)?;
		let val = self.get(crate::key::vn::new().encode()).await?;
		match val {
			Some(v) => Ok(Some(from_val(&v)?)),
			None => Ok(None),
		}
	}

	/// Stamp the schema version.
	pub async fn set_version(&mut self, version: u32) -> Result<(), Error> {
		self.check_scope(ObjectStore::Meta)?;
		self.set(crate::key::vn::new().encode(), to_val(&version)?).await
	}

	// --------------------------------------------------
	// Client metadata
	// --------------------------------------------------

	/// Retrieve the metadata record for a client.
	pub async fn get_client(&mut self, id: Uuid) -> Result<Option<ClientMetadata>, Error> {
		self.check_scope(ObjectStore::ClientMetadata)?;
		let val = self.get(crate::key::cl::new(id).encode()).await?;
		match val {
			Some(v) => Ok(Some(from_val(&v)?)),
			None => Ok(None),
		}
	}

	/// Insert or update the metadata record for a client.
	///
	/// Only the owning client writes its own record; the garbage collector
	/// may delete the records of inactive peers.
	pub async fn set_client(&mut self, client: &ClientMetadata) -> Result<(), Error> {
		self.check_scope(ObjectStore::ClientMetadata)?;
		self.set(crate::key::cl::new(client.client_id).encode(), to_val(client)?).await
	}

	/// Delete the metadata record for a client.
	pub async fn del_client(&mut self, id: Uuid) -> Result<(), Error> {
		self.check_scope(ObjectStore::ClientMetadata)?;
		self.del(crate::key::cl::new(id).encode()).await
	}

	/// Scan the metadata records of every client.
	pub async fn scan_cl(&mut self, batch: u32) -> Result<Vec<ClientMetadata>, Error> {
		self.check_scope(ObjectStore::ClientMetadata)?;
		let beg = crate::key::cl::prefix();
		let end = crate::key::cl::suffix();
		let mut out: Vec<ClientMetadata> = vec![];
		let mut next = Some(beg);
		while let Some(beg) = next {
			let res = self.scan(beg..end.clone(), batch).await?;
			next = match res.last() {
				Some((k, _)) if res.len() as u32 == batch => {
					let mut k = k.clone();
					k.push(0x00);
					Some(k)
				}
				_ => None,
			};
			for (_, v) in res.into_iter() {
				out.push(from_val(&v)?);
			}
		}
		Ok(out)
	}

	// --------------------------------------------------
	// Primary lease
	// --------------------------------------------------

	/// Retrieve the primary lease record, if any.
	pub async fn get_primary(&mut self) -> Result<Option<PrimaryClient>, Error> {
		self.check_scope(ObjectStore::PrimaryClient)?;
		let val = self.get(crate::key::pc::new().encode()).await?;
		match val {
			Some(v) => Ok(Some(from_val(&v)?)),
			None => Ok(None),
		}
	}

	/// Write the primary lease record.
	///
	/// Only write when lease eligibility has just been verified within this
	/// same transaction.
	pub async fn set_primary(&mut self, primary: &PrimaryClient) -> Result<(), Error> {
		self.check_scope(ObjectStore::PrimaryClient)?;
		self.set(crate::key::pc::new().encode(), to_val(primary)?).await
	}

	/// Delete the primary lease record.
	pub async fn del_primary(&mut self) -> Result<(), Error> {
		self.check_scope(ObjectStore::PrimaryClient)?;
		self.del(crate::key::pc::new().encode()).await
	}

	// --------------------------------------------------
	// Remote document change log
	// --------------------------------------------------

	/// Issue the next remote document change id.
	pub async fn next_change_id(&mut self) -> Result<u64, Error> {
		self.check_scope(ObjectStore::RemoteDocumentChangeLog)?;
		let key = crate::key::sq::new(Sequence::DocumentChange).encode();
		let next = match self.get(key.clone()).await? {
			Some(v) => from_val::<u64>(&v)? + 1,
			None => 1,
		};
		self.set(key, to_val(&next)?).await?;
		Ok(next)
	}

	/// Retrieve the most recently issued remote document change id.
	pub async fn current_change_id(&mut self) -> Result<u64, Error> {
		self.check_scope(ObjectStore::RemoteDocumentChangeLog)?;
		let key = crate::key::sq::new(Sequence::DocumentChange).encode();
		match self.get(key).await? {
			Some(v) => from_val(&v),
			None => Ok(0),
		}
	}

	/// Append an entry to the remote document change log.
	pub async fn put_change(&mut self, entry: &ChangeEntry) -> Result<(), Error> {
		self.check_scope(ObjectStore::RemoteDocumentChangeLog)?;
		self.set(crate::key::dc::new(entry.change_id).encode(), to_val(entry)?).await
	}

	/// Scan the change log entries after the given change id.
	pub async fn scan_dc(&mut self, after: u64, batch: u32) -> Result<Vec<ChangeEntry>, Error> {
		self.check_scope(ObjectStore::RemoteDocumentChangeLog)?;
		let beg = crate::key::dc::suffix(after);
		let end = crate::key::dc::suffix(u64::MAX);
		let mut out: Vec<ChangeEntry> = vec![];
		let mut next = Some(beg);
		while let Some(beg) = next {
			let res = self.scan(beg..end.clone(), batch).await?;
			next = match res.last() {
				Some((k, _)) if res.len() as u32 == batch => {
					let mut k = k.clone();
					k.push(0x00);
					Some(k)
				}
				_ => None,
			};
			for (_, v) in res.into_iter() {
				out.push(from_val(&v)?);
			}
		}
		Ok(out)
	}

	/// Delete every change log entry up to and including the given id.
	pub async fn delr_dc(&mut self, through: u64, batch: u32) -> Result<(), Error> {
		self.check_scope(ObjectStore::RemoteDocumentChangeLog)?;
		let beg = crate::key::dc::prefix();
		let end = crate::key::dc::suffix(through);
		self.delr(beg..end, batch).await
	}

	// --------------------------------------------------
	// Mutation queue
	// --------------------------------------------------

	/// Issue the next mutation batch id.
	pub async fn next_batch_id(&mut self) -> Result<u64, Error> {
		self.check_scope(ObjectStore::MutationQueue)?;
		let key = crate::key::sq::new(Sequence::MutationBatch).encode();
		let next = match self.get(key.clone()).await? {
			Some(v) => from_val::<u64>(&v)? + 1,
			None => 1,
		};
		self.set(key, to_val(&next)?).await?;
		Ok(next)
	}

	/// Stage a mutation batch.
	pub async fn put_batch(&mut self, batch: &MutationBatch) -> Result<(), Error> {
		self.check_scope(ObjectStore::MutationQueue)?;
		self.set(crate::key::mb::new(batch.batch_id).encode(), to_val(batch)?).await
	}

	/// Scan every staged mutation batch, in batch id order.
	pub async fn scan_mb(&mut self, batch: u32) -> Result<Vec<MutationBatch>, Error> {
		self.check_scope(ObjectStore::MutationQueue)?;
		let beg = crate::key::mb::prefix();
		let end = crate::key::mb::suffix(u64::MAX);
		let mut out: Vec<MutationBatch> = vec![];
		let mut next = Some(beg);
		while let Some(beg) = next {
			let res = self.scan(beg..end.clone(), batch).await?;
			next = match res.last() {
				Some((k, _)) if res.len() as u32 == batch => {
					let mut k = k.clone();
					k.push(0x00);
					Some(k)
				}
				_ => None,
			};
			for (_, v) in res.into_iter() {
				out.push(from_val(&v)?);
			}
		}
		Ok(out)
	}

	/// Delete every staged mutation batch up to and including the given id.
	pub async fn delr_mb(&mut self, through: u64, batch: u32) -> Result<(), Error> {
		self.check_scope(ObjectStore::MutationQueue)?;
		let beg = crate::key::mb::prefix();
		let end = crate::key::mb::suffix(through);
		self.delr(beg..end, batch).await
	}

	// --------------------------------------------------
	// Query cache
	// --------------------------------------------------

	/// Retrieve a cached query target.
	pub async fn get_target(&mut self, id: u32) -> Result<Option<TargetRecord>, Error> {
		self.check_scope(ObjectStore::QueryCache)?;
		let val = self.get(crate::key::qt::new(id).encode()).await?;
		match val {
			Some(v) => Ok(Some(from_val(&v)?)),
			None => Ok(None),
		}
	}

	/// Insert or update a cached query target.
	pub async fn set_target(&mut self, target: &TargetRecord) -> Result<(), Error> {
		self.check_scope(ObjectStore::QueryCache)?;
		self.set(crate::key::qt::new(target.target_id).encode(), to_val(target)?).await
	}

	/// Delete a cached query target.
	pub async fn del_target(&mut self, id: u32) -> Result<(), Error> {
		self.check_scope(ObjectStore::QueryCache)?;
		self.del(crate::key::qt::new(id).encode()).await
	}

	// --------------------------------------------------
	// Remote document cache
	// --------------------------------------------------

	/// Retrieve a remote document record.
	pub async fn get_doc(&mut self, doc_key: &str) -> Result<Option<DocRecord>, Error> {
		self.check_scope(ObjectStore::RemoteDocumentCache)?;
		let val = self.get(crate::key::rd::new(doc_key).encode()).await?;
		match val {
			Some(v) => Ok(Some(from_val(&v)?)),
			None => Ok(None),
		}
	}

	/// Insert or update a remote document record.
	pub async fn set_doc(&mut self, doc: &DocRecord) -> Result<(), Error> {
		self.check_scope(ObjectStore::RemoteDocumentCache)?;
		self.set(crate::key::rd::new(&doc.doc_key).encode(), to_val(doc)?).await
	}

	/// Delete a remote document record.
	pub async fn del_doc(&mut self, doc_key: &str) -> Result<(), Error> {
		self.check_scope(ObjectStore::RemoteDocumentCache)?;
		self.del(crate::key::rd::new(doc_key).encode()).await
	}
}
