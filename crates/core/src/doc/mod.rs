//! The persistence handles the coordinator's collaborators operate on.
//!
//! These cover the staged mutation queue, the query target cache, and the
//! remote document cache. The handles do not re-check the primary lease
//! themselves: callers perform their operations through the transaction
//! gate, which enforces the lease requirement and extends the lease on
//! commit. Record payloads are opaque to this layer.

use serde::{Deserialize, Serialize};

use crate::cf;
use crate::cnf::SCAN_BATCH_SIZE;
use crate::err::Error;
use crate::kvs::Transaction;

/// A staged batch of writes awaiting acknowledgement by the primary.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub struct MutationBatch {
	pub batch_id: u64,
	pub payload: Vec<u8>,
}

/// A cached query target.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub struct TargetRecord {
	pub target_id: u32,
	pub payload: Vec<u8>,
}

/// A cached remote document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub struct DocRecord {
	pub doc_key: String,
	pub payload: Vec<u8>,
}

/// Staged local writes, enqueued by any client and drained by the primary.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct MutationQueue;

impl MutationQueue {
	pub(crate) fn new() -> Self {
		Self
	}

	/// Stages a mutation batch, returning its batch id.
	pub async fn enqueue(&self, tx: &mut Transaction, payload: Vec<u8>) -> Result<u64, Error> {
		let batch_id = tx.next_batch_id().await?;
		tx.put_batch(&MutationBatch {
			batch_id,
			payload,
		})
		.await?;
		Ok(batch_id)
	}

	/// Reads every staged batch, in batch id order.
	pub async fn scan_all(&self, tx: &mut Transaction) -> Result<Vec<MutationBatch>, Error> {
		tx.scan_mb(*SCAN_BATCH_SIZE).await
	}

	/// Removes every batch up to and including the acknowledged id.
	pub async fn remove_through(&self, tx: &mut Transaction, batch_id: u64) -> Result<(), Error> {
		tx.delr_mb(batch_id, *SCAN_BATCH_SIZE).await
	}
}

/// The cache of query targets.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct QueryCache;

impl QueryCache {
	pub(crate) fn new() -> Self {
		Self
	}

	/// Inserts or updates a query target.
	pub async fn set_target(&self, tx: &mut Transaction, target: TargetRecord) -> Result<(), Error> {
		tx.set_target(&target).await
	}

	/// Retrieves a query target.
	pub async fn get_target(
		&self,
		tx: &mut Transaction,
		target_id: u32,
	) -> Result<Option<TargetRecord>, Error> {
		tx.get_target(target_id).await
	}

	/// Deletes a query target.
	pub async fn delete_target(&self, tx: &mut Transaction, target_id: u32) -> Result<(), Error> {
		tx.del_target(target_id).await
	}
}

/// The cache of remote documents, which owns the change log.
///
/// Every write appends a change log entry within the same transaction, so
/// peers observe document updates in commit order.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct RemoteDocumentCache;

impl RemoteDocumentCache {
	pub(crate) fn new() -> Self {
		Self
	}

	/// Inserts or updates a document, returning the logged change id.
	pub async fn set_document(&self, tx: &mut Transaction, doc: DocRecord) -> Result<u64, Error> {
		let doc_key = doc.doc_key.clone();
		tx.set_doc(&doc).await?;
		cf::writer::push(tx, vec![doc_key]).await
	}

	/// Retrieves a document.
	pub async fn get_document(
		&self,
		tx: &mut Transaction,
		doc_key: &str,
	) -> Result<Option<DocRecord>, Error> {
		tx.get_doc(doc_key).await
	}

	/// Deletes a document, returning the logged change id.
	pub async fn delete_document(&self, tx: &mut Transaction, doc_key: &str) -> Result<u64, Error> {
		tx.del_doc(doc_key).await?;
		cf::writer::push(tx, vec![doc_key.to_owned()]).await
	}
}

#[cfg(all(test, feature = "kv-mem"))]
mod tests {
	use super::*;
	use crate::kvs::tests::new_ds;
	use crate::kvs::TransactionType::*;
	use crate::kvs::ALL_STORES;

	#[tokio::test]
	async fn staged_batches_drain_in_order() {
		let (ds, _) = new_ds(100_000).await;
		let queue = MutationQueue::new();
		// Two clients stage batches
		let mut tx = ds.transaction(Write, ALL_STORES).await.unwrap();
		assert_eq!(queue.enqueue(&mut tx, b"first".to_vec()).await.unwrap(), 1);
		assert_eq!(queue.enqueue(&mut tx, b"second".to_vec()).await.unwrap(), 2);
		assert_eq!(queue.enqueue(&mut tx, b"third".to_vec()).await.unwrap(), 3);
		tx.commit().await.unwrap();
		// The primary drains and acknowledges the first two
		let mut tx = ds.transaction(Write, ALL_STORES).await.unwrap();
		let staged = queue.scan_all(&mut tx).await.unwrap();
		assert_eq!(staged.len(), 3);
		assert_eq!(staged[0].payload, b"first".to_vec());
		queue.remove_through(&mut tx, 2).await.unwrap();
		tx.commit().await.unwrap();
		let mut tx = ds.transaction(Read, ALL_STORES).await.unwrap();
		let staged = queue.scan_all(&mut tx).await.unwrap();
		tx.cancel().await.unwrap();
		assert_eq!(staged.len(), 1);
		assert_eq!(staged[0].batch_id, 3);
	}

	#[tokio::test]
	async fn query_targets_round_trip() {
		let (ds, _) = new_ds(100_000).await;
		let cache = QueryCache::new();
		let target = TargetRecord {
			target_id: 7,
			payload: b"target".to_vec(),
		};
		let mut tx = ds.transaction(Write, ALL_STORES).await.unwrap();
		cache.set_target(&mut tx, target.clone()).await.unwrap();
		tx.commit().await.unwrap();
		let mut tx = ds.transaction(Write, ALL_STORES).await.unwrap();
		assert_eq!(cache.get_target(&mut tx, 7).await.unwrap(), Some(target));
		cache.delete_target(&mut tx, 7).await.unwrap();
		assert_eq!(cache.get_target(&mut tx, 7).await.unwrap(), None);
		tx.commit().await.unwrap();
	}

	#[tokio::test]
	async fn document_writes_append_to_the_change_log() {
		let (ds, _) = new_ds(100_000).await;
		let cache = RemoteDocumentCache::new();
		let mut tx = ds.transaction(Write, ALL_STORES).await.unwrap();
		let doc = DocRecord {
			doc_key: "users/alice".to_owned(),
			payload: b"doc".to_vec(),
		};
		let first = cache.set_document(&mut tx, doc.clone()).await.unwrap();
		assert_eq!(first, 1);
		assert_eq!(cache.get_document(&mut tx, "users/alice").await.unwrap(), Some(doc));
		let second = cache.delete_document(&mut tx, "users/alice").await.unwrap();
		assert_eq!(second, 2);
		assert_eq!(cache.get_document(&mut tx, "users/alice").await.unwrap(), None);
		// Both writes were logged against the same document
		let changes = crate::cf::writer::scan_after(&mut tx, 0).await.unwrap();
		tx.commit().await.unwrap();
		assert_eq!(changes.len(), 2);
		assert_eq!(changes[0].document_keys, vec!["users/alice".to_owned()]);
	}
}
