//! The remote document change log.
//!
//! Every committed change to the remote document cache appends an entry
//! here under a monotonically increasing change id. Secondary clients
//! consume the log to observe the primary's writes; each client records
//! the highest id it has processed in its metadata, and the primary
//! truncates the log up to the oldest cursor still needed by an active
//! peer.

pub mod gc;
pub mod writer;

use serde::{Deserialize, Serialize};

/// One entry in the remote document change log.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub struct ChangeEntry {
	/// The monotonically increasing id of this change
	pub change_id: u64,
	/// The document keys written by this change
	pub document_keys: Vec<String>,
}

impl ChangeEntry {
	pub fn new(change_id: u64, document_keys: Vec<String>) -> Self {
		Self {
			change_id,
			document_keys,
		}
	}
}

#[cfg(all(test, feature = "kv-mem"))]
mod tests {
	use crate::kvs::tests::new_ds;
	use crate::kvs::TransactionType::*;
	use crate::kvs::ALL_STORES;

	#[tokio::test]
	async fn change_ids_are_issued_in_order() {
		let (ds, _) = new_ds(100_000).await;
		let mut tx = ds.transaction(Write, ALL_STORES).await.unwrap();
		assert_eq!(super::writer::latest_id(&mut tx).await.unwrap(), 0);
		for i in 1..=5u64 {
			let id = super::writer::push(&mut tx, vec![format!("users/{}", i)]).await.unwrap();
			assert_eq!(id, i);
		}
		assert_eq!(super::writer::latest_id(&mut tx).await.unwrap(), 5);
		tx.commit().await.unwrap();
	}

	#[tokio::test]
	async fn scans_return_only_entries_after_the_cursor() {
		let (ds, _) = new_ds(100_000).await;
		let mut tx = ds.transaction(Write, ALL_STORES).await.unwrap();
		for i in 1..=5u64 {
			super::writer::push(&mut tx, vec![format!("users/{}", i)]).await.unwrap();
		}
		tx.commit().await.unwrap();
		let mut tx = ds.transaction(Read, ALL_STORES).await.unwrap();
		let entries = super::writer::scan_after(&mut tx, 3).await.unwrap();
		tx.cancel().await.unwrap();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].change_id, 4);
		assert_eq!(entries[1].change_id, 5);
	}

	#[tokio::test]
	async fn truncation_keeps_entries_after_the_watermark() {
		let (ds, _) = new_ds(100_000).await;
		let mut tx = ds.transaction(Write, ALL_STORES).await.unwrap();
		for i in 1..=5u64 {
			super::writer::push(&mut tx, vec![format!("users/{}", i)]).await.unwrap();
		}
		super::gc::truncate_through(&mut tx, 3).await.unwrap();
		tx.commit().await.unwrap();
		let mut tx = ds.transaction(Read, ALL_STORES).await.unwrap();
		let entries = super::writer::scan_after(&mut tx, 0).await.unwrap();
		// Truncation does not reset the id sequence
		let latest = super::writer::latest_id(&mut tx).await.unwrap();
		tx.cancel().await.unwrap();
		assert_eq!(entries.iter().map(|e| e.change_id).collect::<Vec<_>>(), vec![4, 5]);
		assert_eq!(latest, 5);
	}
}
