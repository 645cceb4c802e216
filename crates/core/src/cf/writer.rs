use crate::cf::ChangeEntry;
use crate::cnf::SCAN_BATCH_SIZE;
use crate::err::Error;
use crate::kvs::Transaction;

/// Appends an entry to the change log, returning its change id.
///
/// Ids are issued by the log's sequence within the same transaction, so
/// entries commit in id order.
pub async fn push(tx: &mut Transaction, document_keys: Vec<String>) -> Result<u64, Error> {
	let change_id = tx.next_change_id().await?;
	tx.put_change(&ChangeEntry::new(change_id, document_keys)).await?;
	Ok(change_id)
}

/// Reads every change log entry after the given change id.
pub async fn scan_after(tx: &mut Transaction, after: u64) -> Result<Vec<ChangeEntry>, Error> {
	tx.scan_dc(after, *SCAN_BATCH_SIZE).await
}

/// Returns the most recently issued change id, or zero for an empty log.
pub async fn latest_id(tx: &mut Transaction) -> Result<u64, Error> {
	tx.current_change_id().await
}
