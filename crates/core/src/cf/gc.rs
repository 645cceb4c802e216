use crate::cnf::SCAN_BATCH_SIZE;
use crate::err::Error;
use crate::kvs::Transaction;

const TARGET: &str = "tabdb::core::cf::gc";

/// Deletes every change log entry up to and including the watermark.
///
/// The watermark must not exceed the lowest change id still needed by an
/// active peer, which the caller derives from the client metadata records
/// within the same transaction.
pub async fn truncate_through(tx: &mut Transaction, watermark: u64) -> Result<(), Error> {
	trace!(target: TARGET, "Truncating the change log through {}", watermark);
	tx.delr_dc(watermark, *SCAN_BATCH_SIZE).await
}
