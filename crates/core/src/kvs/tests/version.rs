use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::err::Error;
use crate::kvs::tests::new_ds;
use crate::kvs::TransactionType::*;
use crate::kvs::{Transaction, ALL_STORES};

#[tokio::test]
async fn a_new_datastore_is_upgraded_from_version_zero() {
	let (ds, _) = new_ds(100_000).await;
	let from = Arc::new(AtomicU32::new(u32::MAX));
	let seen = from.clone();
	ds.ensure_schema(3, |tx: &mut Transaction, from, to| {
		Box::pin(async move {
			seen.store(from, Ordering::SeqCst);
			assert_eq!(to, 3);
			// Upgraders run within the upgrade transaction
			tx.set(b"/!rdseed".to_vec(), b"seeded".to_vec()).await?;
			Ok(())
		})
	})
	.await
	.unwrap();
	assert_eq!(from.load(Ordering::SeqCst), 0);
	// The version is stamped and the upgrade writes were committed
	let mut tx = ds.transaction(Read, ALL_STORES).await.unwrap();
	assert_eq!(tx.get_version().await.unwrap(), Some(3));
	assert_eq!(tx.get(b"/!rdseed".to_vec()).await.unwrap(), Some(b"seeded".to_vec()));
	tx.cancel().await.unwrap();
}

#[tokio::test]
async fn a_current_schema_is_not_upgraded_again() {
	let (ds, _) = new_ds(100_000).await;
	ds.ensure_schema(2, |_: &mut Transaction, _, _| Box::pin(async { Ok(()) })).await.unwrap();
	ds.ensure_schema(2, |_: &mut Transaction, _, _| {
		Box::pin(async {
			panic!("the upgrader must not run for a current schema");
		})
	})
	.await
	.unwrap();
}

#[tokio::test]
async fn upgrades_continue_from_the_stored_version() {
	let (ds, _) = new_ds(100_000).await;
	ds.ensure_schema(2, |_: &mut Transaction, _, _| Box::pin(async { Ok(()) })).await.unwrap();
	let from = Arc::new(AtomicU32::new(u32::MAX));
	let seen = from.clone();
	ds.ensure_schema(5, |_: &mut Transaction, from, _| {
		Box::pin(async move {
			seen.store(from, Ordering::SeqCst);
			Ok(())
		})
	})
	.await
	.unwrap();
	assert_eq!(from.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn downgrades_are_refused() {
	let (ds, _) = new_ds(100_000).await;
	ds.ensure_schema(4, |_: &mut Transaction, _, _| Box::pin(async { Ok(()) })).await.unwrap();
	let res = ds.ensure_schema(3, |_: &mut Transaction, _, _| Box::pin(async { Ok(()) })).await;
	assert!(matches!(res, Err(Error::Ds(_))));
}

#[tokio::test]
async fn failed_upgrades_leave_no_version_behind() {
	let (ds, _) = new_ds(100_000).await;
	let res = ds
		.ensure_schema(2, |_: &mut Transaction, _, _| {
			Box::pin(async { Err(Error::Internal("upgrade failed".to_owned())) })
		})
		.await;
	assert!(matches!(res, Err(Error::Internal(_))));
	let mut tx = ds.transaction(Read, ALL_STORES).await.unwrap();
	assert_eq!(tx.get_version().await.unwrap(), None);
	tx.cancel().await.unwrap();
}
