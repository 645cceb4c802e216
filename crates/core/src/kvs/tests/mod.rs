#![cfg(feature = "kv-mem")]

mod version;

use std::sync::Arc;

use crate::dbs::client::Timestamp;
use crate::kvs::clock::{FakeClock, SizedClock};
use crate::kvs::Datastore;

/// Prepare a useable datastore with an externally controlled clock.
pub(crate) async fn new_ds(now: u64) -> (Arc<Datastore>, Arc<SizedClock>) {
	let clock = Arc::new(SizedClock::Fake(FakeClock::new(Timestamp::from(now))));
	let ds = Datastore::new_with_clock("memory", Some(clock.clone())).await.unwrap();
	(Arc::new(ds), clock)
}
