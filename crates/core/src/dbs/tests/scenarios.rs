use serial_test::serial;
use uuid::Uuid;

use crate::cf;
use crate::dbs::client::{ClientMetadata, Timestamp};
use crate::dbs::coordinator::State;
use crate::dbs::side::zombie_key;
use crate::dbs::side::SideChannel;
use crate::dbs::tests::TestContext;
use crate::err::Error;
use crate::kvs::TransactionType::*;
use crate::kvs::{ALL_STORES, CLIENT_STATE_STORES};

#[test_log::test(tokio::test)]
#[serial]
async fn a_solo_client_becomes_primary_on_startup() {
	let ctx = TestContext::new().await;
	let a = ctx.client(true, true);
	a.coordinator.start().await.unwrap();
	// The first heartbeat claimed the lease
	assert!(a.coordinator.is_primary());
	assert_eq!(a.coordinator.state(), State::Primary);
	let mut tx = ctx.ds.transaction(Read, CLIENT_STATE_STORES).await.unwrap();
	let primary = tx.get_primary().await.unwrap().unwrap();
	tx.cancel().await.unwrap();
	assert_eq!(primary.owner_id, a.coordinator.client_id());
	// The listener hears the current value on registration
	a.attach_listener().await;
	a.flush().await;
	assert_eq!(a.notified(), vec![true]);
}

#[test_log::test(tokio::test)]
#[serial]
async fn a_foregrounded_peer_takes_over_when_the_primary_backgrounds() {
	let ctx = TestContext::new().await;
	let a = ctx.client(true, true);
	a.coordinator.start().await.unwrap();
	let b = ctx.client(true, true);
	b.coordinator.start().await.unwrap();
	assert!(a.coordinator.is_primary());
	assert!(!b.coordinator.is_primary());
	a.attach_listener().await;
	b.attach_listener().await;
	a.flush().await;
	b.flush().await;
	// The primary moves to the background
	a.window.set_visibility(false);
	a.flush().await;
	assert!(!a.coordinator.is_primary());
	// The foregrounded peer claims the lease at its next refresh
	b.refresh().await;
	assert!(b.coordinator.is_primary());
	a.flush().await;
	b.flush().await;
	assert_eq!(a.notified(), vec![true, false]);
	assert_eq!(b.notified(), vec![false, true]);
}

#[test_log::test(tokio::test)]
#[serial]
async fn a_stale_lease_is_reclaimed_after_a_crash() {
	let ctx = TestContext::new().await;
	let a = ctx.client(true, true);
	a.coordinator.start().await.unwrap();
	let a_id = a.coordinator.client_id();
	let b = ctx.client(true, true);
	b.coordinator.start().await.unwrap();
	assert!(!b.coordinator.is_primary());
	// The primary process dies without running shutdown, leaving its
	// lease and metadata behind
	drop(a);
	// Within the lease age the survivor still defers to the record
	b.refresh().await;
	assert!(!b.coordinator.is_primary());
	// Once the lease expires the survivor claims it
	ctx.advance(5_001).await;
	b.refresh().await;
	assert!(b.coordinator.is_primary());
	let mut tx = ctx.ds.transaction(Read, CLIENT_STATE_STORES).await.unwrap();
	let primary = tx.get_primary().await.unwrap().unwrap();
	tx.cancel().await.unwrap();
	assert_eq!(primary.owner_id, b.coordinator.client_id());
	assert_ne!(primary.owner_id, a_id);
}

#[test_log::test(tokio::test)]
#[serial]
async fn an_unloading_primary_hands_off_through_its_zombie_marker() {
	let ctx = TestContext::new().await;
	let a = ctx.client(true, true);
	a.coordinator.start().await.unwrap();
	let b = ctx.client(true, true);
	b.coordinator.start().await.unwrap();
	// The unload handler writes the zombie marker synchronously, even if
	// the graceful shutdown behind it never runs
	a.window.unload();
	// The peer claims the lease regardless of the lease timestamp
	b.refresh().await;
	assert!(b.coordinator.is_primary());
}

#[test_log::test(tokio::test)]
#[serial]
async fn startup_fails_against_an_exclusive_primary() {
	let ctx = TestContext::new().await;
	let a = ctx.client_with_synchronization(true, true, false);
	a.coordinator.start().await.unwrap();
	assert!(a.coordinator.is_primary());
	let b = ctx.client(true, true);
	let res = b.coordinator.start().await;
	assert!(matches!(res, Err(Error::PrimaryLeaseExclusive)));
	assert_eq!(b.coordinator.state(), State::Failed);
	// Startup failure released the window observers
	assert_eq!(b.window.attached(), 0);
	// The exclusive lease is untouched
	let mut tx = ctx.ds.transaction(Read, CLIENT_STATE_STORES).await.unwrap();
	let primary = tx.get_primary().await.unwrap().unwrap();
	tx.cancel().await.unwrap();
	assert_eq!(primary.owner_id, a.coordinator.client_id());
	assert!(!primary.allow_tab_synchronization);
}

#[test_log::test(tokio::test)]
#[serial]
async fn the_primary_garbage_collects_inactive_clients() {
	let ctx = TestContext::new().await;
	let a = ctx.client(true, true);
	a.coordinator.start().await.unwrap();
	// An active peer which has processed changes up to id four
	let b = ctx.client(true, false);
	b.coordinator.start().await.unwrap();
	b.coordinator.note_processed_change(4);
	b.refresh().await;
	// A client which died over thirty minutes ago, zombie marker and all
	let dead = Uuid::new_v4();
	let mut tx = ctx.ds.transaction(Write, ALL_STORES).await.unwrap();
	let now = tx.clock().await;
	let stale = Timestamp::from(now.value - 1_800_001);
	tx.set_client(&ClientMetadata::new(dead, stale, true, true, 1)).await.unwrap();
	for _ in 0..6 {
		cf::writer::push(&mut tx, vec!["users/alice".to_owned()]).await.unwrap();
	}
	tx.commit().await.unwrap();
	let marker = zombie_key("firestore/main/app/", dead);
	ctx.side.set(&marker, "1").unwrap();
	// Run the collection pass
	a.coordinator.maybe_garbage_collect_multi_client_state().await.unwrap();
	// The dead client and its marker are gone, and the change log was
	// truncated up to the active peer's cursor
	let mut tx = ctx.ds.transaction(Read, ALL_STORES).await.unwrap();
	assert_eq!(tx.get_client(dead).await.unwrap(), None);
	let changes = tx.scan_dc(0, 100).await.unwrap();
	tx.cancel().await.unwrap();
	assert_eq!(ctx.side.get(&marker).unwrap(), None);
	assert_eq!(changes.first().map(|c| c.change_id), Some(5));
	assert_eq!(changes.len(), 2);
}
