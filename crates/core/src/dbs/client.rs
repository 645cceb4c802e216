use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};
use std::time::Duration;
use uuid::Uuid;

/// A wall-clock timestamp in milliseconds since the epoch.
///
/// This struct is meant to represent a timestamp that can be used to
/// partially order events between clients. Client clocks are assumed to be
/// loosely synchronised, so timestamps are only ever compared against
/// generous age thresholds.
#[derive(
	Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, Ord, PartialOrd, Hash, Default,
)]
#[non_exhaustive]
pub struct Timestamp {
	pub value: u64,
}

impl From<u64> for Timestamp {
	fn from(ts: u64) -> Self {
		Timestamp {
			value: ts,
		}
	}
}

impl Add<Duration> for Timestamp {
	type Output = Timestamp;
	fn add(self, rhs: Duration) -> Timestamp {
		Timestamp {
			value: self.value.saturating_add(rhs.as_millis() as u64),
		}
	}
}

impl Sub<Duration> for Timestamp {
	type Output = Timestamp;
	fn sub(self, rhs: Duration) -> Timestamp {
		Timestamp {
			value: self.value.saturating_sub(rhs.as_millis() as u64),
		}
	}
}

impl Timestamp {
	/// Whether this timestamp lies in the future relative to `now`.
	pub fn is_future(&self, now: Timestamp) -> bool {
		self.value > now.value
	}

	/// Whether this timestamp is no older than `max_age_ms` relative to
	/// `now`. A future-dated timestamp is never within age, which guards
	/// against clock skew keeping stale records alive forever.
	pub fn within_age(&self, now: Timestamp, max_age_ms: u64) -> bool {
		!self.is_future(now) && now.value - self.value <= max_age_ms
	}
}

/// The metadata record every client maintains for itself while running.
///
/// Only the owning client writes its own record. Peers read the records of
/// every client to decide lease eligibility and to bound change log
/// retention, and the primary deletes records which have gone stale.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub struct ClientMetadata {
	pub client_id: Uuid,
	pub update_time: Timestamp,
	pub network_enabled: bool,
	pub in_foreground: bool,
	pub last_processed_change_id: u64,
}

impl ClientMetadata {
	pub fn new(
		client_id: Uuid,
		update_time: Timestamp,
		network_enabled: bool,
		in_foreground: bool,
		last_processed_change_id: u64,
	) -> Self {
		Self {
			client_id,
			update_time,
			network_enabled,
			in_foreground,
			last_processed_change_id,
		}
	}
}

/// The singleton record holding the primary lease.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub struct PrimaryClient {
	pub owner_id: Uuid,
	pub lease_timestamp: Timestamp,
	pub allow_tab_synchronization: bool,
}

impl PrimaryClient {
	pub fn new(owner_id: Uuid, lease_timestamp: Timestamp, allow_tab_synchronization: bool) -> Self {
		Self {
			owner_id,
			lease_timestamp,
			allow_tab_synchronization,
		}
	}
}

#[cfg(test)]
mod test {
	use super::Timestamp;
	use std::time::Duration;

	#[test]
	fn timestamps_can_be_added_duration() {
		let ts = Timestamp::from(100_000);
		let hour = Duration::from_secs(60 * 60);
		let ts = ts + hour;
		let ts = ts + hour;
		assert_eq!(ts.value, 100_000 + 2 * 60 * 60 * 1_000);
	}

	#[test]
	fn timestamps_can_be_subtracted_duration() {
		let ts = Timestamp::from(10_000_000);
		let hour = Duration::from_secs(60 * 60);
		let ts = ts - hour;
		assert_eq!(ts.value, 10_000_000 - 60 * 60 * 1_000);
	}

	#[test]
	fn future_timestamps_are_never_within_age() {
		let now = Timestamp::from(50_000);
		let ts = Timestamp::from(51_000);
		assert!(ts.is_future(now));
		assert!(!ts.within_age(now, 5_000));
	}

	#[test]
	fn timestamps_within_age() {
		let now = Timestamp::from(50_000);
		assert!(Timestamp::from(45_000).within_age(now, 5_000));
		assert!(!Timestamp::from(44_999).within_age(now, 5_000));
		assert!(Timestamp::from(50_000).within_age(now, 5_000));
	}
}
