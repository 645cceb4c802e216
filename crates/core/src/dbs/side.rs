use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::err::Error;

/// A synchronous, best-effort, string-keyed store used as a side channel
/// between clients.
///
/// Browser embeddings back this with LocalStorage; other platforms may
/// substitute any equivalent synchronous store. The channel must be
/// synchronous because unload handlers can not await asynchronous I/O.
/// Unavailability is tolerated everywhere: reads degrade to "no value" and
/// writes to no-ops, at the cost of slower zombie detection.
pub trait SideChannel: Send + Sync + 'static {
	/// Fetch a value from the store.
	fn get(&self, key: &str) -> Result<Option<String>, Error>;
	/// Insert or update a value in the store.
	fn set(&self, key: &str, value: &str) -> Result<(), Error>;
	/// Remove a value from the store.
	fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Derives the side channel key marking a client as terminated.
pub(crate) fn zombie_key(prefix: &str, client: Uuid) -> String {
	format!("firestore_zombie_{}_{}", prefix, client)
}

/// An in-process [`SideChannel`] for native embeddings and tests.
#[derive(Default)]
#[non_exhaustive]
pub struct MemorySideChannel {
	data: Mutex<HashMap<String, String>>,
}

impl MemorySideChannel {
	pub fn new() -> Self {
		Self::default()
	}

	fn data(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
		match self.data.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}
}

impl SideChannel for MemorySideChannel {
	fn get(&self, key: &str) -> Result<Option<String>, Error> {
		Ok(self.data().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), Error> {
		self.data().insert(key.to_owned(), value.to_owned());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), Error> {
		self.data().remove(key);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zombie_keys_embed_the_prefix_and_client() {
		let id = Uuid::parse_str("e80540d4-2869-4bf3-ae27-790a538c53f3").unwrap();
		let key = zombie_key("firestore/main/app/", id);
		assert_eq!(key, "firestore_zombie_firestore/main/app/_e80540d4-2869-4bf3-ae27-790a538c53f3");
	}

	#[test]
	fn values_round_trip() {
		let side = MemorySideChannel::new();
		assert_eq!(side.get("a").unwrap(), None);
		side.set("a", "1").unwrap();
		assert_eq!(side.get("a").unwrap(), Some("1".to_owned()));
		side.remove("a").unwrap();
		assert_eq!(side.get("a").unwrap(), None);
	}
}
