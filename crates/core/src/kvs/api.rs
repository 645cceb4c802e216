use std::future::Future;
use std::ops::Range;

use crate::err::Error;
use crate::kvs::Key;
use crate::kvs::Val;

/// The operations every storage engine transaction must support.
pub(super) trait Transaction {
	/// Check if closed
	fn closed(&self) -> bool;
	/// Cancel a transaction
	fn cancel(&mut self) -> impl Future<Output = Result<(), Error>>;
	/// Commit a transaction
	fn commit(&mut self) -> impl Future<Output = Result<(), Error>>;
	/// Fetch a key from the database
	fn get(&mut self, key: Key) -> impl Future<Output = Result<Option<Val>, Error>>;
	/// Insert or update a key in the database
	fn set(&mut self, key: Key, val: Val) -> impl Future<Output = Result<(), Error>>;
	/// Delete a key from the database
	fn del(&mut self, key: Key) -> impl Future<Output = Result<(), Error>>;
	/// Retrieve a range of keys from the database
	fn keys(&mut self, rng: Range<Key>, limit: u32) -> impl Future<Output = Result<Vec<Key>, Error>>;
	/// Retrieve a range of key-value pairs from the database
	fn scan(
		&mut self,
		rng: Range<Key>,
		limit: u32,
	) -> impl Future<Output = Result<Vec<(Key, Val)>, Error>>;
}
