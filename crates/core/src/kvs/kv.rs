use crate::err::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// The key part of a key-value pair. An alias for byte-vector.
pub type Key = Vec<u8>;

/// The value part of a key-value pair. An alias for byte-vector.
pub type Val = Vec<u8>;

/// Whether a transaction may write to the datastore.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum TransactionType {
	Read,
	Write,
}

/// The behaviour of a transaction which was dropped without being
/// committed or cancelled.
#[derive(Copy, Clone, Debug)]
#[non_exhaustive]
pub enum Check {
	None,
	Warn,
	Panic,
}

/// The logical object stores within the database keyspace.
///
/// Every transaction carries the set of stores it was opened over, and
/// typed accessors fail when used outside that scope.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ObjectStore {
	ClientMetadata,
	PrimaryClient,
	RemoteDocumentChangeLog,
	MutationQueue,
	QueryCache,
	RemoteDocumentCache,
	Meta,
}

impl fmt::Display for ObjectStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ObjectStore::ClientMetadata => write!(f, "clientMetadata"),
			ObjectStore::PrimaryClient => write!(f, "primaryClient"),
			ObjectStore::RemoteDocumentChangeLog => write!(f, "remoteDocumentChangeLog"),
			ObjectStore::MutationQueue => write!(f, "mutationQueue"),
			ObjectStore::QueryCache => write!(f, "queryCache"),
			ObjectStore::RemoteDocumentCache => write!(f, "remoteDocumentCache"),
			ObjectStore::Meta => write!(f, "meta"),
		}
	}
}

/// Every object store in the database.
pub const ALL_STORES: &[ObjectStore] = &[
	ObjectStore::ClientMetadata,
	ObjectStore::PrimaryClient,
	ObjectStore::RemoteDocumentChangeLog,
	ObjectStore::MutationQueue,
	ObjectStore::QueryCache,
	ObjectStore::RemoteDocumentCache,
	ObjectStore::Meta,
];

/// The stores touched by a client heartbeat and lease evaluation.
pub const CLIENT_STATE_STORES: &[ObjectStore] =
	&[ObjectStore::ClientMetadata, ObjectStore::PrimaryClient];

/// The stores touched by a garbage collection pass.
pub const GC_STORES: &[ObjectStore] =
	&[ObjectStore::ClientMetadata, ObjectStore::RemoteDocumentChangeLog];

/// Encodes a record into its stored value representation.
pub(crate) fn to_val<T>(value: &T) -> Result<Val, Error>
where
	T: Serialize,
{
	Ok(bincode::serialize(value)?)
}

/// Decodes a record from its stored value representation.
pub(crate) fn from_val<T>(value: &Val) -> Result<T, Error>
where
	T: DeserializeOwned,
{
	Ok(bincode::deserialize(value)?)
}
