use crate::kvs::ObjectStore;
use thiserror::Error;

/// An error originating from the persistence layer
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// There was a problem with the underlying datastore
	#[error("There was a problem with the underlying datastore: {0}")]
	Ds(String),

	/// There was a problem with a datastore transaction
	#[error("There was a problem with a datastore transaction: {0}")]
	Tx(String),

	/// The transaction was already committed or cancelled
	#[error("Couldn't write to a transaction which was already finished")]
	TxFinished,

	/// The transaction is read-only and can not be used to write
	#[error("Couldn't write to a read only transaction")]
	TxReadonly,

	/// An object store was accessed outside the scope of its transaction
	#[error("Couldn't access the object store '{0}' outside the transaction scope")]
	TxStoreScope(ObjectStore),

	/// The primary lease for this database could not be obtained or was lost
	#[error("The primary lease for this database was lost or could not be obtained")]
	PrimaryLeaseLost,

	/// Another client holds the primary lease without shared access enabled
	#[error("Another client holds the primary lease for this database without multi-client access enabled")]
	PrimaryLeaseExclusive,

	/// The synchronous side channel store is unavailable
	#[error("The side channel store is unavailable: {0}")]
	SideChannel(String),

	/// The coordinator has not been started
	#[error("The persistence coordinator has not been started")]
	NotStarted,

	/// A record could not be encoded or decoded
	#[error("There was an error processing a stored record: {0}")]
	Encoding(String),

	/// An internal error occurred
	#[error("An internal error occurred: {0}")]
	Internal(String),
}

impl From<bincode::Error> for Error {
	fn from(e: bincode::Error) -> Error {
		Error::Encoding(e.to_string())
	}
}

#[cfg(feature = "kv-mem")]
impl From<echodb::err::Error> for Error {
	fn from(e: echodb::err::Error) -> Error {
		Error::Tx(e.to_string())
	}
}

#[cfg(feature = "kv-indxdb")]
impl From<indxdb::err::Error> for Error {
	fn from(e: indxdb::err::Error) -> Error {
		Error::Tx(e.to_string())
	}
}
