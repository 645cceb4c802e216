//! The module defining the transactional key value store adapter.
//!
//! All coordinator and document state lives in one ordered keyspace which
//! can be processed by the following storage engines:
//! - `mem`: in-memory database, used natively and in tests
//! - `indxdb`: WASM based database to store data in the browser

mod api;
mod clock;
mod ds;
mod indxdb;
mod kv;
mod mem;
mod tx;

#[cfg(test)]
pub(crate) mod tests;

use futures::future::BoxFuture;

use crate::err::Error;

pub use self::ds::*;
pub use self::kv::*;
pub use self::tx::Transaction;

pub use self::clock::SizedClock;
#[cfg(test)]
pub use self::clock::FakeClock;
pub use self::clock::SystemClock;

/// The future returned by a transaction body closure.
pub type TxFuture<'a, T> = BoxFuture<'a, Result<T, Error>>;
