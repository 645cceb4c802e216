#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

mod exe;

#[doc(hidden)]
pub mod cnf;

pub mod cf;
pub mod dbs;
pub mod doc;
pub mod err;
#[doc(hidden)]
pub mod key;
pub mod kvs;
