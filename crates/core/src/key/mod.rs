//! How the keys are structured in the key value store.
//!
//! Each object store owns a distinct `/!xx` tag prefix, so that a single
//! ordered keyspace can hold every store while still supporting efficient
//! range scans and range deletes per store.
//!
//! ```ignore
//! crate::key::cl  /!cl{clientid}       client metadata, keyed by client id
//! crate::key::pc  /!pc                 the primary lease singleton
//! crate::key::dc  /!dc{changeid}       remote document change log entries
//! crate::key::mb  /!mb{batchid}        staged mutation batches
//! crate::key::qt  /!qt{targetid}       query cache targets
//! crate::key::rd  /!rd{dockey}         remote document cache records
//! crate::key::sq  /!sq{sequence}       monotonic id sequences
//! crate::key::vn  /!vn                 the schema version singleton
//! ```

pub mod cl;
pub mod dc;
pub mod debug;
pub mod mb;
pub mod pc;
pub mod qt;
pub mod rd;
pub mod sq;
pub mod vn;
