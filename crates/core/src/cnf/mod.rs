use once_cell::sync::Lazy;

/// The longest a client metadata heartbeat may lag behind the current time
/// before the client is ignored for lease decisions.
pub const CLIENT_METADATA_MAX_AGE_MS: u64 = 5_000;

/// The interval at which each client rewrites its own metadata record and
/// re-evaluates its eligibility for the primary lease.
pub const CLIENT_METADATA_REFRESH_INTERVAL_MS: u64 = 4_000;

/// The longest a primary lease may go without being rewritten before any
/// client may treat it as abandoned and claim it.
pub const PRIMARY_LEASE_MAX_AGE_MS: u64 = 5_000;

/// The minimum time between garbage collection passes over shared client
/// state. Metadata records older than this are removed by the pass.
pub const CLIENT_STATE_GARBAGE_COLLECTION_THRESHOLD_MS: u64 = 1_800_000;

/// Datastore batch size for scan operations.
pub static SCAN_BATCH_SIZE: Lazy<u32> = lazy_env_parse!("TABDB_SCAN_BATCH_SIZE", u32, 1_000);
