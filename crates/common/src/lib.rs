pub mod config;
pub mod error;
pub mod identity;
pub mod redis_pool;
pub mod signing;
pub mod types;

/// Default namespace prefix for queue names and storage keys.
pub const DEFAULT_PREFIX: &str = "pusher:";

/// Queue suffix reserved for broadcast control jobs.
pub const PUSHALL_QUEUE: &str = "pushall";
