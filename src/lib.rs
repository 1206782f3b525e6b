// Core modules for the pedis key-value store
pub mod error; // crate-wide Error/Result
pub mod resp; // RESP codec: Value, Reader, Writer
pub mod store; // in-memory string + hash containers
pub mod commands; // command registry and handlers
pub mod aof; // append-only log: open/replay/append/close
pub mod server; // connection engine: accept loop + dispatch
pub mod config; // ServerConfig + from_env

// Re-export the public surface for easier access
pub use aof::*;
pub use commands::*;
pub use config::*;
pub use error::*;
pub use resp::*;
pub use server::*;
pub use store::*;

/// Default bind address for the bundled binary.
pub const DEFAULT_ADDR: &str = "127.0.0.1:6379";