/*!
 * Crate-wide error type
 *
 * Unifies the error kinds observable at the protocol/store/AOF boundary:
 * malformed wire input, I/O failure, and writes attempted after the AOF
 * has been closed.
 */

use std::io;

/// Errors that can surface from the codec, the AOF, or connection dispatch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed RESP input. Terminates the connection that produced it.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Socket or file I/O failure, including a clean EOF while reading a value.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// An append was attempted after the AOF was closed.
    #[error("aof is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }
}
