//! Error type shared by buffers and their readers.

use std::sync::Arc;
use thiserror::Error;

/// Result type local to this crate, generic over the upstream error `E`.
pub type Result<T, E> = std::result::Result<T, Error<E>>;

/// Everything a buffer or reader can report.
///
/// `E` is the error type produced by the upstream [`Source`](crate::Source).
/// Infallible sources use [`std::convert::Infallible`].
#[derive(Debug, Error)]
pub enum Error<E> {
    /// The buffer (or the reader itself) has been disposed.
    #[error("buffer has been disposed")]
    Disposed,

    /// The reader was created before the buffer was last reset.
    #[error("reader belongs to a generation discarded by reset")]
    Stale,

    /// `reset()` was called while a pull from the source was in flight.
    #[error("buffer reset during iteration")]
    ResetDuringIteration,

    /// The source was asked for a second pass it cannot provide.
    #[error("source cannot be reopened")]
    ReopenNotSupported,

    /// A reader reached the frontier while another pull was still in flight.
    #[error("another reader is already pulling from the source")]
    Busy,

    /// The source panicked mid-pull; only `reset()` recovers the buffer.
    #[error("source panicked during a pull; reset the buffer to start over")]
    Poisoned,

    /// The source failed. Every reader reaching this position sees the same value.
    #[error("upstream source faulted: {0}")]
    Upstream(Arc<E>),
}

impl<E> Error<E> {
    /// Returns the captured upstream fault, if this is one.
    pub fn upstream(&self) -> Option<&Arc<E>> {
        match self {
            Error::Upstream(fault) => Some(fault),
            _ => None,
        }
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, Error::Disposed)
    }
}

impl<E> Clone for Error<E> {
    fn clone(&self) -> Self {
        match self {
            Error::Disposed => Error::Disposed,
            Error::Stale => Error::Stale,
            Error::ResetDuringIteration => Error::ResetDuringIteration,
            Error::ReopenNotSupported => Error::ReopenNotSupported,
            Error::Busy => Error::Busy,
            Error::Poisoned => Error::Poisoned,
            Error::Upstream(fault) => Error::Upstream(Arc::clone(fault)),
        }
    }
}
