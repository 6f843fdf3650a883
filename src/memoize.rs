use crate::buffer::{Backing, BufferCore, Retention};
use crate::error::Result;
use crate::reader::Reader;
use crate::source::Source;

/// Construction options for [`Memoize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoizeOptions {
    /// Always copy elements into the buffer, even when the source is already
    /// materialized. Defaults to `true`.
    ///
    /// With `false`, a source that exposes [`Source::as_slice`] is served
    /// directly: readers index into the source's own storage and nothing is
    /// pulled or copied.
    pub force_cache: bool,
}

impl Default for MemoizeOptions {
    fn default() -> Self {
        MemoizeOptions { force_cache: true }
    }
}

impl MemoizeOptions {
    /// Sets [`force_cache`](Self#structfield.force_cache).
    pub fn force_cache(mut self, force_cache: bool) -> Self {
        self.force_cache = force_cache;
        self
    }
}

/// A buffer that remembers every element its source produced.
///
/// Any number of [`Reader`]s can be created at any time, and each one
/// starts from the first element. The source is pulled lazily, at most once
/// per element, by whichever reader first needs an element that has not
/// been produced yet. If the source fails, the failure is remembered too and
/// every reader reaching that position sees the same error.
///
/// Handles are cheap to clone; all clones control the same buffer.
///
/// # Examples
///
/// ```
/// use iter_shared::{memoize, source};
///
/// let buffer = memoize(source::replayable(1..=3));
/// assert_eq!(buffer.count().unwrap(), 0);
///
/// let mut reader = buffer.reader().unwrap();
/// reader.move_next().unwrap();
/// assert_eq!(buffer.count().unwrap(), 1);
///
/// let all: Vec<i32> = buffer.reader().unwrap().map(Result::unwrap).collect();
/// assert_eq!(all, vec![1, 2, 3]);
/// assert_eq!(buffer.count().unwrap(), 3);
/// ```
pub struct Memoize<S>
where
    S: Source,
    S::Item: Clone,
{
    core: BufferCore<S>,
}

impl<S> Clone for Memoize<S>
where
    S: Source,
    S::Item: Clone,
{
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<S> Memoize<S>
where
    S: Source,
    S::Item: Clone,
{
    /// Creates a memoizing buffer over `source`. Nothing is pulled yet.
    pub fn new(source: S) -> Self {
        Self::with_options(source, MemoizeOptions::default())
    }

    /// Creates a memoizing buffer over `source`, configured by `options`.
    pub fn with_options(source: S, options: MemoizeOptions) -> Self {
        let backing = if !options.force_cache && source.as_slice().is_some() {
            Backing::Proxy
        } else {
            Backing::Buffered
        };
        Memoize {
            core: BufferCore::new(source, Retention::All, backing),
        }
    }

    /// Creates a reader positioned before the first element.
    pub fn reader(&self) -> Result<Reader<S>, S::Error> {
        Reader::new(self.core.clone())
    }

    /// Number of elements materialized so far in this generation.
    ///
    /// For a proxy buffer (see [`is_proxy`](Self::is_proxy)) this is how far
    /// its readers have got. Either way it is 0 right after a reset.
    pub fn count(&self) -> Result<usize, S::Error> {
        self.core.frontier()
    }

    /// Forgets everything and lets the next reader start a fresh pass over
    /// the source. Readers created before the reset fail with
    /// [`Error::Stale`](crate::Error::Stale).
    ///
    /// Fails with [`Error::ResetDuringIteration`](crate::Error::ResetDuringIteration)
    /// when called from inside a pull.
    pub fn reset(&self) -> Result<(), S::Error> {
        self.core.reset()
    }

    /// Releases the source and all buffered elements. Idempotent; every later
    /// operation on this buffer or its readers fails with
    /// [`Error::Disposed`](crate::Error::Disposed).
    pub fn dispose(&self) {
        self.core.dispose()
    }

    /// Whether [`dispose`](Self::dispose) has been called on any handle.
    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// Whether readers are served straight from the source's own slice.
    pub fn is_proxy(&self) -> bool {
        self.core.backing() == Backing::Proxy
    }

    /// Returns the diagnostic counters of this buffer.
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn stats(&self) -> crate::stats::Stats {
        self.core.stats()
    }
}

impl<S> std::fmt::Debug for Memoize<S>
where
    S: Source,
    S::Item: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoize")
            .field("count", &self.count().ok())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
