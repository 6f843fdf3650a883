use crate::buffer::{Backing, BufferCore, Retention};
use crate::error::Result;
use crate::reader::Reader;
use crate::source::Source;

/// A buffer for readers that move through the source roughly together.
///
/// `Share` pulls from its source exactly like [`Memoize`](crate::Memoize),
/// but only keeps the elements between its slowest and its fastest live
/// reader. Once every live reader has passed an element, the element is
/// dropped. A reader created later starts at the slowest live reader's
/// position, not at the beginning; with no live readers it starts at the
/// frontier.
///
/// Handles are cheap to clone; all clones control the same buffer.
///
/// # Examples
///
/// ```
/// use iter_shared::{share, source};
///
/// let buffer = share(source::replayable(1..=5));
/// let mut first = buffer.reader().unwrap();
/// let mut second = buffer.reader().unwrap();
///
/// first.move_next().unwrap();
/// first.move_next().unwrap();
/// assert_eq!(buffer.retained().unwrap(), 2);
///
/// second.move_next().unwrap();
/// assert_eq!(buffer.retained().unwrap(), 1);
///
/// // `late` joins at the slowest reader's position.
/// let late: Vec<i32> = buffer.reader().unwrap().map(Result::unwrap).collect();
/// assert_eq!(late, vec![2, 3, 4, 5]);
/// ```
pub struct Share<S>
where
    S: Source,
    S::Item: Clone,
{
    core: BufferCore<S>,
}

impl<S> Clone for Share<S>
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

impl<S> Share<S>
where
    S: Source,
    S::Item: Clone,
{
    /// Creates a sharing buffer over `source`. Nothing is pulled yet.
    pub fn new(source: S) -> Self {
        Share {
            core: BufferCore::new(source, Retention::SlowestReader, Backing::Buffered),
        }
    }

    /// Creates a reader at the oldest element still retained.
    pub fn reader(&self) -> Result<Reader<S>, S::Error> {
        Reader::new(self.core.clone())
    }

    /// Number of elements currently held for lagging readers.
    pub fn retained(&self) -> Result<usize, S::Error> {
        self.core.retained()
    }

    /// Forgets everything and lets the next reader start a fresh pass over
    /// the source. Readers created before the reset fail with
    /// [`Error::Stale`](crate::Error::Stale).
    pub fn reset(&self) -> Result<(), S::Error> {
        self.core.reset()
    }

    /// Releases the source and all retained elements. Idempotent.
    pub fn dispose(&self) {
        self.core.dispose()
    }

    /// Whether [`dispose`](Self::dispose) has been called on any handle.
    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// Returns the diagnostic counters of this buffer.
    #[cfg(feature = "stats")]
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn stats(&self) -> crate::stats::Stats {
        self.core.stats()
    }
}

impl<S> std::fmt::Debug for Share<S>
where
    S: Source,
    S::Item: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Share")
            .field("retained", &self.retained().ok())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
