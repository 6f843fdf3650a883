use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{FusedStream, Stream};

use crate::buffer::{BufferCore, Ticket};
use crate::error::{Error, Result};
use crate::source::Source;

/// Lifecycle of a [`Reader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// No element requested yet.
    Created,
    Iterating,
    /// The source ended; `move_next` keeps returning `false`.
    Exhausted,
    /// The last `move_next` hit an error.
    Faulted,
    Disposed,
}

/// An independent, forward-only cursor over a [`Memoize`](crate::Memoize) or
/// [`Share`](crate::Share) buffer.
///
/// Each reader keeps its own position. Elements behind the buffer's
/// frontier are replayed from the buffer; a reader that reaches the
/// frontier pulls the next element from the source itself, and every other
/// reader then sees that element too.
///
/// A reader can be driven three ways: the explicit [`move_next`](Self::move_next)
/// / [`current`](Self::current) pair, as an [`Iterator`] of `Result`s, or as a
/// [`Stream`] through [`into_stream`](Self::into_stream).
///
/// # Examples
///
/// ```
/// use iter_shared::SequenceExt;
///
/// let buffer = vec![1, 2].into_iter().memoize();
/// let mut first = buffer.reader().unwrap();
/// assert!(first.move_next().unwrap());
/// assert_eq!(first.current(), Some(&1));
///
/// // A second reader starts from the beginning and replays what `first` pulled.
/// let second: Vec<i32> = buffer.reader().unwrap().map(Result::unwrap).collect();
/// assert_eq!(second, vec![1, 2]);
///
/// assert!(first.move_next().unwrap());
/// assert_eq!(first.current(), Some(&2));
/// assert!(!first.move_next().unwrap());
/// ```
pub struct Reader<S>
where
    S: Source,
    S::Item: Clone,
{
    core: BufferCore<S>,
    ticket: Ticket,
    position: usize,
    current: Option<S::Item>,
    state: ReaderState,
    // Set once the Iterator/Stream surface has reported an end or an error.
    fused: bool,
}

impl<S> Reader<S>
where
    S: Source,
    S::Item: Clone,
{
    pub(crate) fn new(core: BufferCore<S>) -> Result<Self, S::Error> {
        let (ticket, position) = core.register()?;
        Ok(Reader {
            core,
            ticket,
            position,
            current: None,
            state: ReaderState::Created,
            fused: false,
        })
    }

    /// Advances to the next element.
    ///
    /// Returns `Ok(false)` once the source is exhausted. Errors are not
    /// sticky on the reader: calling again after an upstream fault reports
    /// the same fault again, until the buffer is reset.
    ///
    /// [`Error::Busy`] leaves the reader untouched, still holding its
    /// current element, and the call can simply be retried.
    pub fn move_next(&mut self) -> Result<bool, S::Error> {
        match self.step()? {
            Some(item) => {
                self.current = Some(item);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The element produced by the last successful [`move_next`](Self::move_next).
    pub fn current(&self) -> Option<&S::Item> {
        self.current.as_ref()
    }

    /// Logical position of the next element this reader will produce.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Where this reader is in its lifecycle.
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Detaches this reader from its buffer. Other readers are unaffected.
    ///
    /// Dropping a reader has the same effect.
    pub fn dispose(&mut self) {
        if self.state == ReaderState::Disposed {
            return;
        }
        self.state = ReaderState::Disposed;
        self.current = None;
        self.core.release(self.ticket);
    }

    /// Adapts this reader into an always-ready [`Stream`].
    ///
    /// ```
    /// use futures_util::StreamExt;
    /// use iter_shared::SequenceExt;
    ///
    /// # tokio_test::block_on(async {
    /// let buffer = vec!["a", "b"].into_iter().share();
    /// let items: Vec<&str> = buffer
    ///     .reader()
    ///     .unwrap()
    ///     .into_stream()
    ///     .map(Result::unwrap)
    ///     .collect()
    ///     .await;
    /// assert_eq!(items, vec!["a", "b"]);
    /// # });
    /// ```
    pub fn into_stream(self) -> ReaderStream<S> {
        ReaderStream { reader: self }
    }

    fn step(&mut self) -> Result<Option<S::Item>, S::Error> {
        if self.state == ReaderState::Disposed {
            return Err(Error::Disposed);
        }
        match self.core.advance(self.ticket, self.position) {
            Ok(Some(item)) => {
                self.position += 1;
                self.state = ReaderState::Iterating;
                Ok(Some(item))
            }
            Ok(None) => {
                self.current = None;
                self.state = ReaderState::Exhausted;
                Ok(None)
            }
            // Nothing happened; the reader may retry from where it stands.
            Err(Error::Busy) => Err(Error::Busy),
            Err(err) => {
                self.current = None;
                self.state = ReaderState::Faulted;
                Err(err)
            }
        }
    }
}

/// Yields `Ok` elements until the source ends, or a single `Err` and then
/// `None`. Unlike [`Reader::move_next`], the iterator is fused after an error.
impl<S> Iterator for Reader<S>
where
    S: Source,
    S::Item: Clone,
{
    type Item = Result<S::Item, S::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.fused = true;
                None
            }
            Err(err) => {
                self.fused = true;
                Some(Err(err))
            }
        }
    }
}

impl<S> std::iter::FusedIterator for Reader<S>
where
    S: Source,
    S::Item: Clone,
{
}

/// A [`Reader`] adapted to [`Stream`]. See [`Reader::into_stream`].
///
/// Pulls are synchronous, so the stream is always ready.
pub struct ReaderStream<S>
where
    S: Source,
    S::Item: Clone,
{
    reader: Reader<S>,
}

impl<S> ReaderStream<S>
where
    S: Source,
    S::Item: Clone,
{
    /// Returns the underlying reader, at the position the stream reached.
    pub fn into_inner(self) -> Reader<S> {
        self.reader
    }
}

impl<S> Stream for ReaderStream<S>
where
    S: Source,
    S::Item: Clone + Unpin,
{
    type Item = Result<S::Item, S::Error>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.reader.next())
    }
}

impl<S> FusedStream for ReaderStream<S>
where
    S: Source,
    S::Item: Clone + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.reader.fused
    }
}

impl<S> Drop for Reader<S>
where
    S: Source,
    S::Item: Clone,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S> std::fmt::Debug for Reader<S>
where
    S: Source,
    S::Item: Clone + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("position", &self.position)
            .field("current", &self.current)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
