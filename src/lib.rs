//! Memoized and shared iterators: many independent readers over one
//! single-pass source.
//!
//! [`Memoize`] and [`Share`] wrap a [`Source`] so any number of [`Reader`]s
//! can walk it independently while the source itself is pulled at most once
//! per element. Nothing is pulled until a reader asks for an element.
//!
//! # Examples
//!
//! ```
//! use iter_shared::{memoize, source};
//!
//! let data = vec![1, 2, 3, 4, 5];
//! let buffer = memoize(source::once(data.clone().into_iter()));
//!
//! // Create multiple readers
//! let reader1 = buffer.reader().unwrap();
//! let reader2 = buffer.reader().unwrap();
//!
//! // Both readers receive all items
//! let result1: Vec<i32> = reader1.map(Result::unwrap).collect();
//! let result2: Vec<i32> = reader2.map(Result::unwrap).collect();
//!
//! assert_eq!(result1, data);
//! assert_eq!(result2, data);
//! assert_eq!(buffer.count().unwrap(), 5);
//! ```
//!
//! # Requirements
//!
//! Elements must implement [`Clone`]: every reader receives its own copy.
//! Prefer cheap-to-clone items and wrap large ones in [`Arc`](std::sync::Arc).
//!
//! A source is anything implementing [`Source`]. The [`source`] module
//! provides one-shot sources over plain iterators ([`source::once`],
//! [`source::try_once`]) and replayable ones ([`source::replayable`],
//! [`source::from_fn`], [`source::collection`]). Only replayable sources can
//! start a second pass after [`Memoize::reset`].
//!
//! # Behavior
//!
//! - A reader behind the frontier replays elements from the buffer.
//! - A reader at the frontier pulls the next element from the source itself;
//!   every other reader sees that element when it gets there.
//! - When the source fails, the error is captured once and every reader that
//!   reaches that position gets the very same error value
//!   ([`Error::Upstream`]), on every attempt, until the buffer is reset.
//! - [`Memoize`] keeps everything, so new readers always start from the
//!   first element. [`Share`] drops elements every live reader has passed,
//!   so new readers start at the slowest live reader.
//! - `reset()` starts a new generation and invalidates older readers
//!   ([`Error::Stale`]); `dispose()` releases the source and ends the buffer
//!   for good ([`Error::Disposed`]).
//!
//! ```
//! use iter_shared::{memoize, source, Error};
//!
//! let buffer = memoize(source::from_fn(|| vec![Ok(1), Err("lost connection")]));
//! let mut first = buffer.reader().unwrap();
//! let mut second = buffer.reader().unwrap();
//!
//! assert!(first.move_next().unwrap());
//! let fault = first.move_next().unwrap_err();
//!
//! assert!(second.move_next().unwrap());
//! let replayed = second.move_next().unwrap_err();
//! assert!(std::sync::Arc::ptr_eq(
//!     fault.upstream().unwrap(),
//!     replayed.upstream().unwrap()
//! ));
//!
//! buffer.reset().unwrap();
//! assert!(matches!(first.move_next(), Err(Error::Stale)));
//! ```
//!
//! # Thread Safety
//!
//! Handles and readers are [`Send`] and [`Sync`] when the source, its
//! iterator, its items and its errors are. They may be moved across threads
//! and driven from different threads in turn, but readers must not pull from
//! the source in parallel: a reader that reaches the frontier while another
//! pull is in flight gets [`Error::Busy`] rather than waiting.
//!
//! The buffer never holds its lock while the source opens or runs, nor while
//! elements leaving the buffer are dropped, so code that calls back into its
//! own buffer gets an error ([`Error::Busy`],
//! [`Error::ResetDuringIteration`]) instead of a deadlock.
//!
//! # Async consumers
//!
//! [`Reader::into_stream`] adapts a reader into a
//! [`futures_util::Stream`] that is always ready.
//!
//! ```
//! use futures_util::StreamExt;
//! use iter_shared::SequenceExt;
//!
//! # tokio_test::block_on(async {
//! let buffer = vec![1, 2, 3].into_iter().memoize();
//! let consumer1 = buffer.reader().unwrap().into_stream();
//! let consumer2 = buffer.reader().unwrap().into_stream();
//!
//! let (result1, result2) = tokio::join!(
//!     consumer1.map(Result::unwrap).collect::<Vec<i32>>(),
//!     consumer2.map(Result::unwrap).collect::<Vec<i32>>()
//! );
//! assert_eq!(result1, vec![1, 2, 3]);
//! assert_eq!(result2, vec![1, 2, 3]);
//! # });
//! ```
//!
//! # Performance Considerations
//!
//! - **Memory**: [`Memoize`] grows without bound; [`Share`] holds only the
//!   span between its slowest and fastest live reader.
//! - **Copies**: each element is cloned once into the buffer and once per
//!   reader. A [`Memoize`] built with `force_cache` turned off in its
//!   [`MemoizeOptions`] serves a [`source::collection`] without copying it
//!   into a buffer at all.
//! - **Synchronization**: every step takes a short uncontended lock.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod buffer;
mod cursor;
mod error;
mod ext;
mod memoize;
mod reader;
mod share;
pub mod source;
#[cfg(feature = "stats")]
mod stats;
#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use ext::{SequenceExt, TrySequenceExt};
pub use memoize::{Memoize, MemoizeOptions};
pub use reader::{Reader, ReaderState, ReaderStream};
pub use share::Share;
pub use source::Source;
#[cfg(feature = "stats")]
pub use stats::Stats;

/// Creates a [`Memoize`] buffer over `source`.
pub fn memoize<S>(source: S) -> Memoize<S>
where
    S: Source,
    S::Item: Clone,
{
    Memoize::new(source)
}

/// Creates a [`Memoize`] buffer over `source` with explicit options.
///
/// ```
/// use iter_shared::{memoize_with, source, MemoizeOptions};
///
/// let options = MemoizeOptions::default().force_cache(false);
/// let buffer = memoize_with(source::collection(vec![1, 2, 3]), options);
/// assert!(buffer.is_proxy());
///
/// let all: Vec<i32> = buffer.reader().unwrap().map(Result::unwrap).collect();
/// assert_eq!(all, vec![1, 2, 3]);
/// assert_eq!(buffer.count().unwrap(), 3);
/// ```
pub fn memoize_with<S>(source: S, options: MemoizeOptions) -> Memoize<S>
where
    S: Source,
    S::Item: Clone,
{
    Memoize::with_options(source, options)
}

/// Creates a [`Share`] buffer over `source`.
pub fn share<S>(source: S) -> Share<S>
where
    S: Source,
    S::Item: Clone,
{
    Share::new(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_partial_reader_does_not_disturb_a_full_one() {
        let buffer = memoize(source::replayable(0..10));
        let mut partial = buffer.reader().unwrap();
        for _ in 0..3 {
            assert!(partial.move_next().unwrap());
        }
        partial.dispose();

        let full: Vec<i32> = buffer.reader().unwrap().map(Result::unwrap).collect();
        assert_eq!(full, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_source() {
        let buffer = memoize(source::once(std::iter::empty::<u8>()));
        let mut first = buffer.reader().unwrap();
        let mut second = buffer.reader().unwrap();

        assert!(!first.move_next().unwrap());
        assert!(!second.move_next().unwrap());
        assert_eq!(buffer.count().unwrap(), 0);
    }

    #[test]
    fn test_infinite_source_is_pulled_lazily() {
        let buffer = share(source::once((0u64..).map(|i| i * i)));
        let taken: Vec<u64> = buffer.reader().unwrap().take(5).map(Result::unwrap).collect();
        assert_eq!(taken, vec![0, 1, 4, 9, 16]);

        let mut next = buffer.reader().unwrap();
        assert!(next.move_next().unwrap());
        assert_eq!(next.current(), Some(&25));
    }

    #[test]
    fn test_memoize_over_an_unbounded_source() {
        let buffer = memoize(source::once(0u32..));
        let taken: Vec<u32> = buffer.reader().unwrap().take(3).map(Result::unwrap).collect();
        assert_eq!(taken, vec![0, 1, 2]);
        assert_eq!(buffer.count().unwrap(), 3);
    }

    #[test]
    fn test_with_string_data() {
        let messages = vec!["hello".to_string(), "world".to_string()];
        let buffer = memoize(source::collection(messages.clone()));

        let first: Vec<String> = buffer.reader().unwrap().map(Result::unwrap).collect();
        let second: Vec<String> = buffer.reader().unwrap().map(Result::unwrap).collect();
        assert_eq!(first, messages);
        assert_eq!(second, messages);
    }

    #[test]
    fn test_readers_driven_from_other_threads() {
        let buffer = memoize(source::replayable(1..=100));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mut reader = buffer.reader().unwrap();
                std::thread::spawn(move || {
                    let mut sum = 0;
                    loop {
                        match reader.move_next() {
                            Ok(true) => sum += *reader.current().unwrap(),
                            Ok(false) => break sum,
                            // Another thread is pulling; the position is unchanged.
                            Err(Error::Busy) => std::thread::yield_now(),
                            Err(err) => panic!("unexpected error: {err}"),
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 5050);
        }
        assert_eq!(buffer.count().unwrap(), 100);
    }

    #[test]
    fn test_error_type_for_infallible_sources() {
        let buffer = memoize(source::replayable(vec![1]));
        let items: Vec<Result<i32, Infallible>> = buffer.reader().unwrap().collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }
}
