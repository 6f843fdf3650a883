//! Extension traits for turning iterators into shared buffers.
//!
//! [`SequenceExt`] adds `memoize` and `share` to every [`Iterator`];
//! [`TrySequenceExt`] adds `try_memoize` and `try_share` to iterators of
//! `Result`, whose errors are captured and replayed to every reader.
//!
//! Both wrap the iterator as a one-shot source, so the resulting buffer
//! cannot start a second pass after `reset()`. Use [`source::replayable`]
//! or [`source::from_fn`] for that.

use crate::source::{self, Once, TryOnce};
use crate::{Memoize, Share};

/// Extension trait for [`Iterator`] providing `memoize` and `share`.
pub trait SequenceExt: Iterator {
    /// Converts this iterator into a [`Memoize`] buffer.
    ///
    /// ```
    /// use iter_shared::SequenceExt;
    ///
    /// let buffer = "abc".chars().memoize();
    /// let first: String = buffer.reader().unwrap().map(Result::unwrap).collect();
    /// let second: String = buffer.reader().unwrap().map(Result::unwrap).collect();
    /// assert_eq!(first, "abc");
    /// assert_eq!(second, "abc");
    /// ```
    fn memoize(self) -> Memoize<Once<Self>>
    where
        Self: Sized,
        Self::Item: Clone,
    {
        Memoize::new(source::once(self))
    }

    /// Converts this iterator into a [`Share`] buffer.
    fn share(self) -> Share<Once<Self>>
    where
        Self: Sized,
        Self::Item: Clone,
    {
        Share::new(source::once(self))
    }
}

impl<I> SequenceExt for I where I: Iterator {}

/// Extension trait for iterators of `Result` providing `try_memoize` and `try_share`.
pub trait TrySequenceExt<T, E>: Iterator<Item = Result<T, E>> {
    /// Converts this iterator into a [`Memoize`] buffer that replays errors.
    ///
    /// ```
    /// use iter_shared::TrySequenceExt;
    ///
    /// let rows = vec![Ok(1), Err("truncated")].into_iter();
    /// let buffer = rows.try_memoize();
    /// for _ in 0..2 {
    ///     let mut reader = buffer.reader().unwrap();
    ///     assert!(reader.move_next().unwrap());
    ///     assert_eq!(**reader.move_next().unwrap_err().upstream().unwrap(), "truncated");
    /// }
    /// ```
    fn try_memoize(self) -> Memoize<TryOnce<Self>>
    where
        Self: Sized,
        T: Clone,
    {
        Memoize::new(source::try_once(self))
    }

    fn try_share(self) -> Share<TryOnce<Self>>
    where
        Self: Sized,
        T: Clone,
    {
        Share::new(source::try_once(self))
    }
}

impl<I, T, E> TrySequenceExt<T, E> for I where I: Iterator<Item = Result<T, E>> {}
