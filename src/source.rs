//! Upstream sources a buffer can pull from.
//!
//! A [`Source`] is anything that can start a pass over a sequence of
//! `Result<Item, Error>` values. Buffers open a source once per generation
//! and pull from it lazily; a source that cannot produce a second pass
//! returns `None` from [`Source::open`], which buffers report as
//! [`Error::ReopenNotSupported`](crate::Error::ReopenNotSupported) after a reset.

use std::convert::Infallible;
use std::iter::Map;
use std::sync::Arc;

/// A producer of single-pass sequences, restartable only by reopening.
pub trait Source {
    type Item;
    type Error;
    type Iter: Iterator<Item = Result<Self::Item, Self::Error>>;

    /// Begins a fresh pass, or returns `None` if the source is spent.
    fn open(&mut self) -> Option<Self::Iter>;

    /// Exposes the whole sequence when it is already materialized.
    ///
    /// Memoizing buffers built without `force_cache` use this to hand out
    /// readers over the existing storage instead of copying it.
    fn as_slice(&self) -> Option<&[Self::Item]> {
        None
    }
}

type Infallibly<T> = fn(T) -> Result<T, Infallible>;

/// One-shot source over an infallible iterator. See [`once`].
#[derive(Debug)]
pub struct Once<I> {
    iter: Option<I>,
}

/// Wraps an iterator that can be walked exactly once.
///
/// ```
/// use iter_shared::{memoize, source};
///
/// let buffer = memoize(source::once(vec![1, 2, 3].into_iter()));
/// let items: Vec<i32> = buffer.reader().unwrap().map(Result::unwrap).collect();
/// assert_eq!(items, vec![1, 2, 3]);
/// ```
pub fn once<I: Iterator>(iter: I) -> Once<I> {
    Once { iter: Some(iter) }
}

impl<I: Iterator> Source for Once<I> {
    type Item = I::Item;
    type Error = Infallible;
    type Iter = Map<I, Infallibly<I::Item>>;

    fn open(&mut self) -> Option<Self::Iter> {
        self.iter.take().map(|iter| iter.map(Ok as Infallibly<I::Item>))
    }
}

/// One-shot source over an iterator of results. See [`try_once`].
#[derive(Debug)]
pub struct TryOnce<I> {
    iter: Option<I>,
}

/// Wraps a fallible iterator that can be walked exactly once.
pub fn try_once<I, T, E>(iter: I) -> TryOnce<I>
where
    I: Iterator<Item = Result<T, E>>,
{
    TryOnce { iter: Some(iter) }
}

impl<I, T, E> Source for TryOnce<I>
where
    I: Iterator<Item = Result<T, E>>,
{
    type Item = T;
    type Error = E;
    type Iter = I;

    fn open(&mut self) -> Option<I> {
        self.iter.take()
    }
}

/// Source that clones an iterable for every pass. See [`replayable`].
#[derive(Debug, Clone)]
pub struct Replayable<C> {
    items: C,
}

/// Wraps a clonable iterable (a range, a `Vec`, ...) so every reset replays it.
pub fn replayable<C>(items: C) -> Replayable<C>
where
    C: IntoIterator + Clone,
{
    Replayable { items }
}

impl<C> Source for Replayable<C>
where
    C: IntoIterator + Clone,
{
    type Item = C::Item;
    type Error = Infallible;
    type Iter = Map<C::IntoIter, Infallibly<C::Item>>;

    fn open(&mut self) -> Option<Self::Iter> {
        Some(self.items.clone().into_iter().map(Ok as Infallibly<C::Item>))
    }
}

/// Source that calls a factory for every pass. See [`from_fn`].
pub struct FromFn<F> {
    factory: F,
}

/// Builds a fallible source from a factory invoked once per pass.
///
/// ```
/// use iter_shared::{memoize, source};
///
/// let buffer = memoize(source::from_fn(|| vec![Ok(1), Err("bad row")]));
/// let mut reader = buffer.reader().unwrap();
/// assert_eq!(reader.next().unwrap().unwrap(), 1);
/// assert!(reader.next().unwrap().is_err());
/// ```
pub fn from_fn<F, I, T, E>(factory: F) -> FromFn<F>
where
    F: FnMut() -> I,
    I: IntoIterator<Item = Result<T, E>>,
{
    FromFn { factory }
}

impl<F, I, T, E> Source for FromFn<F>
where
    F: FnMut() -> I,
    I: IntoIterator<Item = Result<T, E>>,
{
    type Item = T;
    type Error = E;
    type Iter = I::IntoIter;

    fn open(&mut self) -> Option<Self::Iter> {
        Some((self.factory)().into_iter())
    }
}

impl<F> std::fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}

/// An already materialized, random-access sequence. See [`collection`].
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Arc<[T]>,
}

/// Wraps materialized items; the only stock source exposing [`Source::as_slice`].
pub fn collection<T>(items: impl Into<Arc<[T]>>) -> Collection<T> {
    Collection {
        items: items.into(),
    }
}

impl<T: Clone> Source for Collection<T> {
    type Item = T;
    type Error = Infallible;
    type Iter = CollectionIter<T>;

    fn open(&mut self) -> Option<Self::Iter> {
        Some(CollectionIter {
            items: Arc::clone(&self.items),
            next: 0,
        })
    }

    fn as_slice(&self) -> Option<&[T]> {
        Some(&self.items)
    }
}

/// Pass over a [`Collection`].
#[derive(Debug)]
pub struct CollectionIter<T> {
    items: Arc<[T]>,
    next: usize,
}

impl<T: Clone> Iterator for CollectionIter<T> {
    type Item = Result<T, Infallible>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.get(self.next)?.clone();
        self.next += 1;
        Some(Ok(item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.items.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for CollectionIter<T> {}
