//! Instrumented sources for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::source::Source;

/// A replayable source that counts every `next()` call made on its passes.
pub(crate) struct Counted<T, E> {
    items: Vec<Result<T, E>>,
    materialized: Option<Vec<T>>,
    pulls: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl<T: Clone, E: Clone> Counted<T, E> {
    pub(crate) fn new(items: Vec<Result<T, E>>) -> (Self, Arc<AtomicUsize>) {
        let pulls = Arc::new(AtomicUsize::new(0));
        let source = Counted {
            items,
            materialized: None,
            pulls: Arc::clone(&pulls),
            opens: Arc::new(AtomicUsize::new(0)),
        };
        (source, pulls)
    }

    /// Also exposes the successful items through `as_slice`.
    pub(crate) fn materialized(mut self) -> Self {
        let items = self.items.iter().filter_map(|item| item.clone().ok()).collect();
        self.materialized = Some(items);
        self
    }

    pub(crate) fn opens(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opens)
    }
}

impl<T: Clone, E: Clone> Source for Counted<T, E> {
    type Item = T;
    type Error = E;
    type Iter = CountedIter<T, E>;

    fn open(&mut self) -> Option<Self::Iter> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Some(CountedIter {
            items: self.items.clone().into_iter(),
            pulls: Arc::clone(&self.pulls),
        })
    }

    fn as_slice(&self) -> Option<&[T]> {
        self.materialized.as_deref()
    }
}

pub(crate) struct CountedIter<T, E> {
    items: std::vec::IntoIter<Result<T, E>>,
    pulls: Arc<AtomicUsize>,
}

impl<T, E> Iterator for CountedIter<T, E> {
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

/// A replayable source whose passes run a hook before every pull.
///
/// The hook is installed after the buffer exists so it can call back into it.
pub(crate) struct Hooked<T> {
    items: Vec<T>,
    hook: Hook,
}

pub(crate) type Hook = Arc<std::sync::Mutex<Option<Box<dyn FnMut(usize) + Send>>>>;

impl<T: Clone> Hooked<T> {
    pub(crate) fn new(items: Vec<T>) -> (Self, Hook) {
        let hook: Hook = Arc::new(std::sync::Mutex::new(None));
        let source = Hooked {
            items,
            hook: Arc::clone(&hook),
        };
        (source, hook)
    }
}

impl<T: Clone> Source for Hooked<T> {
    type Item = T;
    type Error = std::convert::Infallible;
    type Iter = HookedIter<T>;

    fn open(&mut self) -> Option<Self::Iter> {
        Some(HookedIter {
            items: self.items.clone().into_iter(),
            hook: Arc::clone(&self.hook),
            position: 0,
        })
    }
}

pub(crate) struct HookedIter<T> {
    items: std::vec::IntoIter<T>,
    hook: Hook,
    position: usize,
}

impl<T> Iterator for HookedIter<T> {
    type Item = Result<T, std::convert::Infallible>;

    fn next(&mut self) -> Option<Self::Item> {
        // Take the hook out so it may re-enter this source without deadlocking.
        let hook = self.hook.lock().unwrap().take();
        if let Some(mut hook) = hook {
            hook(self.position);
            self.hook.lock().unwrap().get_or_insert(hook);
        }
        self.position += 1;
        self.items.next().map(Ok)
    }
}
