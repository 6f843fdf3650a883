use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Runtime counters for a buffer.
///
/// A lightweight, read-only view obtained from `Memoize::stats()` or
/// `Share::stats()`. Values use relaxed atomics and are intended for
/// diagnostics, so they can be read without touching the buffer's lock.
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
#[derive(Debug, Clone, Default)]
pub struct Stats {
    active_readers: Arc<AtomicU64>,
    pulls: Arc<AtomicU64>,
    resets: Arc<AtomicU64>,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reader_opened(&self) {
        self.active_readers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reader_closed(&self) {
        self.active_readers.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn readers_dropped(&self, count: u64) {
        self.active_readers.fetch_sub(count, Ordering::Relaxed);
    }

    pub(crate) fn pulled(&self) {
        self.pulls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Readers registered with the current generation and not yet disposed.
    pub fn active_readers(&self) -> u64 {
        self.active_readers.load(Ordering::Relaxed)
    }

    /// Elements pulled from the upstream source, across all generations.
    pub fn pulls(&self) -> u64 {
        self.pulls.load(Ordering::Relaxed)
    }

    /// Completed `reset()` calls.
    pub fn resets(&self) -> u64 {
        self.resets.load(Ordering::Relaxed)
    }
}
