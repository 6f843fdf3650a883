use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use crate::cursor::{Lent, SourceCursor};
use crate::error::{Error, Result};
use crate::source::Source;

/// How much of the already-consumed prefix a buffer keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retention {
    /// Everything, forever (memoize).
    All,
    /// Only what the slowest live reader still needs (share).
    SlowestReader,
}

/// Where elements are served from. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backing {
    /// Pulled lazily from the source into the store.
    Buffered,
    /// Read straight out of the source's own slice; nothing is copied.
    Proxy,
}

/// Where the current generation stands with respect to the source.
#[derive(Debug)]
pub(crate) enum State<E> {
    NotStarted,
    /// The source is open. `driver` is the reader that pulled last.
    InProgress {
        driver: u64,
    },
    Completed,
    Faulted(Arc<E>),
    /// The source panicked mid-pull and its pass was lost.
    Poisoned,
}

/// Append-only element store addressed by logical position.
///
/// `offset` is the logical position of `items[0]`; it only moves when the
/// share policy trims the front.
#[derive(Debug)]
struct Store<T> {
    items: VecDeque<T>,
    offset: usize,
}

impl<T> Store<T> {
    fn new() -> Self {
        Store {
            items: VecDeque::new(),
            offset: 0,
        }
    }

    /// One past the last element ever appended in this generation.
    fn frontier(&self) -> usize {
        self.offset + self.items.len()
    }

    fn get(&self, position: usize) -> Option<&T> {
        position
            .checked_sub(self.offset)
            .and_then(|index| self.items.get(index))
    }

    fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
    }

    /// Removes every element before `floor` and hands them back, so the
    /// caller decides where they are dropped.
    fn trim_to(&mut self, floor: usize) -> Vec<T> {
        let count = floor.saturating_sub(self.offset).min(self.items.len());
        self.offset += count;
        self.items.drain(..count).collect()
    }

    fn take(&mut self) -> VecDeque<T> {
        self.offset = 0;
        std::mem::take(&mut self.items)
    }
}

/// Identifies a registered reader and the generation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub(crate) id: u64,
    pub(crate) generation: u64,
}

pub(crate) struct Core<S: Source> {
    cursor: SourceCursor<S>,
    store: Store<S::Item>,
    state: State<S::Error>,
    retention: Retention,
    backing: Backing,
    // Logical position of every live reader in this generation.
    readers: BTreeMap<u64, usize>,
    next_reader: u64,
    generation: u64,
    disposed: bool,
    // Set while the source or its iterator is lent out for a pull.
    advancing: bool,
    // Elements handed out by a proxy buffer in this generation.
    proxy_frontier: usize,
    #[cfg(feature = "stats")]
    stats: crate::stats::Stats,
}

impl<S: Source> Core<S> {
    fn check(&self, generation: u64) -> Result<(), S::Error> {
        if self.disposed {
            Err(Error::Disposed)
        } else if generation != self.generation {
            Err(Error::Stale)
        } else {
            Ok(())
        }
    }

    /// Moves a reader forward. Returns the elements no live reader needs
    /// any more; they must be dropped after the lock is released.
    #[must_use]
    fn record(&mut self, id: u64, position: usize) -> Vec<S::Item> {
        if let Some(slot) = self.readers.get_mut(&id) {
            *slot = position;
        }
        self.trim()
    }

    #[must_use]
    fn trim(&mut self) -> Vec<S::Item> {
        if self.retention != Retention::SlowestReader {
            return Vec::new();
        }
        let floor = self
            .readers
            .values()
            .min()
            .copied()
            .unwrap_or_else(|| self.store.frontier());
        let trimmed = self.store.trim_to(floor);
        if !trimmed.is_empty() {
            trace!(floor, trimmed = trimmed.len(), "trimmed shared buffer");
        }
        trimmed
    }

    fn drop_readers(&mut self) {
        #[cfg(feature = "stats")]
        self.stats.readers_dropped(self.readers.len() as u64);
        self.readers.clear();
    }
}

/// Shared handle to a buffer's state.
///
/// Every policy handle and every reader holds one of these. The lock is
/// only held for bookkeeping: the source and its iterator are lent out of
/// the core while they run, and elements leaving the buffer are dropped
/// after the lock is released, so user code that calls back into the buffer
/// gets an error instead of a deadlock.
///
/// Readers must not be driven in parallel from several threads; a pull
/// that finds another pull in flight fails with [`Error::Busy`].
pub(crate) struct BufferCore<S: Source> {
    shared: Arc<Mutex<Core<S>>>,
}

impl<S: Source> Clone for BufferCore<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> BufferCore<S>
where
    S: Source,
    S::Item: Clone,
{
    pub(crate) fn new(source: S, retention: Retention, backing: Backing) -> Self {
        let core = Core {
            cursor: SourceCursor::new(source),
            store: Store::new(),
            state: State::NotStarted,
            retention,
            backing,
            readers: BTreeMap::new(),
            next_reader: 0,
            generation: 0,
            disposed: false,
            advancing: false,
            proxy_frontier: 0,
            #[cfg(feature = "stats")]
            stats: crate::stats::Stats::new(),
        };
        BufferCore {
            shared: Arc::new(Mutex::new(core)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Core<S>> {
        // Only `Clone` of an element runs under the lock; state stays consistent if it panics.
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new reader, returning its ticket and starting position.
    ///
    /// Readers start at the oldest retained element: position 0 for a
    /// memoizing buffer, the slowest live reader's position for a shared one.
    pub(crate) fn register(&self) -> Result<(Ticket, usize), S::Error> {
        let mut core = self.lock();
        if core.disposed {
            return Err(Error::Disposed);
        }
        let id = core.next_reader;
        core.next_reader += 1;
        let position = core.store.offset;
        core.readers.insert(id, position);
        #[cfg(feature = "stats")]
        core.stats.reader_opened();
        let ticket = Ticket {
            id,
            generation: core.generation,
        };
        Ok((ticket, position))
    }

    /// Forgets a reader. Stale or unknown tickets are ignored.
    pub(crate) fn release(&self, ticket: Ticket) {
        let mut core = self.lock();
        if core.disposed || core.generation != ticket.generation {
            return;
        }
        if core.readers.remove(&ticket.id).is_some() {
            #[cfg(feature = "stats")]
            core.stats.reader_closed();
            let trimmed = core.trim();
            drop(core);
            drop(trimmed);
        }
    }

    /// Produces the element at `position` for the reader holding `ticket`.
    ///
    /// Behind the frontier this is a replay from the store. At the frontier
    /// the caller becomes the driver and pulls the source itself. `Ok(None)`
    /// means the source is exhausted.
    pub(crate) fn advance(&self, ticket: Ticket, position: usize) -> Result<Option<S::Item>, S::Error> {
        let mut core = self.lock();
        core.check(ticket.generation)?;

        if core.backing == Backing::Proxy {
            let item = core
                .cursor
                .as_slice()
                .and_then(|items| items.get(position))
                .cloned();
            if item.is_some() {
                core.proxy_frontier = core.proxy_frontier.max(position + 1);
                let _ = core.record(ticket.id, position + 1);
            }
            return Ok(item);
        }

        if let Some(item) = core.store.get(position).cloned() {
            let trimmed = core.record(ticket.id, position + 1);
            drop(core);
            drop(trimmed);
            return Ok(Some(item));
        }
        debug_assert_eq!(position, core.store.frontier());

        match &core.state {
            State::Faulted(fault) => return Err(Error::Upstream(Arc::clone(fault))),
            State::Completed => return Ok(None),
            State::Poisoned => return Err(Error::Poisoned),
            State::NotStarted | State::InProgress { .. } => {}
        }
        if core.advancing {
            return Err(Error::Busy);
        }

        let lent = core.cursor.lend()?;
        core.advancing = true;
        drop(core);

        let mut guard = PullGuard {
            core: self,
            source: None,
            armed: true,
        };
        let (pass, fresh) = match lent {
            Lent::Pass(iter) => (Some(iter), false),
            Lent::Unopened(source) => (guard.source.insert(source).open(), true),
        };
        // Only an exact length is worth reserving for.
        let hint = match pass.as_ref().map(Iterator::size_hint) {
            Some((lower, Some(upper))) if fresh && lower == upper => lower,
            _ => 0,
        };
        let pulled = pass.map(|mut iter| {
            let next = iter.next();
            (iter, next)
        });
        let source = guard.disarm();

        let mut core = self.lock();
        core.advancing = false;

        if core.disposed {
            drop(core);
            drop((source, pulled));
            return Err(Error::Disposed);
        }
        if let Some(source) = source {
            core.cursor.put_back(source);
        }
        let Some((iter, next)) = pulled else {
            debug!(generation = core.generation, "source cannot be reopened");
            return Err(Error::ReopenNotSupported);
        };
        if fresh {
            if core.retention == Retention::All {
                core.store.reserve(hint);
            }
            debug!(generation = core.generation, hint, "opened source");
        }
        #[cfg(feature = "stats")]
        core.stats.pulled();

        match next {
            Some(Ok(item)) => {
                if let State::InProgress { driver } = core.state {
                    if driver != ticket.id {
                        trace!(from = driver, to = ticket.id, "reader took over driving the source");
                    }
                }
                core.state = State::InProgress { driver: ticket.id };
                core.cursor.restore(iter);
                core.store.push(item.clone());
                let trimmed = core.record(ticket.id, position + 1);
                trace!(position, driver = ticket.id, "pulled element");
                drop(core);
                drop(trimmed);
                Ok(Some(item))
            }
            Some(Err(fault)) => {
                let fault = Arc::new(fault);
                core.state = State::Faulted(Arc::clone(&fault));
                debug!(generation = core.generation, position, "source faulted");
                drop(core);
                drop(iter);
                Err(Error::Upstream(fault))
            }
            None => {
                core.state = State::Completed;
                debug!(generation = core.generation, length = position, "source completed");
                drop(core);
                drop(iter);
                Ok(None)
            }
        }
    }

    /// Number of elements materialized in this generation.
    ///
    /// A proxy buffer reports how far its readers have got, since its
    /// elements are never copied.
    pub(crate) fn frontier(&self) -> Result<usize, S::Error> {
        let core = self.lock();
        if core.disposed {
            return Err(Error::Disposed);
        }
        Ok(match core.backing {
            Backing::Proxy => core.proxy_frontier,
            Backing::Buffered => core.store.frontier(),
        })
    }

    /// Number of elements currently held in the store.
    pub(crate) fn retained(&self) -> Result<usize, S::Error> {
        let core = self.lock();
        if core.disposed {
            return Err(Error::Disposed);
        }
        Ok(core.store.items.len())
    }

    /// Starts a new generation: drops every element, rewinds the source and
    /// invalidates all existing readers.
    pub(crate) fn reset(&self) -> Result<(), S::Error> {
        let mut core = self.lock();
        if core.disposed {
            return Err(Error::Disposed);
        }
        if core.advancing {
            return Err(Error::ResetDuringIteration);
        }
        let iter = core.cursor.rewind();
        let items = core.store.take();
        core.proxy_frontier = 0;
        core.state = State::NotStarted;
        core.drop_readers();
        core.generation += 1;
        #[cfg(feature = "stats")]
        core.stats.reset();
        debug!(generation = core.generation, "buffer reset");
        drop(core);
        drop((iter, items));
        Ok(())
    }

    /// Releases the source and every element. Idempotent.
    ///
    /// A pull in flight when this runs completes with [`Error::Disposed`].
    pub(crate) fn dispose(&self) {
        let mut core = self.lock();
        if core.disposed {
            return;
        }
        core.disposed = true;
        let released = core.cursor.release();
        let items = core.store.take();
        core.drop_readers();
        debug!(generation = core.generation, "buffer disposed");
        drop(core);
        drop((released, items));
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    pub(crate) fn backing(&self) -> Backing {
        self.lock().backing
    }

    #[cfg(feature = "stats")]
    pub(crate) fn stats(&self) -> crate::stats::Stats {
        self.lock().stats.clone()
    }
}

/// Marks the core poisoned if the source unwinds out of an open or a pull,
/// and hands a lent source back to the core.
struct PullGuard<'a, S>
where
    S: Source,
    S::Item: Clone,
{
    core: &'a BufferCore<S>,
    source: Option<S>,
    armed: bool,
}

impl<S> PullGuard<'_, S>
where
    S: Source,
    S::Item: Clone,
{
    fn disarm(mut self) -> Option<S> {
        self.armed = false;
        self.source.take()
    }
}

impl<S> Drop for PullGuard<'_, S>
where
    S: Source,
    S::Item: Clone,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut source = self.source.take();
        let mut core = self.core.lock();
        core.advancing = false;
        if !core.disposed {
            core.state = State::Poisoned;
            if let Some(source) = source.take() {
                core.cursor.put_back(source);
            }
        }
        warn!(generation = core.generation, "source panicked during a pull");
        drop(core);
        drop(source);
    }
}
