use crate::error::Error;
use crate::source::Source;

/// What [`SourceCursor::lend`] hands out for a single pull.
pub(crate) enum Lent<S: Source> {
    /// The pass already open in this generation.
    Pass(S::Iter),
    /// The source itself; the borrower opens the pass and returns the
    /// source through [`SourceCursor::put_back`].
    Unopened(S),
}

/// Owns a [`Source`] and the (at most one) pass currently open over it.
///
/// The cursor does not serialize pulls itself; the buffer core lends the
/// open iterator, or the source to open, to exactly one caller at a time and
/// takes it back after. Apart from [`as_slice`](Self::as_slice), nothing
/// here calls into the source, so the core can keep its lock while using it.
pub(crate) struct SourceCursor<S: Source> {
    source: Option<S>,
    iter: Option<S::Iter>,
    // Whether this generation has already opened a pass.
    opened: bool,
}

impl<S: Source> SourceCursor<S> {
    pub(crate) fn new(source: S) -> Self {
        SourceCursor {
            source: Some(source),
            iter: None,
            opened: false,
        }
    }

    /// The materialized view of the source, when it has one.
    pub(crate) fn as_slice(&self) -> Option<&[S::Item]> {
        self.source.as_ref().and_then(Source::as_slice)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.iter.is_some()
    }

    /// Hands out the open pass, or the source itself when this generation
    /// has not opened one yet.
    ///
    /// A pass must come back through [`restore`](Self::restore) unless it
    /// has ended; a lent source must come back through
    /// [`put_back`](Self::put_back) unless the cursor was released meanwhile.
    pub(crate) fn lend(&mut self) -> Result<Lent<S>, Error<S::Error>> {
        if let Some(iter) = self.iter.take() {
            return Ok(Lent::Pass(iter));
        }
        if self.opened {
            return Err(Error::ReopenNotSupported);
        }
        let source = self.source.take().ok_or(Error::Disposed)?;
        self.opened = true;
        Ok(Lent::Unopened(source))
    }

    pub(crate) fn restore(&mut self, iter: S::Iter) {
        debug_assert!(self.iter.is_none());
        self.iter = Some(iter);
    }

    pub(crate) fn put_back(&mut self, source: S) {
        debug_assert!(self.source.is_none());
        self.source = Some(source);
    }

    /// Ends the open pass, if any. Idempotent.
    ///
    /// The iterator is returned rather than dropped so the caller can release
    /// it after giving up any locks.
    pub(crate) fn close(&mut self) -> Option<S::Iter> {
        self.iter.take()
    }

    /// Closes the pass and allows the next generation to open a new one.
    pub(crate) fn rewind(&mut self) -> Option<S::Iter> {
        self.opened = false;
        self.close()
    }

    /// Gives up the source itself. Every later open fails with `Disposed`.
    pub(crate) fn release(&mut self) -> (Option<S>, Option<S::Iter>) {
        (self.source.take(), self.close())
    }
}
