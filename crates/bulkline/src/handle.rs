use crate::{AccumulatorStats, BulkAccumulator, SinkRegistry};
use core::marker::PhantomData;

/// Splits raw input into command lines.
///
/// Lines end at `\n` or `\r\n`; empty lines are skipped and never become part
/// of a bulk.
pub fn command_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter(|line| !line.is_empty())
}

/// A client connection to a [`SinkRegistry`].
///
/// Owns one [`BulkAccumulator`] with every registry sink attached. The handle
/// borrows the registry, so the registry cannot be shut down while a handle
/// is still open. Dropping a handle behaves like [`close`](Self::close).
pub struct Handle<'r> {
    accumulator: BulkAccumulator,
    closed: bool,
    _registry: PhantomData<&'r SinkRegistry>,
}

impl<'r> Handle<'r> {
    pub(crate) fn new(accumulator: BulkAccumulator) -> Self {
        Self {
            accumulator,
            closed: false,
            _registry: PhantomData,
        }
    }

    /// Feeds a chunk of text, one command per line.
    ///
    /// Empty lines are ignored. An unmatched close delimiter is logged,
    /// counted in [`AccumulatorStats::unmatched_closes`] and skipped; the
    /// remaining lines are still processed.
    pub fn feed(&mut self, text: &str) {
        for line in command_lines(text) {
            if let Err(_e) = self.accumulator.ingest(line) {
                #[cfg(feature = "tracing")]
                tracing::warn!("Ignoring line {line:?}: {_e}");
            }
        }
    }

    pub const fn accumulator(&self) -> &BulkAccumulator {
        &self.accumulator
    }

    /// Mutable access, e.g. to attach or detach sinks for this handle only.
    pub const fn accumulator_mut(&mut self) -> &mut BulkAccumulator {
        &mut self.accumulator
    }

    /// Closes the handle, flushing the partial bulk unless a block is still
    /// open, and returns the accumulator's final counters.
    pub fn close(mut self) -> AccumulatorStats {
        self.close_once();
        self.accumulator.stats()
    }

    /// Closes the accumulator the first time only; returns whether it did.
    fn close_once(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.accumulator.close();
        true
    }
}

impl Drop for Handle<'_> {
    fn drop(&mut self) {
        self.close_once();
    }
}

impl core::fmt::Debug for Handle<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handle")
            .field("accumulator", &self.accumulator)
            .finish()
    }
}
