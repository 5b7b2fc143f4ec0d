//! The bulk formation state machine.
//!
//! Two rules decide when a bulk is complete:
//!
//! - **Static threshold**: outside of any block, a bulk is flushed as soon as
//!   it holds `threshold` commands.
//! - **Dynamic blocks**: a line holding only [`OPEN_BLOCK`] flushes whatever
//!   is pending and starts a block; the matching [`CLOSE_BLOCK`] flushes the
//!   block's commands. Blocks nest, and only the outermost pair delimits a
//!   bulk. While a block is open the threshold is suspended, so a block can
//!   grow past `threshold`.
//!
//! A flushed bulk is copied into the queue of every attached sink and the
//! working buffer is cleared, so no command is ever delivered twice or lost.

#[cfg(test)]
mod tests;

use crate::{Bulk, Error, Result, SinkWorker, TimeSource};
use core::num::NonZeroUsize;
use std::sync::Arc;

/// Line that opens a dynamic block.
pub const OPEN_BLOCK: &str = "{";

/// Line that closes a dynamic block.
pub const CLOSE_BLOCK: &str = "}";

/// Counters kept by a single accumulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccumulatorStats {
    /// Lines ingested, delimiters included.
    pub lines: u64,
    /// Commands appended to a bulk.
    pub commands: u64,
    /// Non-empty bulks flushed.
    pub bulks: u64,
    /// Close delimiters rejected because no block was open.
    pub unmatched_closes: u64,
}

/// Groups commands into bulks and hands them to the attached sinks.
///
/// An accumulator is driven by a single thread; the sinks it feeds may be
/// shared with any number of other accumulators.
pub struct BulkAccumulator {
    pending: Bulk,
    depth: usize,
    threshold: NonZeroUsize,
    sinks: Vec<Arc<SinkWorker>>,
    clock: Arc<dyn TimeSource>,
    stats: AccumulatorStats,
}

impl BulkAccumulator {
    /// Creates an accumulator with no sinks attached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreshold`] if `threshold` is zero.
    pub fn new(threshold: usize, clock: Arc<dyn TimeSource>) -> Result<Self> {
        let threshold = NonZeroUsize::new(threshold).ok_or(Error::InvalidThreshold)?;
        Ok(Self {
            pending: Bulk::default(),
            depth: 0,
            threshold,
            sinks: Vec::new(),
            clock,
            stats: AccumulatorStats::default(),
        })
    }

    /// Attaches a sink. Attaching the same sink twice has no effect.
    pub fn attach(&mut self, sink: Arc<SinkWorker>) {
        if !self.sinks.iter().any(|s| Arc::ptr_eq(s, &sink)) {
            self.sinks.push(sink);
        }
    }

    /// Detaches a sink, returning whether it was attached.
    pub fn detach(&mut self, sink: &Arc<SinkWorker>) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|s| !Arc::ptr_eq(s, sink));
        self.sinks.len() != before
    }

    pub fn sinks(&self) -> &[Arc<SinkWorker>] {
        &self.sinks
    }

    pub const fn threshold(&self) -> usize {
        self.threshold.get()
    }

    /// Current block nesting depth; zero outside of any block.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Commands collected since the last flush.
    pub fn pending(&self) -> &Bulk {
        &self.pending
    }

    pub const fn stats(&self) -> AccumulatorStats {
        self.stats
    }

    /// Consumes one line of input. Empty lines are ignored and not counted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmatchedClose`] for a close delimiter at depth zero.
    /// The line is discarded and the state is left untouched.
    pub fn ingest(&mut self, line: &str) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }
        self.stats.lines += 1;

        match line {
            OPEN_BLOCK => {
                self.depth += 1;
                if self.depth == 1 {
                    self.flush();
                }
            }
            CLOSE_BLOCK => match self.depth {
                0 => {
                    self.stats.unmatched_closes += 1;
                    return Err(Error::UnmatchedClose);
                }
                1 => {
                    self.depth = 0;
                    self.flush();
                }
                _ => self.depth -= 1,
            },
            command => {
                let clock = &self.clock;
                self.pending
                    .push(command.to_string(), || clock.current_secs());
                self.stats.commands += 1;

                if self.depth == 0 && self.pending.len() == self.threshold.get() {
                    self.flush();
                }
            }
        }

        Ok(())
    }

    /// Hands the pending bulk to every attached sink and clears it.
    ///
    /// Does nothing when no command is pending. Sink errors are logged and
    /// never returned: delivery is fire-and-forget.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let bulk = self.pending.take();
        self.stats.bulks += 1;

        let Some((last, rest)) = self.sinks.split_last() else {
            #[cfg(feature = "tracing")]
            tracing::debug!("No sinks attached, discarding bulk of {}", bulk.len());
            return;
        };

        for sink in rest {
            if let Err(_e) = sink.enqueue(bulk.clone()) {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to deliver bulk: {_e}");
            }
        }
        if let Err(_e) = last.enqueue(bulk) {
            #[cfg(feature = "tracing")]
            tracing::warn!("Failed to deliver bulk: {_e}");
        }
    }

    /// Ends the input.
    ///
    /// Outside of any block the partial bulk is flushed. Inside an unclosed
    /// block it is left pending and never delivered. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.depth == 0 {
            self.flush();
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Closing inside an open block (depth {}), {} commands not flushed",
                self.depth,
                self.pending.len()
            );
        }
    }
}

impl core::fmt::Debug for BulkAccumulator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BulkAccumulator")
            .field("pending", &self.pending)
            .field("depth", &self.depth)
            .field("threshold", &self.threshold)
            .field("sinks", &self.sinks.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
