//! Asynchronous bulk consumers.
//!
//! A sink is a [`Render`] implementation paired with a [`SinkWorker`]: the
//! worker owns a FIFO queue and a dedicated thread that pops bulks and hands
//! them to the renderer, one at a time, in the order they were enqueued.
//!
//! ## Structure
//!
//! - [`console`] - renders bulks to standard output (or any writer).
//! - [`file`] - renders each bulk to its own file.
//! - [`worker`] - queue, worker thread and drain-then-stop lifecycle.

pub mod console;
pub mod file;
pub mod worker;


use crate::{Bulk, Result};
use portable_atomic::{AtomicU64, Ordering};

/// The rendering half of a sink.
///
/// `render` is only ever called from the sink's own worker thread, so it can
/// take `&mut self` and keep state such as a sequence counter. Errors are
/// reported by the worker and never reach the producer.
pub trait Render: Send + 'static {
    /// Short, stable name used in logs, errors and thread names.
    fn name(&self) -> &str;

    /// Renders a single bulk.
    fn render(&mut self, bulk: &Bulk) -> Result<()>;
}

impl<R: Render + ?Sized> Render for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn render(&mut self, bulk: &Bulk) -> Result<()> {
        (**self).render(bulk)
    }
}

/// What a bounded queue does with a bulk when it is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Overflow {
    /// The producer waits until the worker makes room.
    #[default]
    Block,
    /// The bulk is rejected, counted in [`SinkStats::bulks_dropped`] and
    /// logged.
    Drop,
}

/// Capacity policy for a sink queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Bounded only by memory; producers are never blocked.
    #[default]
    Unbounded,
    /// At most `capacity` bulks wait in the queue.
    Bounded { capacity: usize, overflow: Overflow },
}

/// Point-in-time counters of a single sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub bulks_rendered: u64,
    pub commands_rendered: u64,
    pub render_failures: u64,
    pub bulks_dropped: u64,
}

/// Final counters of a sink, returned when the registry shuts down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkReport {
    pub name: String,
    pub stats: SinkStats,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    bulks_rendered: AtomicU64,
    commands_rendered: AtomicU64,
    render_failures: AtomicU64,
    bulks_dropped: AtomicU64,
}

impl Counters {
    pub(crate) fn rendered(&self, bulk: &Bulk) {
        self.bulks_rendered.fetch_add(1, Ordering::Relaxed);
        self.commands_rendered
            .fetch_add(bulk.len() as u64, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.render_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.bulks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SinkStats {
        SinkStats {
            bulks_rendered: self.bulks_rendered.load(Ordering::Relaxed),
            commands_rendered: self.commands_rendered.load(Ordering::Relaxed),
            render_failures: self.render_failures.load(Ordering::Relaxed),
            bulks_dropped: self.bulks_dropped.load(Ordering::Relaxed),
        }
    }
}
