//! Shared pool of sinks and the handles that feed them.
//!
//! A [`SinkRegistry`] is an ordinary value owned by the process entry point.
//! Building it starts one worker per sink; [`SinkRegistry::shutdown`] stops
//! and joins every worker after draining its queue. Handles borrow the
//! registry, which guarantees that every handle is closed (and its partial
//! bulk flushed) before the sinks are torn down.

use crate::{
    AccumulatorStats, BulkAccumulator, Error, Handle, QueuePolicy, Render, Result, SinkReport,
    SinkWorker, SystemClock, TimeSource,
};
use std::sync::Arc;

/// Builder for a [`SinkRegistry`].
#[derive(Default)]
pub struct SinkRegistryBuilder {
    sinks: Vec<(Box<dyn Render>, QueuePolicy)>,
    clock: Option<Arc<dyn TimeSource>>,
}

impl SinkRegistryBuilder {
    /// Adds a sink with the default unbounded queue.
    #[must_use]
    pub fn with_sink(self, renderer: impl Render) -> Self {
        self.with_sink_policy(renderer, QueuePolicy::default())
    }

    /// Adds a sink with an explicit queue policy.
    #[must_use]
    pub fn with_sink_policy(mut self, renderer: impl Render, policy: QueuePolicy) -> Self {
        self.sinks.push((Box::new(renderer), policy));
        self
    }

    /// Overrides the time source used to stamp bulks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Spawns every sink worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if a worker thread cannot be started. Workers
    /// spawned before the failure are stopped again.
    pub fn build(self) -> Result<SinkRegistry> {
        let mut sinks = Vec::with_capacity(self.sinks.len());
        for (renderer, policy) in self.sinks {
            sinks.push(Arc::new(SinkWorker::spawn(renderer, policy)?));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Started {} sink workers", sinks.len());

        Ok(SinkRegistry {
            sinks,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

/// The set of long-lived sinks shared by every handle.
pub struct SinkRegistry {
    sinks: Vec<Arc<SinkWorker>>,
    clock: Arc<dyn TimeSource>,
}

impl SinkRegistry {
    pub fn builder() -> SinkRegistryBuilder {
        SinkRegistryBuilder::default()
    }

    pub fn sinks(&self) -> &[Arc<SinkWorker>] {
        &self.sinks
    }

    /// Opens a handle whose accumulator flushes every `threshold` commands
    /// and feeds all registered sinks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreshold`] if `threshold` is zero.
    pub fn create_handler(&self, threshold: usize) -> Result<Handle<'_>> {
        let mut accumulator = BulkAccumulator::new(threshold, Arc::clone(&self.clock))?;
        for sink in &self.sinks {
            accumulator.attach(Arc::clone(sink));
        }
        Ok(Handle::new(accumulator))
    }

    /// Closes a handle and releases it.
    pub fn destroy_handler(&self, handle: Handle<'_>) -> AccumulatorStats {
        handle.close()
    }

    /// Stops every sink after it drained its queue and joins its worker.
    ///
    /// All sinks are stopped even if one of them fails; the first failure is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPanicked`] if a worker thread panicked.
    pub fn shutdown(mut self) -> Result<Vec<SinkReport>> {
        self.stop_all()
    }

    fn stop_all(&mut self) -> Result<Vec<SinkReport>> {
        let mut first_err: Option<Error> = None;
        let mut reports = Vec::with_capacity(self.sinks.len());

        for sink in self.sinks.drain(..) {
            if let Err(e) = sink.stop() {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to stop sink {}: {}", sink.name(), e);
                first_err.get_or_insert(e);
            }
            reports.push(SinkReport {
                name: sink.name().to_string(),
                stats: sink.stats(),
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Sink registry shutdown complete");

        match first_err {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}

impl Drop for SinkRegistry {
    fn drop(&mut self) {
        // Already torn down by `shutdown`.
        if self.sinks.is_empty() {
            return;
        }
        if let Err(_e) = self.stop_all() {
            #[cfg(feature = "tracing")]
            tracing::error!("Error during sink registry teardown: {_e}");
        }
    }
}

impl core::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}
