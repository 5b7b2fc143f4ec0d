//! Per-sink queue and worker thread.
//!
//! Each [`SinkWorker`] owns one channel and one thread. Producers push
//! [`SinkMessage::Bulk`]s from any thread; the worker pops them in FIFO order
//! and renders them outside of any lock.
//!
//! Stopping is cooperative and drains instead of discarding: [`stop`] closes
//! the sink to new bulks, queues a [`SinkMessage::Shutdown`] behind everything
//! already enqueued and joins the thread. Because the queue is FIFO, every
//! bulk accepted before the call is rendered before the worker exits.
//!
//! [`stop`]: SinkWorker::stop

use super::{Counters, Overflow, QueuePolicy, Render, SinkStats};
use crate::{Bulk, Error, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

/// Messages accepted by a worker.
pub(crate) enum SinkMessage {
    /// A completed bulk to render.
    Bulk(Bulk),
    /// Everything queued before this message has been rendered; exit.
    Shutdown,
}

/// A running sink: its queue, its worker thread and its counters.
///
/// Shared between accumulators as `Arc<SinkWorker>`. Dropping the last
/// reference stops the worker (draining first) if [`stop`] was not called.
///
/// [`stop`]: SinkWorker::stop
pub struct SinkWorker {
    name: String,
    tx: Sender<SinkMessage>,
    overflow: Option<Overflow>,
    // `true` once stopping. Producers hold the read side while sending so
    // that no bulk can slip in behind the shutdown message.
    stopped: RwLock<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl SinkWorker {
    /// Spawns the worker thread for `renderer`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the operating system refuses to create the
    /// thread.
    pub fn spawn(renderer: impl Render, policy: QueuePolicy) -> Result<Self> {
        let name = renderer.name().to_string();
        let (tx, rx, overflow) = match policy {
            QueuePolicy::Unbounded => {
                let (tx, rx) = crossbeam_channel::unbounded();
                (tx, rx, None)
            }
            QueuePolicy::Bounded { capacity, overflow } => {
                // A zero capacity would turn the queue into a rendezvous
                // channel; keep at least one slot.
                let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
                (tx, rx, Some(overflow))
            }
        };

        let counters = Arc::new(Counters::default());
        let worker_counters = Arc::clone(&counters);
        let worker_name = name.clone();
        let handle = thread::Builder::new()
            .name(format!("sink-{name}"))
            .spawn(move || worker_loop(&worker_name, &rx, renderer, &worker_counters))
            .map_err(|source| Error::Spawn {
                sink: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            tx,
            overflow,
            stopped: RwLock::new(false),
            handle: Mutex::new(Some(handle)),
            counters,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a snapshot of the sink's counters.
    pub fn stats(&self) -> SinkStats {
        self.counters.snapshot()
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        *self.stopped.read()
    }

    /// Number of bulks waiting to be rendered.
    pub fn queued(&self) -> usize {
        self.tx.len()
    }

    /// Pushes a bulk onto the queue and wakes the worker.
    ///
    /// With the default unbounded queue this never blocks. With a bounded
    /// queue it either waits for room ([`Overflow::Block`]) or rejects the
    /// bulk ([`Overflow::Drop`]).
    ///
    /// # Errors
    ///
    /// - [`Error::SinkStopped`] if the sink is stopping or its worker is gone.
    /// - [`Error::QueueFull`] if the bounded queue is full under
    ///   [`Overflow::Drop`].
    pub fn enqueue(&self, bulk: Bulk) -> Result<()> {
        let stopped = self.stopped.read();
        if *stopped {
            return Err(self.stopped_error());
        }

        match self.overflow {
            Some(Overflow::Drop) => match self.tx.try_send(SinkMessage::Bulk(bulk)) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    self.counters.dropped();
                    Err(Error::QueueFull {
                        sink: self.name.clone(),
                    })
                }
                Err(TrySendError::Disconnected(_)) => Err(self.stopped_error()),
            },
            _ => self
                .tx
                .send(SinkMessage::Bulk(bulk))
                .map_err(|_| self.stopped_error()),
        }
    }

    /// Stops the worker after it has rendered everything already enqueued.
    ///
    /// - Refuses new bulks.
    /// - Queues a shutdown message behind the pending bulks.
    /// - Joins the worker thread.
    ///
    /// Calling `stop` more than once is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPanicked`] if the worker thread panicked.
    pub fn stop(&self) -> Result<()> {
        {
            let mut stopped = self.stopped.write();
            if !*stopped {
                *stopped = true;

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "Stopping sink {} ({} bulks queued)",
                    self.name,
                    self.tx.len()
                );

                // Blocking send: the shutdown message must never be dropped,
                // even when a bounded queue is full.
                if self.tx.send(SinkMessage::Shutdown).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Sink {} worker exited before shutdown", self.name);
                }
            }
        }

        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => handle.join().map_err(|_| Error::WorkerPanicked {
                sink: self.name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn stopped_error(&self) -> Error {
        Error::SinkStopped {
            sink: self.name.clone(),
        }
    }
}

impl core::fmt::Debug for SinkWorker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SinkWorker")
            .field("name", &self.name)
            .field("stopped", &self.is_stopped())
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

impl Drop for SinkWorker {
    fn drop(&mut self) {
        if let Err(_e) = self.stop() {
            #[cfg(feature = "tracing")]
            tracing::error!("Error stopping sink {}: {}", self.name, _e);
        }
    }
}

/// Renders bulks until a shutdown message arrives or every sender is gone.
///
/// Render failures are logged and counted; they never stop the loop.
fn worker_loop<R: Render>(
    _name: &str,
    rx: &Receiver<SinkMessage>,
    mut renderer: R,
    counters: &Counters,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Sink {_name} worker started");

    while let Ok(message) = rx.recv() {
        match message {
            SinkMessage::Bulk(bulk) => match renderer.render(&bulk) {
                Ok(()) => counters.rendered(&bulk),
                Err(_e) => {
                    counters.failed();
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Sink {_name} failed to render bulk: {_e}");
                }
            },
            SinkMessage::Shutdown => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Sink {_name} received shutdown signal");
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Sink {_name} worker stopped");
}
