//! Renderers and clocks shared by the unit tests.

use crate::{Bulk, Error, Render, Result, TimeSource};
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::{io, sync::Arc, thread, time::Duration};

/// Records every rendered bulk.
#[derive(Clone, Debug)]
pub(crate) struct RecordingSink {
    name: String,
    bulks: Arc<Mutex<Vec<Bulk>>>,
    delay: Duration,
}

impl RecordingSink {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bulks: Arc::default(),
            delay: Duration::ZERO,
        }
    }

    /// Sleeps before recording each bulk, to let work pile up in the queue.
    pub(crate) fn slow(name: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(name)
        }
    }

    pub(crate) fn bulks(&self) -> Vec<Bulk> {
        self.bulks.lock().clone()
    }

    pub(crate) fn commands(&self) -> Vec<Vec<String>> {
        self.bulks
            .lock()
            .iter()
            .map(|bulk| bulk.commands().to_vec())
            .collect()
    }
}

impl Render for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&mut self, bulk: &Bulk) -> Result<()> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.bulks.lock().push(bulk.clone());
        Ok(())
    }
}

/// Fails every render whose first command is `fail`.
#[derive(Clone, Debug)]
pub(crate) struct FlakySink {
    inner: RecordingSink,
}

impl FlakySink {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            inner: RecordingSink::new(name),
        }
    }

    pub(crate) fn recorded(&self) -> &RecordingSink {
        &self.inner
    }
}

impl Render for FlakySink {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn render(&mut self, bulk: &Bulk) -> Result<()> {
        if bulk.commands().first().is_some_and(|c| c == "fail") {
            return Err(Error::Io {
                context: "injected failure".to_string(),
                source: io::Error::other("boom"),
            });
        }
        self.inner.render(bulk)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub(crate) struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub(crate) fn at(secs: u64) -> Arc<Self> {
        Arc::new(Self {
            secs: AtomicU64::new(secs),
        })
    }

    pub(crate) fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::Relaxed);
    }
}

impl TimeSource for ManualClock {
    fn current_secs(&self) -> u64 {
        self.secs.load(Ordering::Relaxed)
    }
}
