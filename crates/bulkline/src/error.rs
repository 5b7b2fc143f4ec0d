//! Error types for bulk accumulation and sink delivery.
//!
//! Producer-facing operations are fire-and-forget: a failing sink never
//! reaches the code feeding commands. The variants below surface where an
//! operation can fail synchronously (handle creation, [`ingest`], sink
//! construction and shutdown) and are otherwise logged and counted.
//!
//! [`ingest`]: crate::BulkAccumulator::ingest

use std::io;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for `bulkline`.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A handle was requested with a bulk size of zero.
    #[error("Bulk size must be greater than 0")]
    InvalidThreshold,

    /// A close delimiter arrived while no block was open.
    ///
    /// The line is discarded and the nesting depth stays at zero.
    #[error("Close delimiter without a matching open delimiter")]
    UnmatchedClose,

    /// The sink has been stopped and no longer accepts bulks.
    #[error("Sink `{sink}` is stopped")]
    SinkStopped { sink: String },

    /// A bounded sink queue with the drop policy was full.
    #[error("Sink `{sink}` queue is full, bulk dropped")]
    QueueFull { sink: String },

    /// An I/O operation failed while building or rendering to a sink.
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The worker thread for a sink could not be spawned.
    #[error("Failed to spawn worker for sink `{sink}`")]
    Spawn {
        sink: String,
        #[source]
        source: io::Error,
    },

    /// The worker thread for a sink panicked before it could be joined.
    #[error("Worker for sink `{sink}` panicked")]
    WorkerPanicked { sink: String },
}
