//! Groups a stream of text commands into ordered bulks and delivers every
//! completed bulk to a set of asynchronous sinks.
//!
//! A bulk is complete when it reaches a fixed size, or when an explicit
//! `{` ... `}` block closes. Blocks may nest and suspend the size limit while
//! they are open. Each sink runs its own worker thread behind an unbounded
//! FIFO queue, so slow sinks never block the producer.
//!
//! # Example
//!
//! ```
//! use bulkline::{ConsoleSink, SinkRegistry};
//!
//! let registry = SinkRegistry::builder()
//!     .with_sink(ConsoleSink::stdout())
//!     .build()?;
//!
//! let mut handle = registry.create_handler(3)?;
//! handle.feed("cmd1\ncmd2\ncmd3\n");   // bulk: cmd1, cmd2, cmd3
//! handle.feed("{\na\nb\nc\nd\n}\n");   // bulk: a, b, c, d
//! handle.feed("last\n");
//! registry.destroy_handler(handle);    // bulk: last
//!
//! registry.shutdown()?;
//! # Ok::<(), bulkline::Error>(())
//! ```
//!
//! ## Features
//!
//! - `tracing`: emits worker lifecycle events, render failures and rejected
//!   lines through the `tracing` crate.

mod accumulator;
mod bulk;
mod error;
mod handle;
mod registry;
mod sink;
mod time;

#[cfg(test)]
mod testing;

pub use crate::accumulator::*;
pub use crate::bulk::*;
pub use crate::error::*;
pub use crate::handle::*;
pub use crate::registry::*;
pub use crate::sink::console::*;
pub use crate::sink::file::*;
pub use crate::sink::worker::SinkWorker;
pub use crate::sink::{Overflow, QueuePolicy, Render, SinkReport, SinkStats};
pub use crate::time::*;
