use super::Render;
use crate::{Bulk, Error, Result};
use std::io::{self, Stdout, Write};

/// Writes each bulk as a single `bulk: a, b, c` line.
///
/// Defaults to standard output; any [`Write`] target can be used instead,
/// which is how the tests capture output.
#[derive(Debug)]
pub struct ConsoleSink<W = Stdout> {
    out: W,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl Default for ConsoleSink<Stdout> {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W> ConsoleSink<W>
where
    W: Write + Send + 'static,
{
    pub const fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W> Render for ConsoleSink<W>
where
    W: Write + Send + 'static,
{
    fn name(&self) -> &str {
        "console"
    }

    fn render(&mut self, bulk: &Bulk) -> Result<()> {
        writeln!(self.out, "{bulk}")
            .and_then(|()| self.out.flush())
            .map_err(|source| Error::Io {
                context: "failed to write bulk to console".to_string(),
                source,
            })
    }
}
