use core::fmt;

/// An ordered group of commands flushed as a unit.
///
/// `created_at` is the time (seconds since the Unix epoch) at which the
/// *first* command of the bulk was ingested, not the time it was flushed.
/// A bulk is never empty once it leaves an accumulator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bulk {
    commands: Vec<String>,
    created_at: u64,
}

impl Bulk {
    /// Builds a bulk from its parts.
    pub fn new(commands: Vec<String>, created_at: u64) -> Self {
        Self {
            commands,
            created_at,
        }
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub const fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Appends a command, stamping the bulk when it is the first one.
    pub(crate) fn push(&mut self, command: String, now: impl FnOnce() -> u64) {
        if self.commands.is_empty() {
            self.created_at = now();
        }
        self.commands.push(command);
    }

    /// Moves the contents out, leaving an empty bulk behind.
    pub(crate) fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

/// Renders as `bulk: a, b, c`, the line written by every built-in sink.
impl fmt::Display for Bulk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("bulk: ")?;
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(command)?;
        }
        Ok(())
    }
}
