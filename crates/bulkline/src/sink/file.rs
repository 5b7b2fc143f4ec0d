use super::Render;
use crate::{Bulk, Error, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// Writes every bulk to a fresh file in a directory.
///
/// Files are named `bulk<created_at>_<seq>.log`, where `seq` is a per-sink
/// counter that increases on every render attempt. Two bulks started in the
/// same second therefore never share a file. Files are opened with
/// `create_new`, so an existing file is never overwritten.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    sequence: u64,
}

impl FileSink {
    /// Creates the sink, creating `dir` (and its parents) if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| Error::Io {
            context: format!("failed to create log directory {}", dir.display()),
            source,
        })?;
        Ok(Self { dir, sequence: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name of the file holding the bulk stamped `created_at` with sequence
    /// number `sequence`.
    pub fn file_name(created_at: u64, sequence: u64) -> String {
        format!("bulk{created_at}_{sequence}.log")
    }
}

impl Render for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn render(&mut self, bulk: &Bulk) -> Result<()> {
        let sequence = self.sequence;
        self.sequence += 1;

        let path = self.dir.join(Self::file_name(bulk.created_at(), sequence));
        let io_err = |source: std::io::Error| Error::Io {
            context: format!("failed to write bulk to {}", path.display()),
            source,
        };

        // One write per bulk keeps the file from being left half-written
        // between commands.
        let line = format!("{bulk}\n");
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)
    }
}
