//! Destinations for snapshot text.
//!
//! A sink receives the snapshot as a sequence of chunks and is finished once
//! after the last chunk. A sink that is never finished must not leave behind
//! anything that looks like a complete snapshot.

use crate::compression::{Compression, Encoder};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

pub const WRITER_BUFFER_SIZE: usize = 256 * 1024;

/// Receiver of snapshot text
pub trait SnapshotSink {
    /// Append a chunk of text
    fn write(&mut self, chunk: &str) -> io::Result<()>;

    /// Called once after the final chunk of a successful snapshot
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SnapshotSink for String {
    fn write(&mut self, chunk: &str) -> io::Result<()> {
        self.push_str(chunk);
        Ok(())
    }
}

/// Sink over any writer (stdout, sockets, in-memory buffers)
pub struct WriterSink<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(WRITER_BUFFER_SIZE, writer),
        }
    }

    /// Flush and return the inner writer
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> SnapshotSink for WriterSink<W> {
    fn write(&mut self, chunk: &str) -> io::Result<()> {
        self.writer.write_all(chunk.as_bytes())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// File sink that stages output next to the target and renames it into place
/// on `finish`. Dropping an unfinished sink deletes the staged file.
pub struct FileSink {
    target: PathBuf,
    compression: Compression,
    encoder: Option<Encoder<BufWriter<File>>>,
    staged: Option<TempPath>,
}

impl FileSink {
    /// Create a sink for `target`, compressing as its extension suggests
    pub fn create(target: &Path) -> io::Result<Self> {
        Self::with_compression(target, Compression::from_path(target))
    }

    /// Create a sink for `target` with an explicit compression format
    pub fn with_compression(target: &Path, compression: Compression) -> io::Result<Self> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let staged = tempfile::Builder::new()
            .prefix(".sql-snapshot-")
            .suffix(".partial")
            .tempfile_in(&dir)?;
        let (file, path) = staged.into_parts();
        let encoder = compression.encoder(BufWriter::with_capacity(WRITER_BUFFER_SIZE, file))?;

        Ok(Self {
            target: target.to_path_buf(),
            compression,
            encoder: Some(encoder),
            staged: Some(path),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Path of the staged file while the sink is unfinished
    pub fn staged_path(&self) -> Option<&Path> {
        self.staged.as_deref()
    }
}

impl SnapshotSink for FileSink {
    fn write(&mut self, chunk: &str) -> io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.write_all(chunk.as_bytes()),
            None => Err(io::Error::other("snapshot file already finished")),
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        let (Some(encoder), Some(staged)) = (self.encoder.take(), self.staged.take()) else {
            return Err(io::Error::other("snapshot file already finished"));
        };
        let file = encoder
            .finish()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);
        staged.persist(&self.target).map_err(|e| e.error)?;
        Ok(())
    }
}
