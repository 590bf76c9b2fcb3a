//! Whole-document load/dump adapters for the document store.
//!
//! # Responsibility
//! - Read a document tree from its backing file, defaulting when absent.
//! - Write the full tree back without ever exposing a partial file.
//!
//! # Invariants
//! - `dump` writes to a sibling temp file, syncs it, then renames it over the
//!   target. Readers observe either the old or the new tree.
//! - A missing file is not an error; any other read failure is.

use log::debug;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Root object of a structured document.
pub type Document = Map<String, Value>;

pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Debug)]
pub enum StreamError {
    Io { path: PathBuf, source: io::Error },
    /// File contents are not valid JSON, or the tree could not be encoded.
    Codec {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Temp file could not replace the target.
    Persist { path: PathBuf, source: io::Error },
}

impl Display for StreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Codec { path, source } => {
                write!(f, "{}: invalid document: {source}", path.display())
            }
            Self::Persist { path, source } => {
                write!(f, "{}: failed to replace document: {source}", path.display())
            }
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } | Self::Persist { source, .. } => Some(source),
            Self::Codec { source, .. } => Some(source),
        }
    }
}

/// Load/dump contract over a whole document tree.
pub trait DocumentStream {
    fn load(&self) -> StreamResult<Value>;
    fn dump(&self, tree: &Value) -> StreamResult<()>;
}

/// JSON file backed stream.
#[derive(Debug, Clone)]
pub struct JsonFileStream {
    path: PathBuf,
    default: Value,
}

impl JsonFileStream {
    /// Creates a stream over `path`; a missing file loads as an empty object.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default: Value::Object(Document::new()),
        }
    }

    /// Replaces the value returned by `load` when the file does not exist.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn io_error(&self, source: io::Error) -> StreamError {
        StreamError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl DocumentStream for JsonFileStream {
    fn load(&self) -> StreamResult<Value> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("event=stream_load module=stream status=ok source=default");
                return Ok(self.default.clone());
            }
            Err(err) => return Err(self.io_error(err)),
        };

        let tree = serde_json::from_slice(&bytes).map_err(|source| StreamError::Codec {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            "event=stream_load module=stream status=ok source=file bytes={}",
            bytes.len()
        );
        Ok(tree)
    }

    fn dump(&self, tree: &Value) -> StreamResult<()> {
        let mut temp = NamedTempFile::new_in(self.temp_dir()).map_err(|err| self.io_error(err))?;

        serde_json::to_writer_pretty(&mut temp, tree).map_err(|source| StreamError::Codec {
            path: self.path.clone(),
            source,
        })?;
        temp.write_all(b"\n").map_err(|err| self.io_error(err))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| self.io_error(err))?;

        temp.persist(&self.path)
            .map_err(|err| StreamError::Persist {
                path: self.path.clone(),
                source: err.error,
            })?;

        debug!("event=stream_dump module=stream status=ok");
        Ok(())
    }
}
