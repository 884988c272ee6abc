//! Append-only registry logs

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::Ordinal;
use crate::{Error, Result};

/// Position-addressed, append-only sequence of artifact locations.
///
/// Entries are never removed or reordered: ordinal N always names the Nth
/// location ever appended.
pub trait RegistryLog {
    /// Append a location, returning its 1-based ordinal.
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be written.
    fn append(&mut self, location: &Path) -> Result<Ordinal>;

    /// Location stored at `ordinal`, or `None` past the end of the log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the log does not exist yet.
    fn get(&self, ordinal: Ordinal) -> Result<Option<PathBuf>>;

    /// All locations in append order.
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be read.
    fn entries(&self) -> Result<Vec<PathBuf>>;

    /// Number of entries.
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be read.
    fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    /// True if nothing was appended yet.
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be read.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Line-oriented index file: one UTF-8 location per line, no header.
#[derive(Debug, Clone)]
pub struct FileRegistryLog {
    path: PathBuf,
}

impl FileRegistryLog {
    /// Log backed by the file at `path` (created on first append).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the index file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<Option<BufReader<std::fs::File>>> {
        match std::fs::File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode(location: &Path) -> Result<&str> {
    let text = location.to_str().ok_or_else(|| {
        Error::InvalidInput(format!("location {} is not valid UTF-8", location.display()))
    })?;
    if text.is_empty() || text.contains(['\n', '\r']) {
        return Err(Error::InvalidInput(format!(
            "location {text:?} cannot be stored as one index line"
        )));
    }
    Ok(text)
}

fn decode(line: &str) -> PathBuf {
    PathBuf::from(line.trim_end_matches(['\r', '\n']))
}

impl RegistryLog for FileRegistryLog {
    fn append(&mut self, location: &Path) -> Result<Ordinal> {
        let line = encode(location)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ordinal::new(self.len()?)
    }

    fn get(&self, ordinal: Ordinal) -> Result<Option<PathBuf>> {
        let Some(reader) = self.reader()? else {
            return Err(Error::NotFound(format!(
                "registry index {} does not exist",
                self.path.display()
            )));
        };
        match reader.lines().nth(ordinal.get() - 1) {
            Some(line) => Ok(Some(decode(&line?))),
            None => Ok(None),
        }
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        let Some(reader) = self.reader()? else {
            return Ok(Vec::new());
        };
        reader
            .lines()
            .map(|line| Ok(decode(&line?)))
            .collect()
    }
}

/// In-memory log for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistryLog {
    entries: Vec<PathBuf>,
}

impl MemoryRegistryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryLog for MemoryRegistryLog {
    fn append(&mut self, location: &Path) -> Result<Ordinal> {
        encode(location)?;
        self.entries.push(location.to_path_buf());
        Ordinal::new(self.entries.len())
    }

    fn get(&self, ordinal: Ordinal) -> Result<Option<PathBuf>> {
        Ok(self.entries.get(ordinal.get() - 1).cloned())
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        Ok(self.entries.clone())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}
