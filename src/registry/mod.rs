//! Model registry
//!
//! Each saved artifact gets its own directory under the registry root:
//!
//! ```text
//! <root>/
//!   model_list.txt        one artifact directory per line, append-only
//!   <model name>/
//!     model.sav           bincode-encoded ModelArtifact
//!     readme.txt          provenance note
//! ```
//!
//! Artifacts are addressed by their 1-based position in the index. The index
//! is never rewritten, so an ordinal keeps naming the same artifact for the
//! lifetime of the registry.

mod log;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use log::{FileRegistryLog, MemoryRegistryLog, RegistryLog};

use crate::artifact::ModelArtifact;
use crate::{Error, Result};

/// Index file name inside the registry root.
pub const INDEX_FILE: &str = "model_list.txt";
/// Serialized model file inside each artifact directory.
pub const MODEL_FILE: &str = "model.sav";
/// Provenance note inside each artifact directory.
pub const README_FILE: &str = "readme.txt";

/// 1-based position of an artifact in the registry index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ordinal(NonZeroUsize);

impl Ordinal {
    /// Ordinal of the first registered artifact.
    pub const FIRST: Self = Self(NonZeroUsize::MIN);

    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for zero.
    pub fn new(position: usize) -> Result<Self> {
        NonZeroUsize::new(position)
            .map(Self)
            .ok_or_else(|| Error::InvalidInput("model ordinals start at 1".to_string()))
    }

    /// The 1-based position.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ordinal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let position = s
            .trim()
            .parse::<usize>()
            .map_err(|e| Error::ParseError(format!("invalid model ordinal {s:?}: {e}")))?;
        Self::new(position)
    }
}

/// A registered artifact: where it lives and how to address it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Position in the index
    pub ordinal: Ordinal,
    /// Artifact directory
    pub location: PathBuf,
}

/// Directory-per-artifact model store with an append-only index.
#[derive(Debug)]
pub struct ModelRegistry<L = FileRegistryLog> {
    root: PathBuf,
    log: L,
}

impl ModelRegistry<FileRegistryLog> {
    /// Registry rooted at `root`, indexed by `<root>/model_list.txt`.
    ///
    /// Nothing is created until the first save.
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let log = FileRegistryLog::new(root.join(INDEX_FILE));
        Self { root, log }
    }
}

impl<L: RegistryLog> ModelRegistry<L> {
    /// Registry rooted at `root` with a caller-provided index.
    pub fn with_log(root: impl Into<PathBuf>, log: L) -> Self {
        Self {
            root: root.into(),
            log,
        }
    }

    /// Registry root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The underlying index.
    #[must_use]
    pub const fn log(&self) -> &L {
        &self.log
    }

    /// Persist `artifact` under `<root>/<name>/` and append it to the index.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyExists`] if the artifact directory exists; nothing
    ///   is written and the index is untouched.
    /// - [`Error::InvalidInput`] if `name` is not a single path component.
    /// - [`Error::Io`] / [`Error::Serialization`] on write failure. The
    ///   partially written directory is removed so the name stays free.
    pub fn save(&mut self, artifact: &ModelArtifact, name: &str) -> Result<RegistryEntry> {
        validate_name(name)?;
        let location = self.root.join(name);
        if location.exists() {
            tracing::warn!(path = %location.display(), "model directory already exists, not saving");
            return Err(Error::AlreadyExists(location.display().to_string()));
        }

        std::fs::create_dir_all(&self.root)?;
        if let Err(e) = std::fs::create_dir(&location) {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                tracing::warn!(path = %location.display(), "model directory already exists, not saving");
                return Err(Error::AlreadyExists(location.display().to_string()));
            }
            return Err(e.into());
        }

        let ordinal = match write_artifact(&location, artifact)
            .and_then(|()| self.log.append(&location))
        {
            Ok(ordinal) => ordinal,
            Err(e) => {
                discard(&location);
                return Err(e);
            }
        };
        tracing::info!(
            ordinal = ordinal.get(),
            path = %location.display(),
            "registered model"
        );

        Ok(RegistryEntry { ordinal, location })
    }

    /// Persist `artifact` under its own name.
    ///
    /// # Errors
    ///
    /// See [`ModelRegistry::save`].
    pub fn save_artifact(&mut self, artifact: &ModelArtifact) -> Result<RegistryEntry> {
        self.save(artifact, artifact.name())
    }

    /// Load the artifact registered at `ordinal`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the index is missing, shorter than
    /// `ordinal`, blank at `ordinal`, or points at a directory without a
    /// model file.
    pub fn load(&self, ordinal: Ordinal) -> Result<ModelArtifact> {
        let location = self.log.get(ordinal)?.ok_or_else(|| {
            Error::NotFound(format!(
                "model #{ordinal} is not registered under {}",
                self.root.display()
            ))
        })?;
        if location.as_os_str().is_empty() {
            return Err(Error::NotFound(format!(
                "model #{ordinal} has a blank index entry"
            )));
        }

        let model_path = location.join(MODEL_FILE);
        let file = match File::open(&model_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!(
                    "model #{ordinal}: {} is missing",
                    model_path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let artifact: ModelArtifact = bincode::deserialize_from(BufReader::new(file))?;

        tracing::info!(
            ordinal = ordinal.get(),
            name = artifact.name(),
            "loaded model"
        );
        Ok(artifact)
    }

    /// All registered artifacts in index order.
    ///
    /// # Errors
    ///
    /// Returns error if the index cannot be read.
    pub fn entries(&self) -> Result<Vec<RegistryEntry>> {
        self.log
            .entries()?
            .into_iter()
            .enumerate()
            .map(|(i, location)| {
                Ok(RegistryEntry {
                    ordinal: Ordinal::new(i + 1)?,
                    location,
                })
            })
            .collect()
    }

    /// Number of registered artifacts.
    ///
    /// # Errors
    ///
    /// Returns error if the index cannot be read.
    pub fn len(&self) -> Result<usize> {
        self.log.len()
    }

    /// True if nothing is registered.
    ///
    /// # Errors
    ///
    /// Returns error if the index cannot be read.
    pub fn is_empty(&self) -> Result<bool> {
        self.log.is_empty()
    }
}

fn validate_name(name: &str) -> Result<()> {
    let single_component = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0');
    if single_component {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "model name {name:?} must be a single path component"
        )))
    }
}

fn discard(location: &Path) {
    if let Err(e) = std::fs::remove_dir_all(location) {
        tracing::warn!(path = %location.display(), error = %e, "could not remove partial model directory");
    }
}

fn write_artifact(location: &Path, artifact: &ModelArtifact) -> Result<()> {
    let mut model = BufWriter::new(File::create(location.join(MODEL_FILE))?);
    bincode::serialize_into(&mut model, artifact)?;
    model.flush()?;

    let mut readme = File::create(location.join(README_FILE))?;
    writeln!(readme, "{}", artifact.provenance_note())?;
    Ok(())
}
