//! Local content-addressed store, the default resolution engine.
//!
//! The store is a flat directory of entries, each holding the content for
//! one `(locator, pin)` pair plus a metadata file describing it:
//!
//! ```text
//! ~/.cache/pinsh/store/
//!   nixpkgs-a1b2c3d4/            # {locator slug}-{hash(locator:pin)[:8]}
//!     entry.json
//!     bin/
//!       rustc
//!   nixpkgs-a1b2c3d4-nightly/    # same pin, explicit variant
//!     entry.json
//! ```
//!
//! # Entry Naming
//!
//! Entry directories use `{slug}-{hash[:8]}` where:
//! - `slug`: the locator reduced to a filesystem-safe prefix
//! - `hash[:8]`: first 8 characters of SHA-256 of `locator:pin`
//!
//! An optional `-{variant}` suffix lets differently-built content for the
//! same pin coexist; resolution then reports every matching entry as a
//! candidate.
//!
//! # Resolution
//!
//! [`ContentStore`] implements [`ResolutionEngine`] by scanning entry
//! metadata for matches on `(locator, pin)`, verifying the expected hash
//! against the recorded one, and returning matches in label order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, trace};

use crate::paths::store_dir;
use crate::pins::resolve::{Candidate, EngineError, ResolutionEngine};

/// Length of the hash suffix used in entry directory names.
const ENTRY_HASH_LEN: usize = 8;

/// Maximum length of the locator slug in entry directory names.
const SLUG_MAX_LEN: usize = 32;

/// Name of the metadata file within each entry.
pub const ENTRY_FILENAME: &str = "entry.json";

/// Current entry metadata format version.
pub const ENTRY_VERSION: u32 = 1;

/// Metadata describing one store entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
  /// Metadata format version.
  pub version: u32,

  /// The locator this entry was materialized from.
  pub locator: String,

  /// The exact pin the content corresponds to.
  pub pin: String,

  /// Content hash recorded when the entry was added.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hash: Option<String>,

  /// Variant label distinguishing coexisting builds of the same pin.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,

  /// Capability tags the content provides.
  #[serde(default, skip_serializing_if = "std::collections::BTreeSet::is_empty")]
  pub capabilities: std::collections::BTreeSet<String>,
}

impl EntryMetadata {
  /// Create metadata for a `(locator, pin)` pair.
  pub fn new(locator: &str, pin: &str) -> Self {
    Self {
      version: ENTRY_VERSION,
      locator: locator.to_string(),
      pin: pin.to_string(),
      hash: None,
      variant: None,
      capabilities: std::collections::BTreeSet::new(),
    }
  }

  /// Record the content hash.
  pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
    self.hash = Some(hash.into());
    self
  }

  /// Set the variant label.
  pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
    self.variant = Some(variant.into());
    self
  }

  /// Add a provided capability tag.
  pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
    self.capabilities.insert(capability.into());
    self
  }
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
  /// Failed to create a directory.
  #[error("failed to create directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to read the store directory.
  #[error("failed to read store directory '{path}': {source}")]
  ReadDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Failed to read or write entry metadata.
  #[error("failed to access entry metadata '{path}': {source}")]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// Entry metadata is not valid JSON.
  #[error("invalid entry metadata '{path}': {source}")]
  ParseMetadata {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// Entry metadata version is not supported.
  #[error("unsupported entry metadata version {0}, expected {ENTRY_VERSION}")]
  UnsupportedVersion(u32),

  /// An entry for this label already exists.
  #[error("store entry already exists: {0}")]
  EntryExists(String),
}

/// The content store manager.
#[derive(Debug, Clone)]
pub struct ContentStore {
  store_dir: PathBuf,
}

impl Default for ContentStore {
  fn default() -> Self {
    Self::new()
  }
}

impl ContentStore {
  /// Create a store rooted at the default directory (honoring the
  /// `PINSH_STORE` override).
  pub fn new() -> Self {
    Self { store_dir: store_dir() }
  }

  /// Create a store rooted at a custom directory.
  pub fn with_path(store_dir: PathBuf) -> Self {
    Self { store_dir }
  }

  /// The store directory path.
  pub fn store_dir(&self) -> &Path {
    &self.store_dir
  }

  /// Ensure the store directory exists.
  pub fn ensure_store_dir(&self) -> Result<(), StoreError> {
    if !self.store_dir.exists() {
      fs::create_dir_all(&self.store_dir).map_err(|e| StoreError::CreateDir {
        path: self.store_dir.clone(),
        source: e,
      })?;
    }
    Ok(())
  }

  /// Compute the entry label for a `(locator, pin)` pair.
  ///
  /// The label is `{slug}-{hash[:8]}`, with a `-{variant}` suffix when a
  /// variant is given.
  pub fn entry_label(locator: &str, pin: &str, variant: Option<&str>) -> String {
    let base = format!("{}-{}", locator_slug(locator), compute_entry_hash(locator, pin));
    match variant {
      Some(v) => format!("{}-{}", base, v),
      None => base,
    }
  }

  /// Compute the entry path for a `(locator, pin)` pair.
  pub fn entry_path(&self, locator: &str, pin: &str, variant: Option<&str>) -> PathBuf {
    self.store_dir.join(Self::entry_label(locator, pin, variant))
  }

  /// Add an entry to the store, creating its directory and metadata file.
  ///
  /// Returns the entry path. The entry's content is materialized by the
  /// caller (or by external tooling); the store only records what the
  /// directory corresponds to.
  pub fn add(&self, metadata: &EntryMetadata) -> Result<PathBuf, StoreError> {
    self.ensure_store_dir()?;

    let path = self.entry_path(&metadata.locator, &metadata.pin, metadata.variant.as_deref());
    let metadata_path = path.join(ENTRY_FILENAME);

    if metadata_path.exists() {
      return Err(StoreError::EntryExists(
        path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
      ));
    }

    fs::create_dir_all(&path).map_err(|e| StoreError::CreateDir {
      path: path.clone(),
      source: e,
    })?;

    let content = serde_json::to_string_pretty(metadata).map_err(|e| StoreError::ParseMetadata {
      path: metadata_path.clone(),
      source: e,
    })?;
    fs::write(&metadata_path, content).map_err(|e| StoreError::Metadata {
      path: metadata_path,
      source: e,
    })?;

    debug!(path = %path.display(), "added store entry");
    Ok(path)
  }

  /// List all entries in the store, in label order.
  pub fn entries(&self) -> Result<Vec<(PathBuf, EntryMetadata)>, StoreError> {
    if !self.store_dir.exists() {
      return Ok(Vec::new());
    }

    let mut entries = Vec::new();

    let dir = fs::read_dir(&self.store_dir).map_err(|e| StoreError::ReadDir {
      path: self.store_dir.clone(),
      source: e,
    })?;

    for entry in dir {
      let entry = entry.map_err(|e| StoreError::ReadDir {
        path: self.store_dir.clone(),
        source: e,
      })?;

      let path = entry.path();
      let metadata_path = path.join(ENTRY_FILENAME);
      if !metadata_path.is_file() {
        trace!(path = %path.display(), "skipping non-entry");
        continue;
      }

      let metadata = load_metadata(&metadata_path)?;
      entries.push((path, metadata));
    }

    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(entries)
  }

  /// Find entries matching a `(locator, pin)` pair, in label order.
  pub fn find(&self, locator: &str, pin: &str) -> Result<Vec<(PathBuf, EntryMetadata)>, StoreError> {
    let matches = self
      .entries()?
      .into_iter()
      .filter(|(_, m)| m.locator == locator && m.pin == pin)
      .collect();
    Ok(matches)
  }
}

impl ResolutionEngine for ContentStore {
  /// Resolve against the local store.
  ///
  /// Scans entry metadata for matches on `(locator, pin)` and verifies the
  /// expected hash against the recorded one. Matches are returned in label
  /// order, so repeated calls yield identical candidate lists.
  fn resolve(&self, locator: &str, pin: &str, expected_hash: Option<&str>) -> Result<Vec<Candidate>, EngineError> {
    let matches = self.find(locator, pin).map_err(store_to_engine_error)?;

    if matches.is_empty() {
      return Err(EngineError::NotFound {
        locator: locator.to_string(),
        pin: pin.to_string(),
      });
    }

    let mut candidates = Vec::with_capacity(matches.len());

    for (path, metadata) in matches {
      if let (Some(expected), Some(recorded)) = (expected_hash, metadata.hash.as_deref())
        && expected != recorded
      {
        return Err(EngineError::HashMismatch {
          expected: expected.to_string(),
          actual: recorded.to_string(),
        });
      }

      candidates.push(Candidate {
        path,
        capabilities: metadata.capabilities,
      });
    }

    Ok(candidates)
  }
}

/// Load and validate one entry metadata file.
fn load_metadata(path: &Path) -> Result<EntryMetadata, StoreError> {
  let content = fs::read_to_string(path).map_err(|e| StoreError::Metadata {
    path: path.to_path_buf(),
    source: e,
  })?;

  let metadata: EntryMetadata = serde_json::from_str(&content).map_err(|e| StoreError::ParseMetadata {
    path: path.to_path_buf(),
    source: e,
  })?;

  if metadata.version != ENTRY_VERSION {
    return Err(StoreError::UnsupportedVersion(metadata.version));
  }

  Ok(metadata)
}

/// Map store failures onto the engine error contract.
fn store_to_engine_error(error: StoreError) -> EngineError {
  match error {
    StoreError::CreateDir { source, .. }
    | StoreError::ReadDir { source, .. }
    | StoreError::Metadata { source, .. } => EngineError::Io(source),
    StoreError::ParseMetadata { path, source } => EngineError::Metadata { path, source },
    StoreError::UnsupportedVersion(v) => EngineError::Io(io::Error::other(format!(
      "unsupported entry metadata version {}",
      v
    ))),
    StoreError::EntryExists(label) => EngineError::Io(io::Error::other(format!("store entry already exists: {}", label))),
  }
}

/// Compute the hash suffix for an entry label.
///
/// Returns the first 8 characters of SHA-256(`locator + ":" + pin`).
fn compute_entry_hash(locator: &str, pin: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(locator.as_bytes());
  hasher.update(b":");
  hasher.update(pin.as_bytes());
  let full = hex::encode(hasher.finalize());
  full[..ENTRY_HASH_LEN].to_string()
}

/// Reduce a locator to a filesystem-safe label prefix.
fn locator_slug(locator: &str) -> String {
  let slug: String = locator
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() {
        c.to_ascii_lowercase()
      } else {
        '-'
      }
    })
    .collect();

  let trimmed = slug.trim_matches('-');
  let slug = if trimmed.is_empty() { "entry" } else { trimmed };
  slug.chars().take(SLUG_MAX_LEN).collect()
}
