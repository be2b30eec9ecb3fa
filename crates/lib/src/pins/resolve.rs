//! Input resolution through a resolution engine.
//!
//! This module coordinates the resolution of a [`PinSet`] into a
//! [`ResolvedSet`]:
//! 1. Each input is resolved through the [`ResolutionEngine`] with its
//!    `(locator, pin, expected hash)` triple
//! 2. Independent inputs resolve concurrently, bounded by a semaphore
//! 3. Candidates are validated against the input's declared capabilities
//! 4. The output is assembled in pin set declaration order, never
//!    completion order
//!
//! The first failure aborts the whole run: outstanding resolutions are
//! cancelled best-effort and no partial result is returned.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::types::{InputDecl, PinSet, ResolvedInput, ResolvedSet};

/// A candidate returned by a resolution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
  /// Absolute path to the candidate content.
  pub path: PathBuf,

  /// Capability tags the candidate provides.
  pub capabilities: BTreeSet<String>,
}

impl Candidate {
  /// Create a candidate with no capabilities.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      capabilities: BTreeSet::new(),
    }
  }

  /// Add a provided capability tag.
  pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
    self.capabilities.insert(capability.into());
    self
  }
}

/// Errors a resolution engine can report.
#[derive(Debug, Error)]
pub enum EngineError {
  /// No content is known for the pinned locator.
  #[error("no content for locator '{locator}' at pin '{pin}'")]
  NotFound { locator: String, pin: String },

  /// Recorded content hash does not match the expected hash.
  #[error("content hash mismatch: expected '{expected}', found '{actual}'")]
  HashMismatch { expected: String, actual: String },

  /// Store I/O failed.
  #[error("store I/O failed: {0}")]
  Io(#[from] std::io::Error),

  /// Entry metadata could not be parsed.
  #[error("invalid entry metadata at '{path}': {source}")]
  Metadata {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// An engine that turns a pinned locator into concrete content.
///
/// Resolution must be idempotent and content-addressed: the same
/// `(locator, pin)` pair always yields the same candidate paths, in a
/// deterministic order, independent of machine state. Calls are read-only
/// and may run concurrently.
pub trait ResolutionEngine: Send + Sync {
  /// Resolve a pinned locator to candidate content.
  ///
  /// `expected_hash` must be verified against the content when present.
  fn resolve(&self, locator: &str, pin: &str, expected_hash: Option<&str>) -> Result<Vec<Candidate>, EngineError>;
}

/// Errors that can occur during input resolution.
///
/// Every variant names the offending input; failures are never silently
/// dropped or substituted with a partial result.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The engine could not locate or verify the pinned content.
  #[error("failed to resolve input '{name}': {source}")]
  Unresolvable {
    name: String,
    #[source]
    source: EngineError,
  },

  /// No candidate provides a capability the input declares.
  #[error("input '{name}' resolved to content without capability '{capability}'")]
  CapabilityNotProvided { name: String, capability: String },

  /// Multiple candidates satisfy a capability-bearing input and there is no
  /// disambiguation rule.
  #[error("input '{name}' has {count} candidates providing capability '{capability}'")]
  AmbiguousCapability {
    name: String,
    capability: String,
    count: usize,
  },

  /// A resolution task panicked.
  #[error("resolution task for input '{name}' failed: {source}")]
  Task {
    name: String,
    #[source]
    source: tokio::task::JoinError,
  },
}

impl ResolveError {
  /// The name of the input this error is about.
  pub fn input_name(&self) -> &str {
    match self {
      ResolveError::Unresolvable { name, .. }
      | ResolveError::CapabilityNotProvided { name, .. }
      | ResolveError::AmbiguousCapability { name, .. }
      | ResolveError::Task { name, .. } => name,
    }
  }
}

/// Options for input resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
  /// Maximum number of concurrent engine calls.
  pub parallelism: usize,
}

impl Default for ResolveOptions {
  fn default() -> Self {
    Self { parallelism: 4 }
  }
}

/// Resolve all inputs of a pin set.
///
/// Engine calls run on the blocking pool, at most `options.parallelism` at
/// a time. The returned [`ResolvedSet`] iterates in pin set declaration
/// order regardless of which input resolved first.
///
/// # Errors
///
/// Returns the first [`ResolveError`] encountered. Outstanding resolutions
/// are cancelled best-effort and no partial set is ever returned.
pub async fn resolve_pins(
  engine: Arc<dyn ResolutionEngine>,
  pins: &PinSet,
  options: &ResolveOptions,
) -> Result<ResolvedSet, ResolveError> {
  info!(count = pins.len(), "resolving inputs");

  let semaphore = Arc::new(Semaphore::new(options.parallelism.max(1)));
  let mut join_set: JoinSet<Result<ResolvedInput, ResolveError>> = JoinSet::new();

  for (name, decl) in pins.iter() {
    let engine = Arc::clone(&engine);
    let semaphore = Arc::clone(&semaphore);
    let name = name.to_string();
    let decl = decl.clone();

    join_set.spawn(async move {
      let _permit = semaphore.acquire_owned().await.unwrap();

      debug!(name = %name, locator = %decl.locator, pin = %decl.pin, "resolving input");

      let locator = decl.locator.clone();
      let pin = decl.pin.clone();
      let hash = decl.hash.clone();

      let candidates = tokio::task::spawn_blocking(move || engine.resolve(&locator, &pin, hash.as_deref()))
        .await
        .map_err(|e| ResolveError::Task {
          name: name.clone(),
          source: e,
        })?
        .map_err(|e| ResolveError::Unresolvable {
          name: name.clone(),
          source: e,
        })?;

      select_candidate(name, &decl, candidates)
    });
  }

  // Collect in completion order; dropping the join set on failure aborts
  // whatever is still running.
  let mut completed: HashMap<String, ResolvedInput> = HashMap::new();

  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(Ok(input)) => {
        debug!(name = %input.name, path = %input.path.display(), "input resolved");
        completed.insert(input.name.clone(), input);
      }
      Ok(Err(e)) => return Err(e),
      Err(e) => {
        return Err(ResolveError::Task {
          name: "unknown".to_string(),
          source: e,
        });
      }
    }
  }

  // Reassemble in declaration order.
  let mut resolved = ResolvedSet::new();
  for name in pins.names() {
    let input = completed.remove(name).expect("one result per input");
    resolved.insert(name.to_string(), input);
  }

  Ok(resolved)
}

/// Pick the resolved content for an input from the engine's candidates.
///
/// - no candidates: unresolvable
/// - declared capabilities unmet by every candidate: capability error
/// - multiple matching candidates while capabilities are declared: hard
///   error, no "last one wins" guessing
/// - multiple candidates without declared capabilities: first candidate in
///   the engine's (deterministic) order
fn select_candidate(name: String, decl: &InputDecl, candidates: Vec<Candidate>) -> Result<ResolvedInput, ResolveError> {
  if candidates.is_empty() {
    return Err(ResolveError::Unresolvable {
      name,
      source: EngineError::NotFound {
        locator: decl.locator.clone(),
        pin: decl.pin.clone(),
      },
    });
  }

  let matching: Vec<Candidate> = if decl.capabilities.is_empty() {
    candidates
  } else {
    candidates
      .into_iter()
      .filter(|c| decl.capabilities.is_subset(&c.capabilities))
      .collect()
  };

  if matching.is_empty() {
    return Err(ResolveError::CapabilityNotProvided {
      capability: first_capability(decl),
      name,
    });
  }

  if !decl.capabilities.is_empty() && matching.len() > 1 {
    return Err(ResolveError::AmbiguousCapability {
      capability: first_capability(decl),
      count: matching.len(),
      name,
    });
  }

  let candidate = matching.into_iter().next().expect("non-empty candidates");

  Ok(ResolvedInput {
    name,
    path: candidate.path,
    capabilities: candidate.capabilities,
  })
}

/// First declared capability in sorted order, for error reporting.
fn first_capability(decl: &InputDecl) -> String {
  decl.capabilities.iter().next().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  /// Engine backed by a fixed answer table, with optional per-input delay
  /// so tests can force out-of-order completion.
  #[derive(Default)]
  struct TableEngine {
    answers: HashMap<(String, String), Vec<Candidate>>,
    hashes: HashMap<(String, String), String>,
    delays: HashMap<String, u64>,
  }

  impl TableEngine {
    fn answer(mut self, locator: &str, pin: &str, candidates: Vec<Candidate>) -> Self {
      self.answers.insert((locator.to_string(), pin.to_string()), candidates);
      self
    }

    fn recorded_hash(mut self, locator: &str, pin: &str, hash: &str) -> Self {
      self.hashes.insert((locator.to_string(), pin.to_string()), hash.to_string());
      self
    }

    fn delay_ms(mut self, locator: &str, ms: u64) -> Self {
      self.delays.insert(locator.to_string(), ms);
      self
    }
  }

  impl ResolutionEngine for TableEngine {
    fn resolve(&self, locator: &str, pin: &str, expected_hash: Option<&str>) -> Result<Vec<Candidate>, EngineError> {
      if let Some(ms) = self.delays.get(locator) {
        std::thread::sleep(Duration::from_millis(*ms));
      }

      let key = (locator.to_string(), pin.to_string());

      if let (Some(expected), Some(actual)) = (expected_hash, self.hashes.get(&key)) {
        if expected != actual {
          return Err(EngineError::HashMismatch {
            expected: expected.to_string(),
            actual: actual.clone(),
          });
        }
      }

      self.answers.get(&key).cloned().ok_or_else(|| EngineError::NotFound {
        locator: locator.to_string(),
        pin: pin.to_string(),
      })
    }
  }

  fn pin_set(entries: &[(&str, InputDecl)]) -> PinSet {
    let mut pins = PinSet::new();
    for (name, decl) in entries {
      pins.insert(name.to_string(), decl.clone());
    }
    pins
  }

  mod resolve_pins_tests {
    use super::*;

    #[tokio::test]
    async fn resolves_all_inputs() {
      let engine = TableEngine::default()
        .answer("nixpkgs", "abc", vec![Candidate::new("/store/abc-rust")])
        .answer("nixpkgs", "def", vec![Candidate::new("/store/def-zlib")]);

      let pins = pin_set(&[
        ("rust", InputDecl::new("nixpkgs", "abc")),
        ("zlib", InputDecl::new("nixpkgs", "def")),
      ]);

      let resolved = resolve_pins(Arc::new(engine), &pins, &ResolveOptions::default())
        .await
        .unwrap();

      assert_eq!(resolved.len(), 2);
      assert_eq!(resolved.get("rust").unwrap().path, PathBuf::from("/store/abc-rust"));
      assert_eq!(resolved.get("zlib").unwrap().path, PathBuf::from("/store/def-zlib"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn output_follows_declaration_order_not_completion_order() {
      // The first declared input is the slowest to resolve.
      let engine = TableEngine::default()
        .answer("slow", "1", vec![Candidate::new("/store/a")])
        .answer("medium", "2", vec![Candidate::new("/store/b")])
        .answer("fast", "3", vec![Candidate::new("/store/c")])
        .delay_ms("slow", 60)
        .delay_ms("medium", 30);

      let pins = pin_set(&[
        ("a", InputDecl::new("slow", "1")),
        ("b", InputDecl::new("medium", "2")),
        ("c", InputDecl::new("fast", "3")),
      ]);

      let resolved = resolve_pins(Arc::new(engine), &pins, &ResolveOptions::default())
        .await
        .unwrap();

      let names: Vec<_> = resolved.keys().cloned().collect();
      assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_pin_set_resolves_to_empty_set() {
      let engine = TableEngine::default();
      let resolved = resolve_pins(Arc::new(engine), &PinSet::new(), &ResolveOptions::default())
        .await
        .unwrap();

      assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn failure_returns_no_partial_result() {
      let engine = TableEngine::default().answer("nixpkgs", "abc", vec![Candidate::new("/store/abc-rust")]);

      let pins = pin_set(&[
        ("rust", InputDecl::new("nixpkgs", "abc")),
        ("missing", InputDecl::new("nixpkgs", "nope")),
      ]);

      let result = resolve_pins(Arc::new(engine), &pins, &ResolveOptions::default()).await;

      match result {
        Err(ResolveError::Unresolvable { name, source }) => {
          assert_eq!(name, "missing");
          assert!(matches!(source, EngineError::NotFound { .. }));
        }
        other => panic!("expected Unresolvable, got {:?}", other),
      }
    }

    #[tokio::test]
    async fn hash_mismatch_is_unresolvable() {
      let engine = TableEngine::default()
        .answer("nixpkgs", "abc", vec![Candidate::new("/store/abc-rust")])
        .recorded_hash("nixpkgs", "abc", "sha256-REAL");

      let pins = pin_set(&[("rust", InputDecl::new("nixpkgs", "abc").with_hash("sha256-WRONG"))]);

      let result = resolve_pins(Arc::new(engine), &pins, &ResolveOptions::default()).await;

      match result {
        Err(ResolveError::Unresolvable { name, source }) => {
          assert_eq!(name, "rust");
          assert!(matches!(source, EngineError::HashMismatch { .. }));
        }
        other => panic!("expected Unresolvable, got {:?}", other),
      }
    }

    #[tokio::test]
    async fn deterministic_across_runs() {
      let pins = pin_set(&[
        ("rust", InputDecl::new("nixpkgs", "abc")),
        ("zlib", InputDecl::new("nixpkgs", "def")),
      ]);

      let mut runs = Vec::new();
      for _ in 0..2 {
        let engine = TableEngine::default()
          .answer("nixpkgs", "abc", vec![Candidate::new("/store/abc-rust")])
          .answer("nixpkgs", "def", vec![Candidate::new("/store/def-zlib")]);

        let resolved = resolve_pins(Arc::new(engine), &pins, &ResolveOptions::default())
          .await
          .unwrap();
        runs.push(resolved.values().map(|r| r.path.clone()).collect::<Vec<_>>());
      }

      assert_eq!(runs[0], runs[1]);
    }
  }

  mod select_candidate_tests {
    use super::*;

    #[test]
    fn single_candidate_is_selected() {
      let decl = InputDecl::new("nixpkgs", "abc");
      let resolved = select_candidate("rust".to_string(), &decl, vec![Candidate::new("/store/abc-rust")]).unwrap();

      assert_eq!(resolved.name, "rust");
      assert_eq!(resolved.path, PathBuf::from("/store/abc-rust"));
    }

    #[test]
    fn no_candidates_is_unresolvable() {
      let decl = InputDecl::new("nixpkgs", "abc");
      let result = select_candidate("rust".to_string(), &decl, vec![]);

      assert!(matches!(result, Err(ResolveError::Unresolvable { .. })));
    }

    #[test]
    fn capability_carried_from_candidate() {
      let decl = InputDecl::new("nixpkgs", "abc").with_capability("toolchain");
      let resolved = select_candidate(
        "rust".to_string(),
        &decl,
        vec![Candidate::new("/store/abc-rust").with_capability("toolchain")],
      )
      .unwrap();

      assert!(resolved.capabilities.contains("toolchain"));
    }

    #[test]
    fn missing_capability_is_rejected() {
      let decl = InputDecl::new("nixpkgs", "abc").with_capability("toolchain");
      let result = select_candidate("rust".to_string(), &decl, vec![Candidate::new("/store/abc-rust")]);

      assert!(matches!(
        result,
        Err(ResolveError::CapabilityNotProvided { name, capability })
          if name == "rust" && capability == "toolchain"
      ));
    }

    #[test]
    fn multiple_capability_candidates_are_ambiguous() {
      let decl = InputDecl::new("nixpkgs", "abc").with_capability("toolchain");
      let result = select_candidate(
        "rust".to_string(),
        &decl,
        vec![
          Candidate::new("/store/abc-rust").with_capability("toolchain"),
          Candidate::new("/store/abc-rust-nightly").with_capability("toolchain"),
        ],
      );

      assert!(matches!(
        result,
        Err(ResolveError::AmbiguousCapability { count: 2, .. })
      ));
    }

    #[test]
    fn multiple_candidates_without_capabilities_takes_first() {
      let decl = InputDecl::new("nixpkgs", "abc");
      let resolved = select_candidate(
        "rust".to_string(),
        &decl,
        vec![Candidate::new("/store/first"), Candidate::new("/store/second")],
      )
      .unwrap();

      assert_eq!(resolved.path, PathBuf::from("/store/first"));
    }
  }
}
