use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// A boxed, thread-safe error. Constructors and invoked callables report
/// their own failures through this type.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The main error type for the `fibre_autowire` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("No entry was found for identifier '{id}'")]
  NotFound { id: String },

  #[error("Could not inject parameter '{parameter}' of '{target}'")]
  Resolution { parameter: String, target: String },

  #[error("Error while retrieving '{id}': {source}")]
  Container {
    id: String,
    #[source]
    source: BoxError,
  },

  #[error("Could not hydrate object '{type_name}': {source}")]
  Hydration {
    type_name: String,
    #[source]
    source: BoxError,
  },

  #[error("Failed to hydrate field '{field}' of '{type_name}': {source}")]
  Field {
    type_name: String,
    field: String,
    #[source]
    source: BoxError,
  },

  #[error("Cannot hydrate '{type_name}' from a JSON {found}")]
  InvalidData {
    type_name: String,
    found: &'static str,
  },

  #[error("Invocation failed: {source}")]
  Invocation {
    #[source]
    source: BoxError,
  },

  #[error("Circular dependency detected while resolving '{id}'")]
  CircularDependency { id: String },

  #[error("Entry '{id}' is not of the requested type {expected}")]
  TypeMismatch { id: String, expected: &'static str },

  #[error("Type '{type_name}' is not registered in the type catalog")]
  UnknownType { type_name: String },

  #[error("Discovery failed under '{}': {reason}", .root.display())]
  Discovery { root: PathBuf, reason: String },

  #[error("I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("Cache file '{}' is malformed: {source}", .path.display())]
  CacheFormat {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to parse configuration: {0}")]
  Config(String),
}

impl Error {
  pub(crate) fn container(id: &str, source: impl Into<BoxError>) -> Self {
    Error::Container {
      id: id.to_owned(),
      source: source.into(),
    }
  }

  /// Returns `true` if this error itself (not a nested cause) is `NotFound`.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::NotFound { .. })
  }

  /// Walks the `source()` chain and returns the innermost error.
  pub fn root_cause(&self) -> &(dyn StdError + 'static) {
    let mut current: &(dyn StdError + 'static) = self;
    while let Some(next) = current.source() {
      current = next;
    }
    current
  }

  /// Finds the first error of this crate's type in the chain (self included)
  /// matching `predicate`.
  pub fn find_in_chain(&self, predicate: impl Fn(&Error) -> bool) -> Option<&Error> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(self);
    while let Some(err) = current {
      if let Some(ours) = err.downcast_ref::<Error>() {
        if predicate(ours) {
          return Some(ours);
        }
      }
      current = err.source();
    }
    None
  }
}

/// A specialized `Result` type for `fibre_autowire` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
