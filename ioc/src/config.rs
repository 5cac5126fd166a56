//! Container configuration, loadable from YAML or JSON.
//!
//! ```yaml
//! singleton_hydration: fresh   # or "shared"
//! persist_on_drop: true
//! aliases:
//!   Greeter: EnglishGreeter
//!   greeting.default: EnglishGreeter
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// How the hydrator treats types flagged singleton.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingletonHydration {
  /// Every hydrated record becomes a new instance. Hydration neither reads
  /// nor writes the singleton cache for the hydrated types themselves.
  #[default]
  Fresh,
  /// Hydration goes through the regular resolution path: once an instance is
  /// cached, later records of that type return the cached instance.
  Shared,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
  /// Aliases applied at construction, after the cache restore.
  #[serde(default)]
  pub aliases: HashMap<String, String>,
  #[serde(default)]
  pub singleton_hydration: SingletonHydration,
  /// Flush pending alias and singleton changes to the cache when the
  /// container is dropped.
  #[serde(default = "default_persist_on_drop")]
  pub persist_on_drop: bool,
}

fn default_persist_on_drop() -> bool {
  true
}

impl Default for ContainerConfig {
  fn default() -> Self {
    Self {
      aliases: HashMap::new(),
      singleton_hydration: SingletonHydration::default(),
      persist_on_drop: default_persist_on_drop(),
    }
  }
}

impl ContainerConfig {
  pub fn from_yaml_str(source: &str) -> Result<Self> {
    serde_yaml::from_str(source).map_err(|e| Error::Config(e.to_string()))
  }

  pub fn from_json_str(source: &str) -> Result<Self> {
    serde_json::from_str(source).map_err(|e| Error::Config(e.to_string()))
  }

  /// Loads a config file, choosing the format from its extension.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("yaml") | Some("yml") => Self::from_yaml_str(&source),
      Some("json") => Self::from_json_str(&source),
      other => Err(Error::Config(format!(
        "Unsupported configuration format '{}' for {}",
        other.unwrap_or(""),
        path.display()
      ))),
    }
  }
}
