//! Bulk alias registration from discovered types.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::container::ServiceContainer;
use crate::error::{Error, Result};

const SEPARATOR: &str = "::";

/// Enumerates fully-qualified type names under a root and namespace.
pub trait TypeDiscovery {
  fn discover(&self, root: &Path, namespace: &str, enforce: bool) -> Result<Vec<String>>;
}

fn normalize_namespace(namespace: &str) -> &str {
  namespace.trim_end_matches(SEPARATOR)
}

fn qualify(namespace: &str, segments: &[&str]) -> String {
  let mut parts = Vec::with_capacity(segments.len() + 1);
  if !namespace.is_empty() {
    parts.push(namespace);
  }
  parts.extend_from_slice(segments);
  parts.join(SEPARATOR)
}

/// Maps source files under a directory to type names, one type per file.
///
/// `root/billing/Invoice.rs` with namespace `app` yields `app::billing::Invoice`.
/// With `enforce`, each file must declare a `struct` or `enum` named after it.
#[derive(Debug, Clone)]
pub struct DirectoryCrawler {
  extension: String,
}

impl Default for DirectoryCrawler {
  fn default() -> Self {
    Self {
      extension: "rs".to_owned(),
    }
  }
}

impl DirectoryCrawler {
  pub fn new() -> Self {
    Self::default()
  }

  /// Crawls files with `extension` instead of `rs`.
  pub fn with_extension(extension: impl Into<String>) -> Self {
    Self {
      extension: extension.into(),
    }
  }

  fn check_declaration(root: &Path, path: &Path, stem: &str) -> Result<()> {
    let source = fs::read_to_string(path)?;
    let pattern = Regex::new(&format!(r"\b(?:struct|enum)\s+{}\b", regex::escape(stem)))
      .map_err(|e| Error::Discovery {
        root: root.to_path_buf(),
        reason: e.to_string(),
      })?;
    if pattern.is_match(&source) {
      Ok(())
    } else {
      Err(Error::Discovery {
        root: root.to_path_buf(),
        reason: format!("{} does not declare type '{}'", path.display(), stem),
      })
    }
  }
}

impl TypeDiscovery for DirectoryCrawler {
  fn discover(&self, root: &Path, namespace: &str, enforce: bool) -> Result<Vec<String>> {
    let namespace = normalize_namespace(namespace);
    let mut names = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
      let entry = entry.map_err(|e| Error::Discovery {
        root: root.to_path_buf(),
        reason: e.to_string(),
      })?;
      if !entry.file_type().is_file() {
        continue;
      }

      let path = entry.path();
      if path.extension() != Some(OsStr::new(&self.extension)) {
        continue;
      }
      let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
        continue;
      };
      if matches!(stem, "mod" | "lib" | "main") {
        continue;
      }

      let relative = path.strip_prefix(root).map_err(|e| Error::Discovery {
        root: root.to_path_buf(),
        reason: e.to_string(),
      })?;
      let mut segments: Vec<&str> = Vec::new();
      if let Some(parent) = relative.parent() {
        for component in parent.components() {
          match component.as_os_str().to_str() {
            Some(segment) => segments.push(segment),
            None => {
              return Err(Error::Discovery {
                root: root.to_path_buf(),
                reason: format!("non UTF-8 path {}", path.display()),
              })
            }
          }
        }
      }
      segments.push(stem);

      if enforce {
        Self::check_declaration(root, path, stem)?;
      }
      names.push(qualify(namespace, &segments));
    }

    Ok(names)
  }
}

/// A fixed list of type names, filtered by namespace prefix. The root is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
  names: Vec<String>,
}

impl StaticDiscovery {
  pub fn new<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      names: names.into_iter().map(Into::into).collect(),
    }
  }
}

impl TypeDiscovery for StaticDiscovery {
  fn discover(&self, _root: &Path, namespace: &str, _enforce: bool) -> Result<Vec<String>> {
    let namespace = normalize_namespace(namespace);
    if namespace.is_empty() {
      return Ok(self.names.clone());
    }
    let prefix = format!("{}{}", namespace, SEPARATOR);
    Ok(
      self
        .names
        .iter()
        .filter(|name| name.starts_with(&prefix))
        .cloned()
        .collect(),
    )
  }
}

impl ServiceContainer {
  /// Registers the `provides` aliases of every type `discovery` finds.
  ///
  /// Every discovered name must be in the type catalog. Returns the number of
  /// aliases registered. Running it again with the same inputs leaves the
  /// alias table unchanged.
  pub fn load_definitions(
    &self,
    discovery: &dyn TypeDiscovery,
    root: impl AsRef<Path>,
    namespace: &str,
    enforce: bool,
  ) -> Result<usize> {
    let root = root.as_ref();
    let mut registered = 0;

    for type_name in discovery.discover(root, namespace, enforce)? {
      let descriptor = self.descriptor(&type_name).ok_or_else(|| {
        Error::container(
          &type_name,
          Error::UnknownType {
            type_name: type_name.clone(),
          },
        )
      })?;
      for alias in descriptor.provided_aliases() {
        self.add_alias(alias.clone(), type_name.clone());
        registered += 1;
      }
    }

    debug!(root = %root.display(), namespace, registered, "loaded definitions");
    Ok(registered)
  }
}
