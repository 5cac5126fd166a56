//! Named constructor arguments and typed access to them.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A constructed service, shared by reference count.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// One argument destined for a constructor or an invoked callable.
#[derive(Clone)]
pub enum Argument {
  /// A raw scalar or collection value, used for builtin parameters.
  Value(Value),
  /// A resolved or hydrated service instance.
  Service(Instance),
  /// An ordered collection, produced by hydrating an "array of X" parameter.
  List(Vec<Argument>),
}

impl Argument {
  /// Wraps a concrete value as a service argument.
  pub fn service<T: Any + Send + Sync>(value: T) -> Self {
    Argument::Service(Arc::new(value))
  }

  fn kind(&self) -> &'static str {
    match self {
      Argument::Value(_) => "value",
      Argument::Service(_) => "service",
      Argument::List(_) => "list",
    }
  }

  /// Collapses a list made only of raw values into a JSON array.
  fn into_value(self) -> Option<Value> {
    match self {
      Argument::Value(v) => Some(v),
      Argument::List(items) => items
        .into_iter()
        .map(Argument::into_value)
        .collect::<Option<Vec<_>>>()
        .map(Value::Array),
      Argument::Service(_) => None,
    }
  }
}

impl fmt::Debug for Argument {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Argument::Value(v) => f.debug_tuple("Value").field(v).finish(),
      Argument::Service(_) => f.write_str("Service(..)"),
      Argument::List(items) => f.debug_tuple("List").field(items).finish(),
    }
  }
}

impl From<Value> for Argument {
  fn from(value: Value) -> Self {
    Argument::Value(value)
  }
}

impl From<Instance> for Argument {
  fn from(instance: Instance) -> Self {
    Argument::Service(instance)
  }
}

impl From<Vec<Argument>> for Argument {
  fn from(items: Vec<Argument>) -> Self {
    Argument::List(items)
  }
}

/// Failures raised while a constructor reads its arguments.
#[derive(Debug, Error)]
pub enum ArgumentError {
  #[error("Argument '{0}' was not supplied")]
  Missing(String),

  #[error("Argument '{name}' is a {found}, expected a {expected}")]
  Kind {
    name: String,
    expected: &'static str,
    found: &'static str,
  },

  #[error("Argument '{name}' could not be converted: {source}")]
  Deserialize {
    name: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Argument '{name}' is not of type {expected}")]
  Downcast { name: String, expected: &'static str },
}

/// A map of named arguments.
///
/// The container fills it by running argument resolution over a parameter
/// list; constructors then move their values out with the typed accessors.
#[derive(Clone, Default, Debug)]
pub struct Arguments {
  entries: HashMap<String, Argument>,
}

impl Arguments {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, name: impl Into<String>, argument: impl Into<Argument>) -> Self {
    self.insert(name, argument);
    self
  }

  pub fn insert(&mut self, name: impl Into<String>, argument: impl Into<Argument>) {
    self.entries.insert(name.into(), argument.into());
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  pub fn get(&self, name: &str) -> Option<&Argument> {
    self.entries.get(name)
  }

  pub fn take(&mut self, name: &str) -> Option<Argument> {
    self.entries.remove(name)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  /// Takes a raw value and deserializes it into `T`.
  ///
  /// Lists of raw values are accepted and read as a JSON array.
  pub fn value<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, ArgumentError> {
    let argument = self
      .take(name)
      .ok_or_else(|| ArgumentError::Missing(name.to_owned()))?;
    Self::deserialize(name, argument)
  }

  /// Like [`Arguments::value`], but an absent argument or `null` yields `None`.
  pub fn optional<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>, ArgumentError> {
    match self.take(name) {
      None | Some(Argument::Value(Value::Null)) => Ok(None),
      Some(argument) => Self::deserialize(name, argument).map(Some),
    }
  }

  /// Takes a service argument and downcasts it to `T`.
  pub fn service<T: Any + Send + Sync>(&mut self, name: &str) -> Result<Arc<T>, ArgumentError> {
    let argument = self
      .take(name)
      .ok_or_else(|| ArgumentError::Missing(name.to_owned()))?;
    downcast_argument(name, argument)
  }

  /// Takes a list argument whose items are all services of type `T`.
  ///
  /// A `null` value or an empty raw array yields an empty list, which is how
  /// defaults for "array of X" parameters are usually declared.
  pub fn list<T: Any + Send + Sync>(&mut self, name: &str) -> Result<Vec<Arc<T>>, ArgumentError> {
    match self.take(name) {
      None => Err(ArgumentError::Missing(name.to_owned())),
      Some(Argument::List(items)) => items
        .into_iter()
        .map(|item| downcast_argument(name, item))
        .collect(),
      Some(Argument::Value(Value::Null)) => Ok(Vec::new()),
      Some(Argument::Value(Value::Array(items))) if items.is_empty() => Ok(Vec::new()),
      Some(other) => Err(ArgumentError::Kind {
        name: name.to_owned(),
        expected: "list",
        found: other.kind(),
      }),
    }
  }

  fn deserialize<T: DeserializeOwned>(name: &str, argument: Argument) -> Result<T, ArgumentError> {
    let found = argument.kind();
    let value = argument.into_value().ok_or_else(|| ArgumentError::Kind {
      name: name.to_owned(),
      expected: "value",
      found,
    })?;
    serde_json::from_value(value).map_err(|source| ArgumentError::Deserialize {
      name: name.to_owned(),
      source,
    })
  }
}

impl<K: Into<String>, A: Into<Argument>> FromIterator<(K, A)> for Arguments {
  fn from_iter<I: IntoIterator<Item = (K, A)>>(iter: I) -> Self {
    let mut arguments = Arguments::new();
    for (name, argument) in iter {
      arguments.insert(name, argument);
    }
    arguments
  }
}

fn downcast_argument<T: Any + Send + Sync>(
  name: &str,
  argument: Argument,
) -> Result<Arc<T>, ArgumentError> {
  match argument {
    Argument::Service(instance) => {
      instance
        .downcast::<T>()
        .map_err(|_| ArgumentError::Downcast {
          name: name.to_owned(),
          expected: type_name::<T>(),
        })
    }
    other => Err(ArgumentError::Kind {
      name: name.to_owned(),
      expected: "service",
      found: other.kind(),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn value_accepts_lists_of_raw_values() {
    let mut args = Arguments::new().with(
      "tags",
      Argument::List(vec![json!("a").into(), json!("b").into()]),
    );
    let tags: Vec<String> = args.value("tags").unwrap();
    assert_eq!(tags, vec!["a", "b"]);
  }

  #[test]
  fn optional_treats_null_and_absence_alike() {
    let mut args = Arguments::new().with("age", Value::Null);
    assert_eq!(args.optional::<u32>("age").unwrap(), None);
    assert_eq!(args.optional::<u32>("missing").unwrap(), None);
  }

  #[test]
  fn service_reports_wrong_kind_and_wrong_type() {
    let mut args = Arguments::new()
      .with("a", json!(1))
      .with("b", Argument::service(String::from("x")));

    assert!(matches!(
      args.service::<String>("a"),
      Err(ArgumentError::Kind { found: "value", .. })
    ));
    assert!(matches!(
      args.service::<u64>("b"),
      Err(ArgumentError::Downcast { .. })
    ));
  }

  #[test]
  fn list_defaults_from_empty_array() {
    let mut args = Arguments::new().with("skills", json!([]));
    assert!(args.list::<String>("skills").unwrap().is_empty());
  }
}
