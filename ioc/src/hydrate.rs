//! Turning loosely-typed JSON data into constructed object graphs.
//!
//! A JSON array is a batch: every element is hydrated against the same type
//! and the results keep the input order. A JSON object is a single record:
//! its keys are matched against constructor parameter names, nested objects
//! become nested instances, and arrays (or the values of objects) under an
//! "array of X" parameter become lists of X. Parameters the record does not
//! mention are left to normal argument resolution.

use std::any::Any;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::args::{Argument, Arguments, Instance};
use crate::config::SingletonHydration;
use crate::container::{downcast_instance, ServiceContainer, SingletonPolicy};
use crate::descriptor::ParamDescriptor;
use crate::error::{Error, Result};

/// The outcome of [`ServiceContainer::hydrate`].
#[derive(Clone)]
pub enum Hydrated {
  One(Instance),
  Many(Vec<Instance>),
}

impl Hydrated {
  pub fn len(&self) -> usize {
    match self {
      Hydrated::One(_) => 1,
      Hydrated::Many(items) => items.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Flattens the result into a list; a single record becomes a list of one.
  pub fn into_vec(self) -> Vec<Instance> {
    match self {
      Hydrated::One(instance) => vec![instance],
      Hydrated::Many(items) => items,
    }
  }
}

impl std::fmt::Debug for Hydrated {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Hydrated::One(_) => f.write_str("One(..)"),
      Hydrated::Many(items) => write!(f, "Many(len = {})", items.len()),
    }
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

impl ServiceContainer {
  /// Hydrates `type_name` from `data`.
  ///
  /// Arrays produce [`Hydrated::Many`], objects (or `null`, read as an empty
  /// record) produce [`Hydrated::One`]. Any failure is reported as a single
  /// [`Error::Hydration`] whose source chain names the failing field.
  pub fn hydrate(&self, type_name: &str, data: &Value) -> Result<Hydrated> {
    let result = match data {
      Value::Array(items) => self.hydrate_batch(type_name, items).map(Hydrated::Many),
      record => self.hydrate_record(type_name, record).map(Hydrated::One),
    };
    result.map_err(|e| wrap_hydration(type_name, e))
  }

  /// Hydrates a single record and downcasts it.
  pub fn hydrate_one<T: Any + Send + Sync>(&self, type_name: &str, data: &Value) -> Result<Arc<T>> {
    self
      .hydrate_record(type_name, data)
      .and_then(|instance| downcast_instance(type_name, instance))
      .map_err(|e| wrap_hydration(type_name, e))
  }

  /// Hydrates a batch of records and downcasts each one.
  pub fn hydrate_many<T: Any + Send + Sync>(&self, type_name: &str, data: &Value) -> Result<Vec<Arc<T>>> {
    let hydrate = || -> Result<Vec<Arc<T>>> {
      let items = match data {
        Value::Array(items) => items,
        other => {
          return Err(Error::InvalidData {
            type_name: type_name.to_owned(),
            found: json_kind(other),
          })
        }
      };
      self
        .hydrate_batch(type_name, items)?
        .into_iter()
        .map(|instance| downcast_instance(type_name, instance))
        .collect()
    };
    hydrate().map_err(|e| wrap_hydration(type_name, e))
  }

  fn hydrate_batch(&self, type_name: &str, items: &[Value]) -> Result<Vec<Instance>> {
    items
      .iter()
      .map(|item| self.hydrate_record(type_name, item))
      .collect()
  }

  /// Hydrates a value at a nested position: arrays nest lists, anything else
  /// is a record.
  fn hydrate_value(&self, type_name: &str, value: &Value) -> Result<Argument> {
    match value {
      Value::Array(items) => items
        .iter()
        .map(|item| self.hydrate_value(type_name, item))
        .collect::<Result<Vec<_>>>()
        .map(Argument::List),
      record => self.hydrate_record(type_name, record).map(Argument::Service),
    }
  }

  fn hydrate_elements<'v>(
    &self,
    element: &str,
    items: impl Iterator<Item = &'v Value>,
  ) -> Result<Argument> {
    items
      .map(|item| self.hydrate_value(element, item))
      .collect::<Result<Vec<_>>>()
      .map(Argument::List)
  }

  fn hydrate_record(&self, type_name: &str, data: &Value) -> Result<Instance> {
    let empty = Map::new();
    let record = match data {
      Value::Object(record) => record,
      Value::Null => &empty,
      other => {
        return Err(Error::InvalidData {
          type_name: type_name.to_owned(),
          found: json_kind(other),
        })
      }
    };

    if !self.has(type_name) {
      return Err(Error::NotFound {
        id: type_name.to_owned(),
      });
    }
    let descriptor = self.descriptor_for(type_name)?;

    let mut arguments = Arguments::new();
    for (field, value) in record {
      let Some(param) = descriptor.param_named(field) else {
        continue;
      };
      let argument = self
        .hydrate_field(param, value)
        .map_err(|e| Error::Field {
          type_name: type_name.to_owned(),
          field: field.clone(),
          source: Box::new(e),
        })?;
      arguments.insert(field.clone(), argument);
    }

    trace!(type_name, fields = arguments.len(), "hydrated record arguments");
    let policy = match self.config.singleton_hydration {
      SingletonHydration::Fresh => SingletonPolicy::Bypass,
      SingletonHydration::Shared => SingletonPolicy::Cached,
    };
    self.resolve(type_name, arguments, policy)
  }

  fn hydrate_field(&self, param: &ParamDescriptor, value: &Value) -> Result<Argument> {
    // Keyed collections hydrate their values, in the map's iteration order.
    match (param.element_type(), value) {
      (Some(element), Value::Array(items)) => return self.hydrate_elements(element, items.iter()),
      (Some(element), Value::Object(entries)) => {
        return self.hydrate_elements(element, entries.values())
      }
      _ => {}
    }

    match param.type_name() {
      Some(declared) if !param.is_builtin() => {
        self.hydrate_record(declared, value).map(Argument::Service)
      }
      _ => Ok(Argument::Value(value.clone())),
    }
  }
}

fn wrap_hydration(type_name: &str, source: Error) -> Error {
  Error::Hydration {
    type_name: type_name.to_owned(),
    source: Box::new(source),
  }
}
