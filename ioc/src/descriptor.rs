//! Shape metadata for constructible types and their parameters.
//!
//! Rust has no runtime reflection, so every type the container can build is
//! described up front by a [`TypeDescriptor`]: its constructor parameters in
//! declaration order, whether it is a singleton, which aliases it provides,
//! and a closure that assembles the value from resolved [`Arguments`].
//!
//! ```
//! use fibre_autowire::{ParamDescriptor, TypeDescriptor};
//!
//! struct Skill {
//!   title: String,
//! }
//!
//! let descriptor = TypeDescriptor::new("Skill", |args| {
//!   Ok(Skill { title: args.value("title")? })
//! })
//! .param(ParamDescriptor::builtin("title", "string"));
//!
//! assert_eq!(descriptor.name(), "Skill");
//! assert_eq!(descriptor.params().len(), 1);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::args::{Arguments, Instance};
use crate::error::BoxError;

type Constructor = Arc<dyn Fn(&mut Arguments) -> Result<Instance, BoxError> + Send + Sync>;

/// Describes one constructor or callable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
  name: String,
  type_name: Option<String>,
  builtin: bool,
  default: Option<Value>,
  nullable: bool,
  inject: Option<String>,
  element_type: Option<String>,
}

impl ParamDescriptor {
  fn with_type(name: impl Into<String>, type_name: Option<String>, builtin: bool) -> Self {
    Self {
      name: name.into(),
      type_name,
      builtin,
      default: None,
      nullable: false,
      inject: None,
      element_type: None,
    }
  }

  /// A parameter of a scalar or generic collection type (string, int, array...).
  pub fn builtin(name: impl Into<String>, type_name: impl Into<String>) -> Self {
    Self::with_type(name, Some(type_name.into()), true)
  }

  /// A parameter whose type is itself resolved from the container.
  pub fn service(name: impl Into<String>, type_name: impl Into<String>) -> Self {
    Self::with_type(name, Some(type_name.into()), false)
  }

  /// A parameter without a declared type. Argument resolution leaves it absent
  /// unless a value is supplied explicitly.
  pub fn untyped(name: impl Into<String>) -> Self {
    Self::with_type(name, None, true)
  }

  pub fn with_default(mut self, value: impl Into<Value>) -> Self {
    self.default = Some(value.into());
    self
  }

  pub fn nullable(mut self) -> Self {
    self.nullable = true;
    self
  }

  /// Resolves this parameter from `key` instead of its declared type name.
  pub fn inject(mut self, key: impl Into<String>) -> Self {
    self.inject = Some(key.into());
    self
  }

  /// Marks this parameter as a homogeneous collection of `target` for hydration.
  pub fn array_of(mut self, target: impl Into<String>) -> Self {
    self.element_type = Some(target.into());
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn type_name(&self) -> Option<&str> {
    self.type_name.as_deref()
  }

  pub fn is_builtin(&self) -> bool {
    self.builtin
  }

  pub fn has_default(&self) -> bool {
    self.default.is_some()
  }

  pub fn default_value(&self) -> Option<&Value> {
    self.default.as_ref()
  }

  pub fn is_nullable(&self) -> bool {
    self.nullable
  }

  pub fn bind_key(&self) -> Option<&str> {
    self.inject.as_deref()
  }

  pub fn element_type(&self) -> Option<&str> {
    self.element_type.as_deref()
  }

  /// The identifier the container resolves this parameter from, if any.
  pub(crate) fn lookup_key(&self) -> Option<&str> {
    match (&self.inject, &self.type_name) {
      (Some(key), _) => Some(key.as_str()),
      (None, Some(type_name)) if !self.builtin => Some(type_name.as_str()),
      _ => None,
    }
  }
}

/// Describes a constructible type: its primary constructor and type-level hints.
#[derive(Clone)]
pub struct TypeDescriptor {
  name: String,
  params: Vec<ParamDescriptor>,
  singleton: bool,
  provides: Vec<String>,
  constructor: Constructor,
}

impl TypeDescriptor {
  /// Creates a descriptor for `name`, built by `constructor`.
  ///
  /// The constructor receives the resolved arguments keyed by parameter name.
  pub fn new<T, F>(name: impl Into<String>, constructor: F) -> Self
  where
    T: Any + Send + Sync,
    F: Fn(&mut Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      params: Vec::new(),
      singleton: false,
      provides: Vec::new(),
      constructor: Arc::new(move |args| Ok(Arc::new(constructor(args)?) as Instance)),
    }
  }

  /// Appends a constructor parameter. Order is declaration order.
  pub fn param(mut self, param: ParamDescriptor) -> Self {
    self.params.push(param);
    self
  }

  /// Resolved instances are cached and reused for the container's lifetime.
  pub fn singleton(mut self) -> Self {
    self.singleton = true;
    self
  }

  /// Declares that this type satisfies `alias`. Repeatable.
  pub fn provides(mut self, alias: impl Into<String>) -> Self {
    self.provides.push(alias.into());
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn params(&self) -> &[ParamDescriptor] {
    &self.params
  }

  pub fn param_named(&self, name: &str) -> Option<&ParamDescriptor> {
    self.params.iter().find(|p| p.name == name)
  }

  pub fn is_singleton(&self) -> bool {
    self.singleton
  }

  pub fn provided_aliases(&self) -> &[String] {
    &self.provides
  }

  pub(crate) fn construct(&self, args: &mut Arguments) -> Result<Instance, BoxError> {
    (self.constructor)(args)
  }
}

impl fmt::Debug for TypeDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeDescriptor")
      .field("name", &self.name)
      .field("params", &self.params)
      .field("singleton", &self.singleton)
      .field("provides", &self.provides)
      .finish_non_exhaustive()
  }
}

/// Types that know how to describe themselves to the container.
pub trait Injectable: Any + Send + Sync + Sized {
  fn descriptor() -> TypeDescriptor;
}
