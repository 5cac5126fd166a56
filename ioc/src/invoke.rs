//! Calling functions with container-resolved arguments.

use std::fmt;

use crate::args::Arguments;
use crate::container::ServiceContainer;
use crate::descriptor::ParamDescriptor;
use crate::error::{BoxError, Error, Result};

type Body<R> = Box<dyn Fn(&mut Arguments) -> Result<R, BoxError> + Send + Sync>;

/// A function together with the parameter list the container fills for it.
///
/// ```
/// use fibre_autowire::{Arguments, Callable, ParamDescriptor, ServiceContainer};
/// use serde_json::json;
///
/// let container = ServiceContainer::new();
/// let double = Callable::new("double", |args| Ok(args.value::<i64>("x")? * 2))
///   .param(ParamDescriptor::builtin("x", "int").with_default(21));
///
/// assert_eq!(container.invoke(&double, Arguments::new()).unwrap(), 42);
/// assert_eq!(container.invoke(&double, Arguments::new().with("x", json!(5))).unwrap(), 10);
/// ```
pub struct Callable<R> {
  name: String,
  params: Vec<ParamDescriptor>,
  body: Body<R>,
}

impl<R> Callable<R> {
  pub fn new<F>(name: impl Into<String>, body: F) -> Self
  where
    F: Fn(&mut Arguments) -> Result<R, BoxError> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      params: Vec::new(),
      body: Box::new(body),
    }
  }

  pub fn param(mut self, param: ParamDescriptor) -> Self {
    self.params.push(param);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn params(&self) -> &[ParamDescriptor] {
    &self.params
  }
}

impl<R> fmt::Debug for Callable<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Callable")
      .field("name", &self.name)
      .field("params", &self.params)
      .finish_non_exhaustive()
  }
}

impl ServiceContainer {
  /// Resolves the callable's parameters, seeded with `overrides`, and calls it.
  ///
  /// Resolution failures are returned as they occurred; a failure returned
  /// by the callable itself becomes [`Error::Invocation`].
  pub fn invoke<R>(&self, callable: &Callable<R>, overrides: Arguments) -> Result<R> {
    let mut arguments = self.resolve_arguments(callable.name(), callable.params(), overrides)?;
    (callable.body)(&mut arguments).map_err(|source| Error::Invocation { source })
  }
}
