use std::fmt;
use std::sync::Arc;

use crate::cache::{Cache, MemoryCache};
use crate::config::{ContainerConfig, SingletonHydration};
use crate::container::ServiceContainer;
use crate::descriptor::TypeDescriptor;

/// A builder for creating [`ServiceContainer`] instances.
///
/// ```
/// use fibre_autowire::{MemoryCache, ServiceContainer, SingletonHydration};
///
/// let container = ServiceContainer::builder()
///   .cache(MemoryCache::new())
///   .singleton_hydration(SingletonHydration::Shared)
///   .alias("Greeter", "EnglishGreeter")
///   .build();
///
/// assert!(container.has("Greeter"));
/// ```
pub struct ContainerBuilder {
  config: ContainerConfig,
  cache: Option<Arc<dyn Cache>>,
  descriptors: Vec<(TypeDescriptor, bool)>,
}

impl fmt::Debug for ContainerBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContainerBuilder")
      .field("config", &self.config)
      .field("has_cache", &self.cache.is_some())
      .field("descriptors", &self.descriptors.len())
      .finish()
  }
}

impl Default for ContainerBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl ContainerBuilder {
  pub fn new() -> Self {
    Self {
      config: ContainerConfig::default(),
      cache: None,
      descriptors: Vec::new(),
    }
  }

  /// Replaces the whole configuration, e.g. one loaded with
  /// [`ContainerConfig::from_file`].
  pub fn config(mut self, config: ContainerConfig) -> Self {
    self.config = config;
    self
  }

  pub fn cache(self, cache: impl Cache + 'static) -> Self {
    self.shared_cache(Arc::new(cache))
  }

  pub fn shared_cache(mut self, cache: Arc<dyn Cache>) -> Self {
    self.cache = Some(cache);
    self
  }

  pub fn singleton_hydration(mut self, policy: SingletonHydration) -> Self {
    self.config.singleton_hydration = policy;
    self
  }

  pub fn persist_on_drop(mut self, enabled: bool) -> Self {
    self.config.persist_on_drop = enabled;
    self
  }

  pub fn alias(mut self, alias: impl Into<String>, concrete: impl Into<String>) -> Self {
    self.config.aliases.insert(alias.into(), concrete.into());
    self
  }

  /// Registers a descriptor once the container is built.
  pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
    self.descriptors.push((descriptor, false));
    self
  }

  /// Registers a descriptor and its provided aliases once the container is built.
  pub fn register_with_aliases(mut self, descriptor: TypeDescriptor) -> Self {
    self.descriptors.push((descriptor, true));
    self
  }

  pub fn build(self) -> ServiceContainer {
    let cache = self
      .cache
      .unwrap_or_else(|| Arc::new(MemoryCache::new()) as Arc<dyn Cache>);
    let container = ServiceContainer::from_parts(self.config, cache);
    for (descriptor, with_aliases) in self.descriptors {
      if with_aliases {
        container.register_with_aliases(descriptor);
      } else {
        container.register(descriptor);
      }
    }
    container
  }
}
