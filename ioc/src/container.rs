//! The `ServiceContainer` and its resolution algorithm.

use std::any::{type_name, Any};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::args::{Argument, Arguments, Instance};
use crate::builder::ContainerBuilder;
use crate::cache::{Cache, CacheValue, MemoryCache, ALIASES_KEY, SINGLETONS_KEY};
use crate::config::ContainerConfig;
use crate::core::{next_container_id, ResolutionGuard};
use crate::descriptor::{Injectable, ParamDescriptor, TypeDescriptor};
use crate::error::{Error, Result};
use crate::registry::{AliasRegistry, SingletonCache, TypeCatalog};

/// Whether a resolution may read and populate the singleton cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SingletonPolicy {
  Cached,
  Bypass,
}

/// The dependency-injection container.
///
/// It owns a catalog of [`TypeDescriptor`]s, an alias table and a singleton
/// cache. All three are safe to use from several threads; registration and
/// resolution take `&self`.
pub struct ServiceContainer {
  id: u64,
  pub(crate) config: ContainerConfig,
  cache: Arc<dyn Cache>,
  catalog: TypeCatalog,
  aliases: AliasRegistry,
  singletons: SingletonCache,
  // Mutations take the read side; `flush` takes the write side to snapshot.
  persistence: RwLock<()>,
  dirty: AtomicBool,
}

impl Default for ServiceContainer {
  fn default() -> Self {
    Self::new()
  }
}

impl ServiceContainer {
  /// Creates a container over a fresh [`MemoryCache`] with default configuration.
  pub fn new() -> Self {
    Self::from_parts(ContainerConfig::default(), Arc::new(MemoryCache::new()))
  }

  /// Creates a container that restores from, and flushes to, `cache`.
  pub fn with_cache(cache: Arc<dyn Cache>) -> Self {
    Self::from_parts(ContainerConfig::default(), cache)
  }

  pub fn builder() -> ContainerBuilder {
    ContainerBuilder::new()
  }

  pub(crate) fn from_parts(config: ContainerConfig, cache: Arc<dyn Cache>) -> Self {
    let container = Self {
      id: next_container_id(),
      config,
      cache,
      catalog: TypeCatalog::default(),
      aliases: AliasRegistry::default(),
      singletons: SingletonCache::default(),
      persistence: RwLock::new(()),
      dirty: AtomicBool::new(false),
    };

    if let Some(CacheValue::Aliases(aliases)) = container.cache.get(ALIASES_KEY) {
      container.aliases.extend(aliases);
    }
    if let Some(CacheValue::Singletons(instances)) = container.cache.get(SINGLETONS_KEY) {
      container.singletons.extend(instances);
    }
    if !container.config.aliases.is_empty() {
      container.aliases.extend(container.config.aliases.clone());
      container.dirty.store(true, Ordering::Release);
    }

    debug!(
      container = container.id,
      singletons = container.singletons.len(),
      "service container restored from cache"
    );
    container
  }

  pub fn config(&self) -> &ContainerConfig {
    &self.config
  }

  // --- Registration ---

  /// Adds a type to the catalog. Its `provides` hints are not applied; see
  /// [`ServiceContainer::register_with_aliases`] and discovery for that.
  pub fn register(&self, descriptor: TypeDescriptor) {
    trace!(type_name = descriptor.name(), "registered type descriptor");
    self.catalog.insert(descriptor);
  }

  /// Registers a type that describes itself.
  pub fn register_type<T: Injectable>(&self) {
    self.register(T::descriptor());
  }

  /// Adds a type to the catalog and registers every alias it provides.
  pub fn register_with_aliases(&self, descriptor: TypeDescriptor) {
    let descriptor = self.catalog.insert(descriptor);
    for alias in descriptor.provided_aliases() {
      self.add_alias(alias.clone(), descriptor.name());
    }
  }

  /// Maps `alias` to the concrete type `concrete`, replacing any earlier mapping.
  pub fn add_alias(&self, alias: impl Into<String>, concrete: impl Into<String>) {
    let alias = alias.into();
    let concrete = concrete.into();
    debug!(alias = %alias, concrete = %concrete, "registered alias");
    let _lock = self.persistence.read();
    self.aliases.insert(alias, concrete);
    self.dirty.store(true, Ordering::Release);
  }

  /// Seeds the singleton cache with an existing value.
  pub fn register_instance<T: Any + Send + Sync>(&self, id: impl Into<String>, value: T) {
    self.register_shared(id, Arc::new(value));
  }

  /// Seeds the singleton cache with an already shared instance.
  pub fn register_shared(&self, id: impl Into<String>, instance: Instance) {
    self.store_singleton(id.into(), instance);
  }

  fn store_singleton(&self, id: String, instance: Instance) {
    let _lock = self.persistence.read();
    self.singletons.insert(id, instance);
    self.dirty.store(true, Ordering::Release);
  }

  // --- Inspection ---

  /// Returns `true` if `id` names a cached singleton, an alias or a
  /// registered type.
  ///
  /// This guarantees `get(id)` will not fail with [`Error::NotFound`]; it may
  /// still fail while constructing.
  pub fn has(&self, id: &str) -> bool {
    self.singletons.contains(id) || self.aliases.contains(id) || self.catalog.contains(id)
  }

  pub fn alias_of(&self, alias: &str) -> Option<String> {
    self.aliases.get(alias)
  }

  pub fn descriptor(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
    self.catalog.get(type_name)
  }

  // --- Resolution ---

  /// Finds or builds the entry for `id`.
  pub fn get(&self, id: &str) -> Result<Instance> {
    self.get_with(id, Arguments::new())
  }

  /// Finds or builds the entry for `id`, using `overrides` for any
  /// constructor parameters they name. Overrides are ignored when a cached
  /// singleton is returned.
  pub fn get_with(&self, id: &str, overrides: Arguments) -> Result<Instance> {
    self.resolve(id, overrides, SingletonPolicy::Cached)
  }

  /// Typed form of [`ServiceContainer::get`].
  pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
    self.get_as_with(id, Arguments::new())
  }

  /// Typed form of [`ServiceContainer::get_with`].
  pub fn get_as_with<T: Any + Send + Sync>(&self, id: &str, overrides: Arguments) -> Result<Arc<T>> {
    let instance = self.get_with(id, overrides)?;
    downcast_instance(id, instance)
  }

  pub(crate) fn resolve(&self, id: &str, overrides: Arguments, policy: SingletonPolicy) -> Result<Instance> {
    if policy == SingletonPolicy::Cached {
      if let Some(instance) = self.singletons.get(id) {
        trace!(id, "returning cached singleton");
        return Ok(instance);
      }
    }

    if !self.has(id) {
      return Err(Error::NotFound { id: id.to_owned() });
    }

    let _guard = ResolutionGuard::enter(self.id, id)?;

    let descriptor = self.descriptor_for(id)?;

    if !(descriptor.is_singleton() && policy == SingletonPolicy::Cached) {
      return self.construct(id, &descriptor, overrides);
    }

    let slot = self.singletons.slot(id);
    // Another thread may have finished and retired its slot since the check above.
    if let Some(instance) = self.singletons.get(id) {
      return Ok(instance);
    }
    let wait = self.singletons.wait_for(id)?;
    let instance = slot
      .get_or_try_init(|| {
        let _build = self.singletons.begin_build(id);
        self.construct(id, &descriptor, overrides)
      })?
      .clone();
    drop(wait);
    self.store_singleton(id.to_owned(), instance.clone());
    self.singletons.retire_slot(id);
    debug!(id, type_name = descriptor.name(), "cached singleton instance");
    Ok(instance)
  }

  /// Follows one alias hop from `id` and looks the concrete type up in the catalog.
  pub(crate) fn descriptor_for(&self, id: &str) -> Result<Arc<TypeDescriptor>> {
    let concrete = self.aliases.get(id).unwrap_or_else(|| id.to_owned());
    self.catalog.get(&concrete).ok_or_else(|| {
      Error::container(
        id,
        Error::UnknownType {
          type_name: concrete,
        },
      )
    })
  }

  fn construct(&self, id: &str, descriptor: &TypeDescriptor, overrides: Arguments) -> Result<Instance> {
    let mut arguments = self
      .resolve_arguments(descriptor.name(), descriptor.params(), overrides)
      .map_err(|e| Error::container(id, e))?;
    descriptor
      .construct(&mut arguments)
      .map_err(|source| Error::Container {
        id: id.to_owned(),
        source,
      })
  }

  /// Fills every parameter `arguments` does not already name.
  ///
  /// Supplied arguments are kept untouched, except that a supplied `null` for
  /// a typed parameter counts as absent. Untyped parameters are left as given.
  /// Parameters with a bind key or a non-builtin type are resolved from the
  /// container; builtin ones fall back to their default, then to `null` when
  /// nullable.
  pub(crate) fn resolve_arguments(
    &self,
    owner: &str,
    params: &[ParamDescriptor],
    mut arguments: Arguments,
  ) -> Result<Arguments> {
    for param in params {
      if param.type_name().is_none() {
        continue;
      }
      let supplied_null = matches!(arguments.get(param.name()), Some(Argument::Value(Value::Null)));
      if supplied_null {
        arguments.take(param.name());
      } else if arguments.contains(param.name()) {
        continue;
      }

      if let Some(key) = param.lookup_key() {
        trace!(owner, parameter = param.name(), key, "resolving parameter from container");
        let instance = self.get(key)?;
        arguments.insert(param.name(), Argument::Service(instance));
        continue;
      }

      let value = match param.default_value() {
        Some(default) => default.clone(),
        None if param.is_nullable() => Value::Null,
        None => {
          return Err(Error::Resolution {
            parameter: param.name().to_owned(),
            target: owner.to_owned(),
          })
        }
      };
      arguments.insert(param.name(), value);
    }
    Ok(arguments)
  }

  // --- Persistence ---

  /// Writes the alias table and the singleton cache back to the cache store.
  pub fn flush(&self) -> Result<()> {
    let _lock = self.persistence.write();
    let aliases = self.aliases.snapshot();
    let singletons = self.singletons.snapshot();
    debug!(
      container = self.id,
      aliases = aliases.len(),
      singletons = singletons.len(),
      "flushing container state"
    );
    self.cache.set(ALIASES_KEY, CacheValue::Aliases(aliases))?;
    self.cache.set(SINGLETONS_KEY, CacheValue::Singletons(singletons))?;
    self.dirty.store(false, Ordering::Release);
    Ok(())
  }

  /// Flushes and consumes the container. The implicit flush on drop is skipped.
  pub fn close(self) -> Result<()> {
    self.flush()
  }
}

impl Drop for ServiceContainer {
  fn drop(&mut self) {
    if !self.config.persist_on_drop || !self.dirty.load(Ordering::Acquire) {
      return;
    }
    if let Err(e) = self.flush() {
      warn!(container = self.id, error = %e, "failed to flush container state on drop");
    }
  }
}

pub(crate) fn downcast_instance<T: Any + Send + Sync>(id: &str, instance: Instance) -> Result<Arc<T>> {
  instance.downcast::<T>().map_err(|_| {
    Error::container(
      id,
      Error::TypeMismatch {
        id: id.to_owned(),
        expected: type_name::<T>(),
      },
    )
  })
}
