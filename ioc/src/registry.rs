//! The per-container tables: type catalog, alias registry and singleton cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::args::Instance;
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};

/// Type name -> descriptor. These are the names the container can construct.
#[derive(Default)]
pub(crate) struct TypeCatalog {
  types: DashMap<String, Arc<TypeDescriptor>>,
}

impl TypeCatalog {
  pub(crate) fn insert(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
    let descriptor = Arc::new(descriptor);
    self
      .types
      .insert(descriptor.name().to_owned(), descriptor.clone());
    descriptor
  }

  pub(crate) fn get(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
    self.types.get(type_name).map(|entry| entry.value().clone())
  }

  pub(crate) fn contains(&self, type_name: &str) -> bool {
    self.types.contains_key(type_name)
  }
}

/// Identifier -> concrete type name. Last write wins.
#[derive(Default)]
pub(crate) struct AliasRegistry {
  map: DashMap<String, String>,
}

impl AliasRegistry {
  pub(crate) fn insert(&self, alias: String, concrete: String) -> Option<String> {
    self.map.insert(alias, concrete)
  }

  pub(crate) fn get(&self, alias: &str) -> Option<String> {
    self.map.get(alias).map(|entry| entry.value().clone())
  }

  pub(crate) fn contains(&self, alias: &str) -> bool {
    self.map.contains_key(alias)
  }

  pub(crate) fn extend(&self, entries: HashMap<String, String>) {
    for (alias, concrete) in entries {
      self.map.insert(alias, concrete);
    }
  }

  pub(crate) fn snapshot(&self) -> HashMap<String, String> {
    self
      .map
      .iter()
      .map(|entry| (entry.key().clone(), entry.value().clone()))
      .collect()
  }
}

/// Which thread is building which slot, and which slot each blocked thread
/// is waiting on.
#[derive(Default)]
struct WaitGraph {
  builders: HashMap<String, ThreadId>,
  waiting: HashMap<ThreadId, String>,
}

impl WaitGraph {
  /// Follows builder -> waited slot -> builder edges starting at `id` and
  /// reports whether they lead back to `me`.
  fn leads_to(&self, id: &str, me: ThreadId) -> bool {
    let mut next = id;
    // Each hop moves to a distinct waiting thread, so this bounds the walk.
    for _ in 0..=self.waiting.len() {
      let Some(builder) = self.builders.get(next) else {
        return false;
      };
      if *builder == me {
        return true;
      }
      match self.waiting.get(builder) {
        Some(target) => next = target.as_str(),
        None => return false,
      }
    }
    false
  }
}

/// Identifier -> constructed singleton.
///
/// Construction goes through a per-identifier `OnceCell` slot, so concurrent
/// first requests for the same identifier build exactly one instance. A
/// thread about to block on a slot checks the wait graph first, so two
/// threads building the two ends of a cycle fail instead of deadlocking.
#[derive(Default)]
pub(crate) struct SingletonCache {
  instances: DashMap<String, Instance>,
  slots: DashMap<String, Arc<OnceCell<Instance>>>,
  graph: Mutex<WaitGraph>,
}

/// Marks the current thread as waiting on a slot until dropped.
pub(crate) struct SlotWait<'a> {
  graph: &'a Mutex<WaitGraph>,
  thread: ThreadId,
}

impl Drop for SlotWait<'_> {
  fn drop(&mut self) {
    self.graph.lock().waiting.remove(&self.thread);
  }
}

/// Marks the current thread as the builder of a slot until dropped.
pub(crate) struct SlotBuild<'a> {
  graph: &'a Mutex<WaitGraph>,
  id: String,
}

impl Drop for SlotBuild<'_> {
  fn drop(&mut self) {
    self.graph.lock().builders.remove(&self.id);
  }
}

impl SingletonCache {
  pub(crate) fn get(&self, id: &str) -> Option<Instance> {
    self.instances.get(id).map(|entry| entry.value().clone())
  }

  pub(crate) fn contains(&self, id: &str) -> bool {
    self.instances.contains_key(id)
  }

  pub(crate) fn insert(&self, id: String, instance: Instance) {
    self.instances.insert(id, instance);
  }

  pub(crate) fn extend(&self, entries: HashMap<String, Instance>) {
    for (id, instance) in entries {
      self.instances.insert(id, instance);
    }
  }

  /// The construction slot for `id`. The returned `Arc` must not be held
  /// while waiting on any other slot of the same identifier.
  pub(crate) fn slot(&self, id: &str) -> Arc<OnceCell<Instance>> {
    self.slots.entry(id.to_owned()).or_default().clone()
  }

  /// Registers the current thread as waiting on the slot for `id`.
  ///
  /// Fails with `CircularDependency` when the thread building that slot is,
  /// directly or through other blocked threads, waiting on this one.
  pub(crate) fn wait_for(&self, id: &str) -> Result<SlotWait<'_>> {
    let me = thread::current().id();
    let mut graph = self.graph.lock();
    if graph.leads_to(id, me) {
      return Err(Error::CircularDependency { id: id.to_owned() });
    }
    graph.waiting.insert(me, id.to_owned());
    Ok(SlotWait {
      graph: &self.graph,
      thread: me,
    })
  }

  /// Records the current thread as the builder of the slot for `id`. The
  /// thread stops counting as waiting, since it now runs the constructor.
  pub(crate) fn begin_build(&self, id: &str) -> SlotBuild<'_> {
    let me = thread::current().id();
    let mut graph = self.graph.lock();
    graph.waiting.remove(&me);
    graph.builders.insert(id.to_owned(), me);
    SlotBuild {
      graph: &self.graph,
      id: id.to_owned(),
    }
  }

  /// Drops the construction slot once its instance is in the table.
  pub(crate) fn retire_slot(&self, id: &str) {
    self.slots.remove(id);
  }

  pub(crate) fn snapshot(&self) -> HashMap<String, Instance> {
    self
      .instances
      .iter()
      .map(|entry| (entry.key().clone(), entry.value().clone()))
      .collect()
  }

  pub(crate) fn len(&self) -> usize {
    self.instances.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn alias_registry_is_last_write_wins() {
    let aliases = AliasRegistry::default();
    assert_eq!(aliases.insert("Greeter".into(), "English".into()), None);
    assert_eq!(
      aliases.insert("Greeter".into(), "German".into()),
      Some("English".into())
    );
    assert_eq!(aliases.get("Greeter").as_deref(), Some("German"));
    assert_eq!(aliases.snapshot().len(), 1);
  }

  #[test]
  fn singleton_slot_is_shared_until_retired() {
    let cache = SingletonCache::default();
    let first = cache.slot("A");
    let second = cache.slot("A");
    assert!(Arc::ptr_eq(&first, &second));

    cache.retire_slot("A");
    let third = cache.slot("A");
    assert!(!Arc::ptr_eq(&first, &third));
  }

  #[test]
  fn waiting_on_a_slot_built_by_a_thread_waiting_on_us_is_a_cycle() {
    let cache = SingletonCache::default();
    let me = thread::current().id();
    let other = thread::spawn(|| thread::current().id()).join().unwrap();

    let _building_a = cache.begin_build("A");
    {
      let mut graph = cache.graph.lock();
      graph.builders.insert("B".to_owned(), other);
      graph.waiting.insert(other, "A".to_owned());
    }

    assert!(matches!(
      cache.wait_for("B"),
      Err(Error::CircularDependency { ref id }) if id == "B"
    ));
    assert!(!cache.graph.lock().waiting.contains_key(&me));

    // Once the other thread stops waiting, blocking on B is safe again.
    cache.graph.lock().waiting.remove(&other);
    let wait = cache.wait_for("B").unwrap();
    assert_eq!(cache.graph.lock().waiting.get(&me).map(String::as_str), Some("B"));
    drop(wait);
    assert!(cache.graph.lock().waiting.is_empty());
  }
}
