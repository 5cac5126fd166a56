//! Core, non-public data structures for the container.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
  // The set of identifiers currently being resolved on this thread, per container.
  static RESOLVING_STACK: RefCell<HashSet<ResolutionKey>> = RefCell::new(HashSet::new());
}

/// Hands out a process-unique id so two containers resolving the same
/// identifier on one thread do not trip each other's cycle detection.
pub(crate) fn next_container_id() -> u64 {
  NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct ResolutionKey {
  container: u64,
  id: String,
}

impl fmt::Debug for ResolutionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Key(Container({}), Id({}))", self.container, self.id)
  }
}

/// An RAII guard that detects circular dependencies.
///
/// Entering pushes the identifier onto the thread-local resolution stack and
/// fails if it is already there. Dropping the guard pops it again.
pub(crate) struct ResolutionGuard {
  key: ResolutionKey,
}

impl ResolutionGuard {
  pub(crate) fn enter(container: u64, id: &str) -> Result<Self> {
    let key = ResolutionKey {
      container,
      id: id.to_owned(),
    };
    let inserted = RESOLVING_STACK.with(|stack| stack.borrow_mut().insert(key.clone()));
    if !inserted {
      return Err(Error::CircularDependency { id: key.id });
    }
    Ok(Self { key })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      stack.borrow_mut().remove(&self.key);
    });
  }
}
