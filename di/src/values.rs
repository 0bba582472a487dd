//! Hierarchical `(type, name) -> instance` stores.

use crate::core::{wrap, InjectionKey, Instance, Target, TypeInfo, Value};
use crate::error::{Error, Result};
use crate::resolver::Resolver;

use dashmap::DashMap;
use parking_lot::{ReentrantMutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A thread-safe `(type, name) -> instance` store with parent fallback.
///
/// Lookups check this store first and then walk the chain of parents. Writes
/// only ever touch this store: a scope can shadow an ancestor's binding but
/// never replaces or removes it.
#[derive(Default)]
pub struct Values {
  parent: Option<Arc<Values>>,
  instances: RwLock<HashMap<InjectionKey, Instance>>,
}

impl Values {
  /// Creates a store with no parent.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a child store that falls back to `parent` on lookup.
  pub fn new_scope(parent: Arc<Values>) -> Self {
    Self {
      parent: Some(parent),
      instances: RwLock::default(),
    }
  }

  pub fn parent(&self) -> Option<&Arc<Values>> {
    self.parent.as_ref()
  }

  /// The number of bindings held locally (ancestors not included).
  pub fn len(&self) -> usize {
    self.instances.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.instances.read().is_empty()
  }

  // --- PRIVATE HELPERS ---

  pub(crate) fn get_local(&self, key: &InjectionKey) -> Option<Instance> {
    self.instances.read().get(key).cloned()
  }

  pub(crate) fn get_ancestor(&self, key: &InjectionKey) -> Option<Instance> {
    let mut current = self.parent.as_deref();
    while let Some(values) = current {
      if let Some(instance) = values.get_local(key) {
        return Some(instance);
      }
      current = values.parent.as_deref();
    }
    None
  }

  pub(crate) fn lookup(&self, key: &InjectionKey) -> Option<Instance> {
    self.get_local(key).or_else(|| self.get_ancestor(key))
  }

  pub(crate) fn set_local(&self, key: InjectionKey, instance: Instance) {
    self.instances.write().insert(key, instance);
  }

  // --- PUBLIC API ---

  // --- Lookup ---
  pub fn get<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>> {
    self.get_named("")
  }

  pub fn get_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
    self.resolve_named(name)
  }

  /// Fills `target` with the binding for its declared type and `name`.
  pub fn get_into(&self, target: &mut dyn Target, name: &str) -> Result<()> {
    let instance = self.resolve_instance(&target.type_info(), name)?;
    target.assign(&instance, name)
  }

  // --- Binding ---
  pub fn set<T: Any + Send + Sync>(&self, value: T) {
    self.set_arc_named("", Arc::new(value));
  }

  pub fn set_named<T: Any + Send + Sync>(&self, name: &str, value: T) {
    self.set_arc_named(name, Arc::new(value));
  }

  /// Binds an already shared value; `T` may be a trait object.
  pub fn set_arc_named<T: ?Sized + Any + Send + Sync>(&self, name: &str, value: Arc<T>) {
    self.set_local(InjectionKey::of::<T>(name), wrap(value));
  }

  /// Binds an erased value under its own type. Fails on nil values.
  pub fn set_value(&self, value: Value, name: &str) -> Result<()> {
    let (type_info, instance) = value.canonical(name)?;
    self.set_local(InjectionKey::new(type_info, name), instance);
    Ok(())
  }
}

impl Resolver for Values {
  fn resolve_instance(&self, type_info: &TypeInfo, name: &str) -> Result<Instance> {
    let key = InjectionKey::new(type_info.clone(), name);
    self.lookup(&key).ok_or_else(|| Error::InstanceNotFound {
      key: key.service_key(),
    })
  }
}

impl fmt::Debug for Values {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let keys: Vec<InjectionKey> = self.instances.read().keys().cloned().collect();
    f.debug_struct("Values")
      .field("keys", &keys)
      .field("has_parent", &self.parent.is_some())
      .finish()
  }
}

// --- InstanceCache ---

/// Realized singletons of one container.
///
/// Each key gets its own re-entrant lock held across check, create and store,
/// so concurrent resolvers of an uncached key run its factory only once.
/// Re-entry from the same thread passes through the lock; that case is
/// self-recursion and is bounded by the resolver's recursion graph.
#[derive(Default)]
pub(crate) struct InstanceCache {
  values: Values,
  locks: DashMap<InjectionKey, Arc<ReentrantMutex<()>>>,
}

impl InstanceCache {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn get(&self, key: &InjectionKey) -> Option<Instance> {
    self.values.get_local(key)
  }

  pub(crate) fn insert(&self, key: InjectionKey, instance: Instance) {
    self.values.set_local(key, instance);
  }

  /// Returns the cached instance for `key`, running `create` on a miss.
  ///
  /// Failures are not cached; a later call runs `create` again.
  pub(crate) fn get_or_try_create<F>(&self, key: &InjectionKey, create: F) -> Result<Instance>
  where
    F: FnOnce() -> Result<Instance>,
  {
    if let Some(instance) = self.get(key) {
      return Ok(instance);
    }

    let lock = Arc::clone(
      &self
        .locks
        .entry(key.clone())
        .or_insert_with(|| Arc::new(ReentrantMutex::new(()))),
    );
    let _guard = lock.lock();

    // Another thread may have finished while we waited.
    if let Some(instance) = self.get(key) {
      return Ok(instance);
    }

    let instance = create()?;
    self.insert(key.clone(), Arc::clone(&instance));
    Ok(instance)
  }
}

impl fmt::Debug for InstanceCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InstanceCache")
      .field("instances", &self.values.len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::downcast;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::thread;
  use std::time::Duration;

  #[test]
  fn child_shadows_without_touching_parent() {
    let parent = Arc::new(Values::new());
    parent.set(1_i32);
    let child = Values::new_scope(Arc::clone(&parent));

    assert_eq!(*child.get::<i32>().unwrap(), 1);

    child.set(2_i32);
    assert_eq!(*child.get::<i32>().unwrap(), 2);
    assert_eq!(*parent.get::<i32>().unwrap(), 1);
    assert_eq!(parent.len(), 1);
  }

  #[test]
  fn lookup_walks_every_ancestor() {
    let root = Arc::new(Values::new());
    root.set_named("greeting", String::from("hi"));
    let middle = Arc::new(Values::new_scope(Arc::clone(&root)));
    let leaf = Values::new_scope(middle);

    let key = InjectionKey::of::<String>("greeting");
    assert!(leaf.get_local(&key).is_none());
    assert!(leaf.get_ancestor(&key).is_some());
    assert_eq!(*leaf.get_named::<String>("greeting").unwrap(), "hi");
  }

  #[test]
  fn cache_runs_create_once_under_contention() {
    let cache = InstanceCache::new();
    let key = InjectionKey::of::<usize>("");
    let calls = AtomicUsize::new(0);

    thread::scope(|s| {
      for _ in 0..8 {
        s.spawn(|| {
          let instance = cache
            .get_or_try_create(&key, || {
              calls.fetch_add(1, Ordering::SeqCst);
              thread::sleep(Duration::from_millis(20));
              Ok(wrap(Arc::new(42_usize)))
            })
            .unwrap();
          assert_eq!(*downcast::<usize>(&instance).unwrap(), 42);
        });
      }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn cache_does_not_keep_failures() {
    let cache = InstanceCache::new();
    let key = InjectionKey::of::<u8>("");

    let err = cache.get_or_try_create(&key, || {
      Err(Error::CreateInstanceNil {
        key: key.service_key(),
      })
    });
    assert!(err.is_err());
    assert!(cache.get(&key).is_none());

    let instance = cache
      .get_or_try_create(&key, || Ok(wrap(Arc::new(3_u8))))
      .unwrap();
    assert_eq!(*downcast::<u8>(&instance).unwrap(), 3);
  }
}
