//! The resolution capability and the per-call dependency resolver.

use crate::container::{Container, ContainerRef};
use crate::core::{downcast, wrap, InjectionKey, Instance, ServiceKey, Target, TypeInfo};
use crate::error::{Error, Result};
use crate::lifetime::Lifetime;
use crate::registry::Registration;

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// Something that can resolve instances by type and name.
///
/// Implemented by [`Container`], [`ContainerRef`], [`Values`](crate::Values)
/// and [`DependencyResolver`]. The typed helpers return the shared instance; the
/// [`Target`] based helpers fill caller-provided slots instead.
pub trait Resolver: Send + Sync {
  /// Resolves the instance bound to `type_info` and `name`.
  fn resolve_instance(&self, type_info: &TypeInfo, name: &str) -> Result<Instance>;

  /// Resolves into `target`, using the target's declared type.
  fn resolve_into(&self, target: &mut dyn Target, name: &str) -> Result<()> {
    let instance = self.resolve_instance(&target.type_info(), name)?;
    target.assign(&instance, name)
  }

  fn resolve<T: ?Sized + Any + Send + Sync>(&self) -> Result<Arc<T>>
  where
    Self: Sized,
  {
    self.resolve_named("")
  }

  fn resolve_named<T: ?Sized + Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>>
  where
    Self: Sized,
  {
    let instance = self.resolve_instance(&TypeInfo::of::<T>(), name)?;
    downcast::<T>(&instance).ok_or_else(|| Error::UnexpectedValueType {
      key: ServiceKey::of::<T>(name),
      actual: "an instance of another type",
    })
  }
}

/// Resolves every target in turn under the unnamed binding.
///
/// Stops at the first failure; targets before it stay filled.
pub fn resolve_all<R: Resolver + ?Sized>(resolver: &R, targets: &mut [&mut dyn Target]) -> Result<()> {
  for target in targets.iter_mut() {
    resolver.resolve_into(&mut **target, "")?;
  }
  Ok(())
}

/// Resolves each group of targets under its name.
///
/// Stops at the first failure. Groups are visited in map order.
pub fn resolve_all_named<R: Resolver + ?Sized>(
  resolver: &R,
  named: &mut HashMap<&str, Vec<&mut dyn Target>>,
) -> Result<()> {
  for (name, targets) in named.iter_mut() {
    for target in targets.iter_mut() {
      resolver.resolve_into(&mut **target, name)?;
    }
  }
  Ok(())
}

// --- RecursionGraph ---

/// Counts entries per key for one externally initiated resolve call.
pub(crate) struct RecursionGraph {
  limit: usize,
  counts: Mutex<HashMap<InjectionKey, usize>>,
}

impl RecursionGraph {
  pub(crate) fn new(limit: usize) -> Self {
    Self {
      limit,
      counts: Mutex::new(HashMap::new()),
    }
  }

  /// Records an entry into `key`. Returns `false` once the count reaches the
  /// limit; the first entry is always allowed.
  pub(crate) fn track(&self, key: &InjectionKey) -> bool {
    let mut counts = self.counts.lock();
    let count = counts.entry(key.clone()).or_insert(0);
    *count += 1;
    *count == 1 || *count < self.limit
  }

  pub(crate) fn limit(&self) -> usize {
    self.limit
  }
}

// --- DependencyResolver ---

/// The resolution capability handed to factories.
///
/// One resolver (and one recursion graph) is created per resolve call made on
/// a [`Container`]. Factories receive it so their own nested resolves share
/// that graph and are routed by lifetime the same way.
///
/// A resolver refers to its container through a [`ContainerRef`], so a
/// service that keeps one does not keep the container alive.
#[derive(Clone)]
pub struct DependencyResolver {
  container: ContainerRef,
  graph: Arc<RecursionGraph>,
}

impl DependencyResolver {
  pub(crate) fn new(container: &Container) -> Self {
    let graph = Arc::new(RecursionGraph::new(container.config().recursion_limit));
    Self {
      container: container.downgrade(),
      graph,
    }
  }

  /// The container this resolver resolves against, if it is still alive.
  ///
  /// For a `PerContainer` factory this is the root container.
  pub fn container(&self) -> Option<Container> {
    self.container.upgrade()
  }

  fn for_container(&self, container: &Container) -> Self {
    Self {
      container: container.downgrade(),
      graph: Arc::clone(&self.graph),
    }
  }

  /// Instances for the unnamed capability types, which need no registration.
  fn reserved(&self, type_info: &TypeInfo) -> Option<Instance> {
    let id = type_info.id();
    if id == TypeId::of::<ContainerRef>() {
      Some(wrap(Arc::new(self.container.clone())))
    } else if id == TypeId::of::<dyn Resolver>() {
      Some(wrap::<dyn Resolver>(Arc::new(self.clone())))
    } else if id == TypeId::of::<DependencyResolver>() {
      Some(wrap(Arc::new(self.clone())))
    } else {
      None
    }
  }

  fn track(&self, key: &InjectionKey) -> Result<()> {
    if self.graph.track(key) {
      return Ok(());
    }
    warn!(
      service = key.type_info.name(),
      binding = %key.name,
      limit = self.graph.limit(),
      "infinite recursion detected"
    );
    Err(Error::InfiniteRecursion {
      key: key.service_key(),
      limit: self.graph.limit(),
    })
  }

  /// `PerContainer` and `PerScope`: one instance per cache of `container`.
  fn resolve_singleton(&self, container: &Container, registration: &Registration) -> Result<Instance> {
    let key = registration.key();
    let cache = container.instances();
    if let Some(instance) = cache.get(&key) {
      trace!(service = key.type_info.name(), binding = %key.name, "cache hit");
      return Ok(instance);
    }
    cache.get_or_try_create(&key, || {
      self.track(&key)?;
      registration.create_instance(self)
    })
  }

  fn resolve_per_request(&self, registration: &Registration) -> Result<Instance> {
    self.track(&registration.key())?;
    registration.create_instance(self)
  }
}

impl Resolver for DependencyResolver {
  fn resolve_instance(&self, type_info: &TypeInfo, name: &str) -> Result<Instance> {
    if name.is_empty() {
      if let Some(instance) = self.reserved(type_info) {
        return Ok(instance);
      }
    }

    let key = InjectionKey::new(type_info.clone(), name);
    let container = self.container.upgrade().ok_or_else(|| Error::ContainerDropped {
      key: key.service_key(),
    })?;
    let Some(registration) = container.registry().get(&key) else {
      trace!(service = type_info.name(), binding = name, "no registration; trying ambient values");
      return container
        .values()
        .lookup(&key)
        .or_else(|| container.registered_instance(&key))
        .ok_or_else(|| Error::UnresolvedDependency {
          key: key.service_key(),
        });
    };

    let lifetime = registration.lifetime();
    trace!(service = type_info.name(), binding = name, %lifetime, "resolving");
    match lifetime {
      Lifetime::PerContainer if !container.is_root() => {
        // The factory runs in root scope: its own dependencies resolve
        // against root bindings only.
        let root = container.root();
        self.for_container(root).resolve_singleton(root, &registration)
      }
      _ if lifetime.is_cached() => self.resolve_singleton(&container, &registration),
      _ => self.resolve_per_request(&registration),
    }
  }
}

impl fmt::Debug for DependencyResolver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DependencyResolver")
      .field("container", &self.container)
      .field("recursion_limit", &self.graph.limit())
      .finish()
  }
}
