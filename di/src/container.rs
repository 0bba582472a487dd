//! The `Container` handle and its registration API.

use crate::config::ContainerConfig;
use crate::core::{wrap, InjectionKey, Instance, TypeInfo, Value};
use crate::error::{BoxError, Error, Result};
use crate::lifetime::Lifetime;
use crate::registry::{Registration, Registry};
use crate::resolver::{DependencyResolver, Resolver};
use crate::values::{InstanceCache, Values};

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// A scoped dependency-resolution container.
///
/// `Container` is a cheap, clonable handle; clones refer to the same
/// container. [`Container::scope`] derives a child container that:
///
/// - looks up ambient values in its own store first and then in its ancestors',
/// - starts from a snapshot of the parent's registrations, so later
///   registrations on either side stay private to that side,
/// - caches `PerScope` instances on its own, while `PerContainer` instances
///   always live on the root.
#[derive(Clone)]
pub struct Container {
  inner: Arc<ContainerInner>,
}

struct ContainerInner {
  root: Option<Container>,
  values: Arc<Values>,
  registry: Registry,
  instances: InstanceCache,
  // Instances added through `register_instance*` anywhere in the tree; only
  // the root's store is used.
  registered: Values,
  config: ContainerConfig,
}

impl Default for Container {
  fn default() -> Self {
    Self::new()
  }
}

impl Container {
  /// Creates a new, empty root `Container` with the default configuration.
  pub fn new() -> Self {
    Self::with_config(ContainerConfig::default())
  }

  /// Creates a new, empty root `Container`.
  pub fn with_config(config: ContainerConfig) -> Self {
    Self {
      inner: Arc::new(ContainerInner {
        root: None,
        values: Arc::new(Values::new()),
        registry: Registry::new(),
        instances: InstanceCache::new(),
        registered: Values::new(),
        config,
      }),
    }
  }

  /// Derives a child scope. The parent is not modified.
  pub fn scope(&self) -> Container {
    let scope = Self {
      inner: Arc::new(ContainerInner {
        root: Some(self.root().clone()),
        values: Arc::new(Values::new_scope(Arc::clone(&self.inner.values))),
        registry: self.inner.registry.snapshot(),
        instances: InstanceCache::new(),
        registered: Values::new(),
        config: self.inner.config,
      }),
    };
    debug!(registrations = scope.inner.registry.len(), "created scope");
    scope
  }

  // --- Accessors ---

  /// The root of this container's tree; `self` for a root container.
  pub fn root(&self) -> &Container {
    self.inner.root.as_ref().unwrap_or(self)
  }

  pub fn is_root(&self) -> bool {
    self.inner.root.is_none()
  }

  /// Whether both handles refer to the same container.
  pub fn same_container(&self, other: &Container) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  pub fn config(&self) -> &ContainerConfig {
    &self.inner.config
  }

  /// This scope's ambient value store.
  ///
  /// Ambient values are consulted when nothing is registered for a key.
  pub fn values(&self) -> &Arc<Values> {
    &self.inner.values
  }

  /// A snapshot of this container's registrations, in no particular order.
  pub fn registrations(&self) -> Vec<Arc<Registration>> {
    self.inner.registry.get_all()
  }

  /// A fresh resolver bound to this container, with its own recursion graph.
  ///
  /// The resolver does not keep the container alive.
  pub fn resolver(&self) -> DependencyResolver {
    DependencyResolver::new(self)
  }

  /// A non-owning handle to this container.
  pub fn downgrade(&self) -> ContainerRef {
    ContainerRef {
      inner: Arc::downgrade(&self.inner),
    }
  }

  pub(crate) fn registry(&self) -> &Registry {
    &self.inner.registry
  }

  pub(crate) fn instances(&self) -> &InstanceCache {
    &self.inner.instances
  }

  /// Looks up an instance registered through `register_instance*` on any
  /// container of this tree.
  pub(crate) fn registered_instance(&self, key: &InjectionKey) -> Option<Instance> {
    self.root().inner.registered.get_local(key)
  }

  // --- PRIVATE HELPERS ---

  fn add_registration(&self, registration: Registration) {
    debug!(
      service = registration.type_info().name(),
      binding = registration.name(),
      lifetime = %registration.lifetime(),
      "registered factory"
    );
    self.inner.registry.set(registration);
  }

  fn add_instance_internal(&self, type_info: TypeInfo, name: &str, value: Value, instance: Instance) {
    debug!(service = type_info.name(), binding = name, "registered instance");
    let key = InjectionKey::new(type_info.clone(), name);
    self
      .inner
      .registry
      .set(Registration::from_value(type_info, name, value));
    let root = self.root();
    root.inner.registered.set_local(key.clone(), Arc::clone(&instance));
    root.instances().insert(key, instance);
  }

  // --- PUBLIC API ---

  // --- Factory Registration ---

  /// Registers an erased factory for `type_info` and `name`, replacing any
  /// previous registration of the same key in this container.
  ///
  /// The factory's value must be of the declared type, or, when the declared
  /// type is an [`Interface`](crate::Interface), of one of its listed
  /// implementations. Anything else fails at resolve time.
  pub fn register_named<F>(&self, type_info: impl Into<TypeInfo>, name: &str, lifetime: Lifetime, factory: F)
  where
    F: Fn(&DependencyResolver) -> Result<Value, BoxError> + Send + Sync + 'static,
  {
    self.add_registration(Registration::new(type_info, name, lifetime).with_factory(factory));
  }

  pub fn register<T, F>(&self, lifetime: Lifetime, factory: F)
  where
    T: Any + Send + Sync,
    F: Fn(&DependencyResolver) -> Result<T, BoxError> + Send + Sync + 'static,
  {
    self.register_with_name("", lifetime, factory);
  }

  pub fn register_with_name<T, F>(&self, name: &str, lifetime: Lifetime, factory: F)
  where
    T: Any + Send + Sync,
    F: Fn(&DependencyResolver) -> Result<T, BoxError> + Send + Sync + 'static,
  {
    self.register_named(TypeInfo::of::<T>(), name, lifetime, move |resolver| {
      factory(resolver).map(Value::new)
    });
  }

  // --- Trait Registration ---

  /// Registers a factory for a trait-object service `I`.
  pub fn register_trait<I, F>(&self, lifetime: Lifetime, factory: F)
  where
    I: ?Sized + Any + Send + Sync,
    F: Fn(&DependencyResolver) -> Result<Arc<I>, BoxError> + Send + Sync + 'static,
  {
    self.register_trait_with_name("", lifetime, factory);
  }

  pub fn register_trait_with_name<I, F>(&self, name: &str, lifetime: Lifetime, factory: F)
  where
    I: ?Sized + Any + Send + Sync,
    F: Fn(&DependencyResolver) -> Result<Arc<I>, BoxError> + Send + Sync + 'static,
  {
    self.register_named(TypeInfo::of::<I>(), name, lifetime, move |resolver| {
      factory(resolver).map(Value::from_arc)
    });
  }

  // --- Instance Registration ---

  /// Registers `instance` as a `PerContainer` service.
  ///
  /// The registration lands in this container, and the instance itself is
  /// stored on the root so the whole tree resolves the same value.
  pub fn register_instance<T: Any + Send + Sync>(&self, instance: T) {
    self.register_arc_with_name("", Arc::new(instance));
  }

  pub fn register_instance_with_name<T: Any + Send + Sync>(&self, name: &str, instance: T) {
    self.register_arc_with_name(name, Arc::new(instance));
  }

  /// Registers an already shared instance; `T` may be a trait object.
  pub fn register_arc_with_name<T: ?Sized + Any + Send + Sync>(&self, name: &str, instance: Arc<T>) {
    let value = Value::from_arc(Arc::clone(&instance));
    self.add_instance_internal(TypeInfo::of::<T>(), name, value, wrap(instance));
  }

  /// Registers an erased value under its own type.
  ///
  /// Fails with `NilType` or `NilValue` when `value` is nil.
  pub fn register_named_value(&self, value: Value, name: &str) -> Result<()> {
    let (type_info, instance) = value.canonical(name)?;
    self.add_instance_internal(type_info, name, value, instance);
    Ok(())
  }
}

impl Resolver for Container {
  /// Resolves with a fresh [`DependencyResolver`], so each call gets its own
  /// recursion tracking.
  fn resolve_instance(&self, type_info: &TypeInfo, name: &str) -> Result<Instance> {
    self.resolver().resolve_instance(type_info, name)
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("is_root", &self.is_root())
      .field("registry", &self.inner.registry)
      .field("values", &self.inner.values.len())
      .field("instances", &self.inner.instances)
      .field("config", &self.inner.config)
      .finish()
  }
}

// --- ContainerRef ---

/// A non-owning handle to a [`Container`].
///
/// This is what factories get when they ask for the current container, so a
/// cached service holding on to it does not keep its own scope alive.
#[derive(Clone)]
pub struct ContainerRef {
  inner: Weak<ContainerInner>,
}

impl ContainerRef {
  /// The container, if it is still alive.
  pub fn upgrade(&self) -> Option<Container> {
    self.inner.upgrade().map(|inner| Container { inner })
  }

  pub fn is_alive(&self) -> bool {
    self.inner.strong_count() > 0
  }
}

impl Resolver for ContainerRef {
  /// Fails with `ContainerDropped` once the container is gone.
  fn resolve_instance(&self, type_info: &TypeInfo, name: &str) -> Result<Instance> {
    match self.upgrade() {
      Some(container) => container.resolve_instance(type_info, name),
      None => Err(Error::ContainerDropped {
        key: InjectionKey::new(type_info.clone(), name).service_key(),
      }),
    }
  }
}

impl fmt::Debug for ContainerRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContainerRef")
      .field("alive", &self.is_alive())
      .finish()
  }
}
