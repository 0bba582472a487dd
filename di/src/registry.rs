//! Registrations and the per-container registry snapshot.

use crate::core::{InjectionKey, Instance, ServiceKey, TypeInfo, Value};
use crate::error::{BoxError, Error, Result};
use crate::lifetime::Lifetime;
use crate::resolver::DependencyResolver;

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// A factory as stored by a registration.
pub type FactoryFn = Arc<dyn Fn(&DependencyResolver) -> Result<Value, BoxError> + Send + Sync>;

/// A binding of `(type, name)` to the means of producing an instance.
///
/// Registrations are immutable once built and are shared between a container
/// and the scopes cloned from it.
pub struct Registration {
  type_info: TypeInfo,
  name: String,
  lifetime: Lifetime,
  value: Option<Value>,
  factory: Option<FactoryFn>,
}

impl Registration {
  /// A registration without a factory; see [`Registration::with_factory`].
  pub fn new(type_info: impl Into<TypeInfo>, name: &str, lifetime: Lifetime) -> Self {
    Self {
      type_info: type_info.into(),
      name: name.to_owned(),
      lifetime,
      value: None,
      factory: None,
    }
  }

  pub fn with_factory<F>(mut self, factory: F) -> Self
  where
    F: Fn(&DependencyResolver) -> Result<Value, BoxError> + Send + Sync + 'static,
  {
    self.factory = Some(Arc::new(factory));
    self
  }

  /// A `PerContainer` registration whose factory hands back `value`.
  pub(crate) fn from_value(type_info: TypeInfo, name: &str, value: Value) -> Self {
    let produced = value.clone();
    let mut registration =
      Self::new(type_info, name, Lifetime::PerContainer).with_factory(move |_| Ok(produced.clone()));
    registration.value = Some(value);
    registration
  }

  pub fn type_info(&self) -> &TypeInfo {
    &self.type_info
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn lifetime(&self) -> Lifetime {
    self.lifetime
  }

  /// The precomputed value of an instance registration.
  pub fn value(&self) -> Option<&Value> {
    self.value.as_ref()
  }

  pub fn has_factory(&self) -> bool {
    self.factory.is_some()
  }

  pub fn service_key(&self) -> ServiceKey {
    ServiceKey::new(self.type_info.name(), &self.name)
  }

  pub(crate) fn key(&self) -> InjectionKey {
    InjectionKey::new(self.type_info.clone(), &self.name)
  }

  /// Runs the factory with `resolver` as its resolution capability and checks
  /// that the produced value fits the declared type.
  ///
  /// A value of exactly the declared type is accepted as is. When the declared
  /// type is an [`Interface`](crate::Interface), a value of one of its listed
  /// implementations is converted into the trait object.
  pub fn create_instance(&self, resolver: &DependencyResolver) -> Result<Instance> {
    let factory = self.factory.as_ref().ok_or_else(|| Error::CreateInstanceNil {
      key: self.service_key(),
    })?;

    let value = factory(resolver).map_err(|source| Error::CreateInstanceFailed {
      key: self.service_key(),
      source,
    })?;

    let (actual, instance) = value.canonical(&self.name)?;
    if actual == self.type_info {
      return Ok(instance);
    }
    if !self.type_info.is_interface() {
      return Err(Error::UnexpectedValueType {
        key: self.service_key(),
        actual: actual.name(),
      });
    }
    self
      .type_info
      .cast(&actual, &instance)
      .ok_or_else(|| Error::InterfaceNotImplemented {
        key: self.service_key(),
        actual: actual.name(),
      })
  }
}

impl fmt::Debug for Registration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registration")
      .field("type", &self.type_info.name())
      .field("name", &self.name)
      .field("lifetime", &self.lifetime)
      .field("value", &self.value)
      .field("has_factory", &self.factory.is_some())
      .finish()
  }
}

// --- Registry ---

/// A thread-safe `(type, name) -> registration` map owned by one container.
#[derive(Default)]
pub(crate) struct Registry {
  registrations: DashMap<InjectionKey, Arc<Registration>>,
}

impl Registry {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn get(&self, key: &InjectionKey) -> Option<Arc<Registration>> {
    self.registrations.get(key).map(|entry| Arc::clone(entry.value()))
  }

  /// Adds or replaces the registration for its key.
  pub(crate) fn set(&self, registration: Registration) -> Option<Arc<Registration>> {
    self
      .registrations
      .insert(registration.key(), Arc::new(registration))
  }

  pub(crate) fn get_all(&self) -> Vec<Arc<Registration>> {
    self
      .registrations
      .iter()
      .map(|entry| Arc::clone(entry.value()))
      .collect()
  }

  pub(crate) fn len(&self) -> usize {
    self.registrations.len()
  }

  /// An independent copy: later writes to either registry are invisible to
  /// the other. The registrations themselves are shared.
  pub(crate) fn snapshot(&self) -> Registry {
    Registry {
      registrations: self
        .registrations
        .iter()
        .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
        .collect(),
    }
  }
}

impl fmt::Debug for Registry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registry")
      .field("registrations", &self.len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::Interface;
  use crate::Container;

  trait Speaker: Send + Sync {
    fn speak(&self) -> &'static str;
  }
  struct Dog;
  impl Speaker for Dog {
    fn speak(&self) -> &'static str {
      "woof"
    }
  }
  struct Rock;

  fn resolver() -> DependencyResolver {
    Container::new().resolver()
  }

  #[test]
  fn snapshot_is_independent_of_source() {
    let registry = Registry::new();
    registry.set(Registration::new(TypeInfo::of::<u8>(), "", Lifetime::PerScope));

    let copy = registry.snapshot();
    registry.set(Registration::new(TypeInfo::of::<u16>(), "", Lifetime::PerScope));
    copy.set(Registration::new(TypeInfo::of::<u32>(), "", Lifetime::PerScope));

    assert_eq!(registry.len(), 2);
    assert_eq!(copy.len(), 2);
    assert!(copy.get(&InjectionKey::of::<u16>("")).is_none());
    assert!(registry.get(&InjectionKey::of::<u32>("")).is_none());

    let original = registry.get(&InjectionKey::of::<u8>("")).unwrap();
    let shared = copy.get(&InjectionKey::of::<u8>("")).unwrap();
    assert!(Arc::ptr_eq(&original, &shared));
  }

  #[test]
  fn set_overwrites_same_key() {
    let registry = Registry::new();
    registry.set(Registration::new(TypeInfo::of::<u8>(), "a", Lifetime::PerScope));
    let previous = registry.set(Registration::new(TypeInfo::of::<u8>(), "a", Lifetime::PerRequest));

    assert_eq!(previous.unwrap().lifetime(), Lifetime::PerScope);
    assert_eq!(registry.get_all().len(), 1);
    assert_eq!(
      registry.get(&InjectionKey::of::<u8>("a")).unwrap().lifetime(),
      Lifetime::PerRequest
    );
  }

  #[test]
  fn create_instance_without_factory_fails() {
    let registration = Registration::new(TypeInfo::of::<u8>(), "", Lifetime::PerRequest);
    let err = registration.create_instance(&resolver()).unwrap_err();
    assert!(matches!(err, Error::CreateInstanceNil { .. }));
  }

  #[test]
  fn create_instance_wraps_factory_errors() {
    let registration = Registration::new(TypeInfo::of::<u8>(), "", Lifetime::PerRequest)
      .with_factory(|_| Err("disk on fire".into()));
    let err = registration.create_instance(&resolver()).unwrap_err();
    match err {
      Error::CreateInstanceFailed { source, .. } => assert_eq!(source.to_string(), "disk on fire"),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn create_instance_rejects_nil_and_mismatched_values() {
    let nil = Registration::new(TypeInfo::of::<u8>(), "", Lifetime::PerRequest)
      .with_factory(|_| Ok(Value::from_option::<u8>(None)));
    assert!(matches!(
      nil.create_instance(&resolver()).unwrap_err(),
      Error::NilValue { .. }
    ));

    let wrong = Registration::new(TypeInfo::of::<u8>(), "", Lifetime::PerRequest)
      .with_factory(|_| Ok(Value::new("wrong")));
    assert!(matches!(
      wrong.create_instance(&resolver()).unwrap_err(),
      Error::UnexpectedValueType { actual: "&str", .. }
    ));
  }

  #[test]
  fn create_instance_casts_to_declared_interface() {
    let declared = Interface::<dyn Speaker>::new().implemented_by::<Dog>(|d| d as Arc<dyn Speaker>);
    let registration = Registration::new(declared, "", Lifetime::PerRequest)
      .with_factory(|_| Ok(Value::new(Dog)));

    let instance = registration.create_instance(&resolver()).unwrap();
    let speaker = crate::core::downcast::<dyn Speaker>(&instance).unwrap();
    assert_eq!(speaker.speak(), "woof");
  }

  #[test]
  fn create_instance_rejects_non_implementations() {
    let declared = Interface::<dyn Speaker>::new().implemented_by::<Dog>(|d| d as Arc<dyn Speaker>);
    let registration = Registration::new(declared, "pet", Lifetime::PerRequest)
      .with_factory(|_| Ok(Value::new(Rock)));

    let err = registration.create_instance(&resolver()).unwrap_err();
    assert!(matches!(err, Error::InterfaceNotImplemented { .. }));
    assert_eq!(err.key().unwrap().name(), "pet");
  }

  #[test]
  fn instance_registrations_keep_their_value() {
    let registration = Registration::from_value(TypeInfo::of::<u8>(), "", Value::new(5_u8));
    assert_eq!(registration.lifetime(), Lifetime::PerContainer);
    assert_eq!(*registration.value().unwrap().downcast::<u8>().unwrap(), 5);

    let instance = registration.create_instance(&resolver()).unwrap();
    assert_eq!(*crate::core::downcast::<u8>(&instance).unwrap(), 5);
  }
}
