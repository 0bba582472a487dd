//! Type identity, erased values and resolution targets shared by every store.

use crate::error::{Error, Result};

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// A realized service as held by value stores and instance caches.
///
/// The erased payload is always an `Arc<T>` for the service type `T`. Wrapping
/// the `Arc` (rather than `T` itself) lets unsized trait-object services share
/// storage with concrete ones.
pub type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) fn wrap<T: ?Sized + Any + Send + Sync>(value: Arc<T>) -> Instance {
  Arc::new(value)
}

pub(crate) fn downcast<T: ?Sized + Any + Send + Sync>(instance: &Instance) -> Option<Arc<T>> {
  instance.downcast_ref::<Arc<T>>().cloned()
}

type CastFn = dyn Fn(&Instance) -> Option<Instance> + Send + Sync;

// --- TypeInfo ---

/// The identity of a service type.
///
/// Two `TypeInfo`s compare equal when they describe the same Rust type. A
/// `TypeInfo` built from an [`Interface`] additionally knows which concrete
/// types may stand in for the trait object it describes.
#[derive(Clone)]
pub struct TypeInfo {
  id: TypeId,
  name: &'static str,
  casts: Option<Arc<HashMap<TypeId, Arc<CastFn>>>>,
}

impl TypeInfo {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: type_name::<T>(),
      casts: None,
    }
  }

  pub fn id(&self) -> TypeId {
    self.id
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Returns `true` if this type was declared through an [`Interface`].
  pub fn is_interface(&self) -> bool {
    self.casts.is_some()
  }

  /// Converts `instance`, whose concrete type is `concrete`, into an instance
  /// of this interface type. `None` if `concrete` doesn't implement it.
  pub(crate) fn cast(&self, concrete: &TypeInfo, instance: &Instance) -> Option<Instance> {
    let cast = self.casts.as_ref()?.get(&concrete.id)?;
    cast(instance)
  }
}

impl PartialEq for TypeInfo {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for TypeInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeInfo")
      .field("name", &self.name)
      .field("interface", &self.is_interface())
      .finish()
  }
}

impl fmt::Display for TypeInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

// --- Interface ---

/// Declares a trait-object service type together with the concrete types known
/// to implement it.
///
/// Rust cannot ask at runtime whether an arbitrary value implements a trait, so
/// each implementation is listed with the (usually trivial) coercion into the
/// trait object.
///
/// ```
/// use fibre_di::{Interface, TypeInfo};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {}
/// struct English;
/// impl Greeter for English {}
///
/// let info: TypeInfo = Interface::<dyn Greeter>::new()
///   .implemented_by::<English>(|e| e as Arc<dyn Greeter>)
///   .into();
/// assert!(info.is_interface());
/// ```
pub struct Interface<I: ?Sized + Any + Send + Sync> {
  casts: HashMap<TypeId, Arc<CastFn>>,
  _marker: PhantomData<fn() -> Arc<I>>,
}

impl<I: ?Sized + Any + Send + Sync> Interface<I> {
  pub fn new() -> Self {
    Self {
      casts: HashMap::new(),
      _marker: PhantomData,
    }
  }

  /// Records that `C` implements `I`.
  pub fn implemented_by<C: Any + Send + Sync>(mut self, cast: fn(Arc<C>) -> Arc<I>) -> Self {
    let cast_fn = move |instance: &Instance| downcast::<C>(instance).map(|concrete| wrap(cast(concrete)));
    self.casts.insert(TypeId::of::<C>(), Arc::new(cast_fn));
    self
  }
}

impl<I: ?Sized + Any + Send + Sync> Default for Interface<I> {
  fn default() -> Self {
    Self::new()
  }
}

impl<I: ?Sized + Any + Send + Sync> From<Interface<I>> for TypeInfo {
  fn from(interface: Interface<I>) -> Self {
    Self {
      casts: Some(Arc::new(interface.casts)),
      ..TypeInfo::of::<I>()
    }
  }
}

// --- Keys ---

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct InjectionKey {
  pub(crate) type_info: TypeInfo,
  pub(crate) name: String,
}

impl InjectionKey {
  pub(crate) fn new(type_info: TypeInfo, name: &str) -> Self {
    Self {
      type_info,
      name: name.to_owned(),
    }
  }

  pub(crate) fn of<T: ?Sized + Any>(name: &str) -> Self {
    Self::new(TypeInfo::of::<T>(), name)
  }

  pub(crate) fn service_key(&self) -> ServiceKey {
    ServiceKey::new(self.type_info.name, &self.name)
  }
}

impl fmt::Debug for InjectionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.name.is_empty() {
      write!(f, "Key({})", self.type_info.name)
    } else {
      write!(f, "Key({}, Name({}))", self.type_info.name, self.name)
    }
  }
}

/// A printable `(type, name)` pair identifying a service, carried by errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceKey {
  type_name: &'static str,
  name: String,
}

impl ServiceKey {
  pub fn new(type_name: &'static str, name: &str) -> Self {
    Self {
      type_name,
      name: name.to_owned(),
    }
  }

  pub fn of<T: ?Sized + Any>(name: &str) -> Self {
    Self::new(type_name::<T>(), name)
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// The binding name; empty for the unnamed binding.
  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.name.is_empty() {
      write!(f, "instance of type \"{}\"", self.type_name)
    } else {
      write!(f, "named instance \"{}\" of type \"{}\"", self.name, self.type_name)
    }
  }
}

// --- Value ---

/// A type-erased value as produced by factories or handed to the stores.
///
/// A `Value` may be nil, either without any type information
/// ([`Value::nil`]) or with a known type but no payload
/// ([`Value::from_option`] with `None`). Nil values are rejected wherever a
/// value would be stored.
#[derive(Clone, Default)]
pub struct Value {
  type_info: Option<TypeInfo>,
  instance: Option<Instance>,
}

impl Value {
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self::from_arc(Arc::new(value))
  }

  /// Wraps an already shared value. `T` may be a trait object.
  pub fn from_arc<T: ?Sized + Any + Send + Sync>(value: Arc<T>) -> Self {
    Self {
      type_info: Some(TypeInfo::of::<T>()),
      instance: Some(wrap(value)),
    }
  }

  pub fn from_option<T: Any + Send + Sync>(value: Option<T>) -> Self {
    match value {
      Some(value) => Self::new(value),
      None => Self {
        type_info: Some(TypeInfo::of::<T>()),
        instance: None,
      },
    }
  }

  /// A value carrying neither a type nor a payload.
  pub fn nil() -> Self {
    Self::default()
  }

  pub fn type_info(&self) -> Option<&TypeInfo> {
    self.type_info.as_ref()
  }

  pub fn is_nil(&self) -> bool {
    self.instance.is_none()
  }

  /// Returns the shared payload if this value holds a `T`.
  pub fn downcast<T: ?Sized + Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.instance.as_ref().and_then(downcast::<T>)
  }

  /// Splits the value into its canonical type and stored instance.
  pub(crate) fn canonical(&self, name: &str) -> Result<(TypeInfo, Instance)> {
    let type_info = self.type_info.clone().ok_or_else(|| Error::NilType {
      name: name.to_owned(),
    })?;
    match &self.instance {
      Some(instance) => Ok((type_info, Arc::clone(instance))),
      None => Err(Error::NilValue {
        key: ServiceKey::new(type_info.name, name),
      }),
    }
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (&self.type_info, &self.instance) {
      (None, _) => f.write_str("Value(nil)"),
      (Some(ty), None) => write!(f, "Value({}: nil)", ty.name),
      (Some(ty), Some(_)) => write!(f, "Value({})", ty.name),
    }
  }
}

// --- Target ---

/// A settable slot that receives a resolved instance.
///
/// This is the in/out form of resolution: the slot's declared type selects
/// the service and a successful resolve fills it. It is implemented for
/// `Option<Arc<T>>`, so heterogeneous slots can be resolved in one call
/// through `&mut dyn Target`.
pub trait Target {
  /// The service type this slot accepts.
  fn type_info(&self) -> TypeInfo;

  /// Stores `instance` into the slot.
  fn assign(&mut self, instance: &Instance, name: &str) -> Result<()>;
}

impl<T: ?Sized + Any + Send + Sync> Target for Option<Arc<T>> {
  fn type_info(&self) -> TypeInfo {
    TypeInfo::of::<T>()
  }

  fn assign(&mut self, instance: &Instance, name: &str) -> Result<()> {
    let value = downcast::<T>(instance).ok_or_else(|| Error::UnexpectedValueType {
      key: ServiceKey::of::<T>(name),
      actual: "an instance of another type",
    })?;
    *self = Some(value);
    Ok(())
  }
}
