use crate::core::ServiceKey;

use thiserror::Error;

/// The error type user factories may return; any `std::error::Error` converts into it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for `fibre_di` operations.
#[derive(Debug, Error)]
pub enum Error {
  /// A value carried no type information at all.
  #[error("value type is nil (name: {name:?})")]
  NilType { name: String },

  /// A value to be stored was nil.
  #[error("{key} is nil")]
  NilValue { key: ServiceKey },

  /// An ambient value lookup missed both the local store and every ancestor.
  #[error("{key} not found")]
  InstanceNotFound { key: ServiceKey },

  /// Nothing is registered for the key and no ambient value is bound.
  #[error("{key} can't be resolved")]
  UnresolvedDependency { key: ServiceKey },

  /// A lifetime outside of `PerContainer`, `PerScope` and `PerRequest`.
  #[error("unsupported lifetime \"{lifetime}\"")]
  UnsupportedLifetime { lifetime: String },

  /// The registration has no factory attached.
  #[error("no factory attached; unable to create {key}")]
  CreateInstanceNil { key: ServiceKey },

  /// The factory returned an error.
  #[error("unable to create {key}: {source}")]
  CreateInstanceFailed {
    key: ServiceKey,
    #[source]
    source: BoxError,
  },

  /// The factory produced a value of another concrete type.
  #[error("expected {key}, but got \"{actual}\"")]
  UnexpectedValueType {
    key: ServiceKey,
    actual: &'static str,
  },

  /// The factory produced a value that doesn't implement the declared interface.
  #[error("expected {key}, but \"{actual}\" doesn't implement it")]
  InterfaceNotImplemented {
    key: ServiceKey,
    actual: &'static str,
  },

  /// The same key was re-entered too many times within one resolve call.
  #[error("infinite recursion detected after {limit} attempts; {key} can't be resolved")]
  InfiniteRecursion { key: ServiceKey, limit: usize },

  /// A non-owning handle outlived the container it points to.
  #[error("container was dropped; {key} can't be resolved")]
  ContainerDropped { key: ServiceKey },
}

impl Error {
  /// The service the error is about, if it names one.
  pub fn key(&self) -> Option<&ServiceKey> {
    match self {
      Error::NilType { .. } | Error::UnsupportedLifetime { .. } => None,
      Error::NilValue { key }
      | Error::InstanceNotFound { key }
      | Error::UnresolvedDependency { key }
      | Error::CreateInstanceNil { key }
      | Error::CreateInstanceFailed { key, .. }
      | Error::UnexpectedValueType { key, .. }
      | Error::InterfaceNotImplemented { key, .. }
      | Error::InfiniteRecursion { key, .. }
      | Error::ContainerDropped { key } => Some(key),
    }
  }

  /// Follows `CreateInstanceFailed` wrappers down to the error that started
  /// the failure, as long as that cause is itself a container error.
  ///
  /// A factory that fails because a nested resolve failed yields one wrapper
  /// per factory on the way down.
  pub fn innermost(&self) -> &Error {
    let mut current = self;
    while let Error::CreateInstanceFailed { source, .. } = current {
      match source.downcast_ref::<Error>() {
        Some(inner) => current = inner,
        None => break,
      }
    }
    current
  }
}

/// A specialized `Result` type for `fibre_di` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
