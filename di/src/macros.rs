//! Public macros for ergonomic service resolution.

/// Resolves a service from a container or resolver.
///
/// The first argument is anything implementing [`Resolver`](crate::Resolver)
/// (a [`Container`](crate::Container), a [`DependencyResolver`](crate::DependencyResolver)
/// inside a factory, or a [`Values`](crate::Values) store).
///
/// # Panics
///
/// This macro will panic if the service cannot be resolved. For a
/// non-panicking version, use [`maybe_resolve!`] or
/// [`Resolver::resolve`](crate::Resolver::resolve) directly.
///
/// # Examples
///
/// ```
/// use fibre_di::{resolve, Container, Lifetime};
///
/// let container = Container::new();
/// container.register(Lifetime::PerContainer, |_| Ok(String::from("hello")));
///
/// let message = resolve!(container, String);
/// assert_eq!(*message, "hello");
/// ```
///
/// ```
/// use fibre_di::{resolve, Container, Lifetime};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn greet(&self) -> String; }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter { fn greet(&self) -> String { "Hello!".to_string() } }
///
/// let container = Container::new();
/// container.register_trait::<dyn Greeter, _>(Lifetime::PerScope, |_| Ok(Arc::new(EnglishGreeter)));
///
/// let greeter = resolve!(container, trait Greeter);
/// assert_eq!(greeter.greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve {
  ($resolver:expr, trait $trait_ident:ident) => {{
    use $crate::Resolver as _;
    ($resolver).resolve_named::<dyn $trait_ident>("").unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required trait service {}: {}",
        std::any::type_name::<dyn $trait_ident>(),
        err
      )
    })
  }};

  ($resolver:expr, trait $trait_ident:ident, $name:expr) => {{
    use $crate::Resolver as _;
    ($resolver).resolve_named::<dyn $trait_ident>($name).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required trait service with name '{}': {}: {}",
        $name,
        std::any::type_name::<dyn $trait_ident>(),
        err
      )
    })
  }};

  ($resolver:expr, $type:ty) => {{
    use $crate::Resolver as _;
    ($resolver).resolve_named::<$type>("").unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service {}: {}",
        std::any::type_name::<$type>(),
        err
      )
    })
  }};

  ($resolver:expr, $type:ty, $name:expr) => {{
    use $crate::Resolver as _;
    ($resolver).resolve_named::<$type>($name).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service with name '{}': {}: {}",
        $name,
        std::any::type_name::<$type>(),
        err
      )
    })
  }};
}

/// Like [`resolve!`], but yields an `Option` instead of panicking.
///
/// ```
/// use fibre_di::{maybe_resolve, Container};
///
/// let container = Container::new();
/// assert!(maybe_resolve!(container, u64).is_none());
/// ```
#[macro_export]
macro_rules! maybe_resolve {
  ($resolver:expr, trait $trait_ident:ident) => {{
    use $crate::Resolver as _;
    ($resolver).resolve_named::<dyn $trait_ident>("").ok()
  }};

  ($resolver:expr, trait $trait_ident:ident, $name:expr) => {{
    use $crate::Resolver as _;
    ($resolver).resolve_named::<dyn $trait_ident>($name).ok()
  }};

  ($resolver:expr, $type:ty) => {{
    use $crate::Resolver as _;
    ($resolver).resolve_named::<$type>("").ok()
  }};

  ($resolver:expr, $type:ty, $name:expr) => {{
    use $crate::Resolver as _;
    ($resolver).resolve_named::<$type>($name).ok()
  }};
}
