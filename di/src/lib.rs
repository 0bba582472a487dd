//! # Fibre DI
//!
//! A thread-safe, scoped dependency-resolution container for Rust.
//!
//! Services are registered by type (and optionally by name) together with a
//! factory and a [`Lifetime`], then resolved on demand. Containers form a
//! tree: [`Container::scope`] derives a child that inherits its parent's
//! registrations and ambient values and may override either locally.
//!
//! ## Core Concepts
//!
//! - **Container**: holds registrations, ambient values and cached instances.
//! - **Scope**: a child container. Writes to a scope never reach its parent.
//! - **Lifetime**: `PerContainer` (one instance for the whole tree),
//!   `PerScope` (one instance per scope) or `PerRequest` (a new instance on
//!   every resolve).
//! - **Resolver**: factories receive a [`DependencyResolver`] to resolve their
//!   own dependencies. Re-entering the same service too often within one
//!   resolve call fails with [`Error::InfiniteRecursion`] instead of
//!   overflowing the stack.
//! - **Traits**: services can be registered and resolved as trait objects.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_di::{resolve, Container, Lifetime, Resolver};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! struct EnglishGreeter {
//!   message: String,
//! }
//!
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     self.message.clone()
//!   }
//! }
//!
//! let container = Container::new();
//! container.register_instance_with_name("greeting_message", String::from("Hello, World!"));
//!
//! // The factory resolves its own dependency through the resolver it is given.
//! container.register_trait::<dyn Greeter, _>(Lifetime::PerScope, |r| {
//!   let message = r.resolve_named::<String>("greeting_message")?;
//!   Ok(Arc::new(EnglishGreeter {
//!     message: (*message).clone(),
//!   }))
//! });
//!
//! let request = container.scope();
//! let greeter = resolve!(request, trait Greeter);
//! assert_eq!(greeter.greet(), "Hello, World!");
//! ```

mod config;
mod container;
mod core;
mod error;
mod lifetime;
mod macros;
mod registry;
mod resolver;
mod values;

pub use config::{ContainerConfig, DEFAULT_RECURSION_LIMIT};
pub use container::{Container, ContainerRef};
pub use crate::core::{Instance, Interface, ServiceKey, Target, TypeInfo, Value};
pub use error::{BoxError, Error, Result};
pub use lifetime::Lifetime;
pub use registry::{FactoryFn, Registration};
pub use resolver::{resolve_all, resolve_all_named, DependencyResolver, Resolver};
pub use values::Values;
