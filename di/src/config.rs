//! Container configuration.

/// How many times one resolve call may enter the same `(type, name)` before
/// failing with `InfiniteRecursion`.
pub const DEFAULT_RECURSION_LIMIT: usize = 30;

/// Settings fixed when a root container is built and inherited by its scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ContainerConfig {
  /// Maximum entries into one key per resolve call.
  ///
  /// Cached lifetimes are satisfied from cache after their first
  /// materialization, so a limit of 1 already catches their self-recursion.
  /// `PerRequest` services are never cached and need the full limit to detect
  /// a cycle. Values below 1 behave like 1.
  pub recursion_limit: usize,
}

impl ContainerConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_recursion_limit(mut self, limit: usize) -> Self {
    self.recursion_limit = limit;
    self
  }
}

impl Default for ContainerConfig {
  fn default() -> Self {
    Self {
      recursion_limit: DEFAULT_RECURSION_LIMIT,
    }
  }
}
