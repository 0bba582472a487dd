use crate::error::Error;

use std::fmt;
use std::str::FromStr;

/// Governs how often a registered factory runs and where its output is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Lifetime {
  /// Created once for the whole container tree and cached on the root.
  ///
  /// The factory always runs against the root container, so its own
  /// dependencies never see scope-local values.
  PerContainer,
  /// Created once per scope and cached on that scope.
  PerScope,
  /// Created on every resolve; never cached.
  PerRequest,
}

impl Lifetime {
  /// Whether realized instances are cached.
  pub fn is_cached(self) -> bool {
    !matches!(self, Lifetime::PerRequest)
  }
}

impl fmt::Display for Lifetime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Lifetime::PerContainer => f.write_str("Per Container Lifetime"),
      Lifetime::PerScope => f.write_str("Per Scope Lifetime"),
      Lifetime::PerRequest => f.write_str("Per Request Lifetime"),
    }
  }
}

/// Accepts `per_container`, `PerContainer`, `per-container` and the display
/// form, case-insensitively.
impl FromStr for Lifetime {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized: String = s
      .chars()
      .filter(|c| !matches!(c, '_' | '-' | ' '))
      .flat_map(char::to_lowercase)
      .collect();
    match normalized.trim_end_matches("lifetime") {
      "percontainer" => Ok(Lifetime::PerContainer),
      "perscope" => Ok(Lifetime::PerScope),
      "perrequest" => Ok(Lifetime::PerRequest),
      _ => Err(Error::UnsupportedLifetime {
        lifetime: s.to_owned(),
      }),
    }
  }
}

impl TryFrom<u8> for Lifetime {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Lifetime::PerContainer),
      1 => Ok(Lifetime::PerScope),
      2 => Ok(Lifetime::PerRequest),
      other => Err(Error::UnsupportedLifetime {
        lifetime: other.to_string(),
      }),
    }
  }
}
