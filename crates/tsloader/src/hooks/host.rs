use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// First host release that replaced `getFormat`/`getSource` with a single
/// `load` hook
const SINGLE_PHASE_SINCE: RuntimeVersion = RuntimeVersion {
  major: 16,
  minor: 12,
  patch: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookApi {
  /// `resolve` + `getFormat` + `getSource`
  TwoPhase,
  /// `resolve` + `load`
  SinglePhase,
}

impl HookApi {
  pub fn detect(host: &RuntimeVersion) -> Self {
    if *host >= SINGLE_PHASE_SINCE {
      Self::SinglePhase
    } else {
      Self::TwoPhase
    }
  }
}

impl fmt::Display for HookApi {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TwoPhase => write!(f, "two-phase"),
      Self::SinglePhase => write!(f, "single-phase"),
    }
  }
}

/// Version of the host runtime, as reported by `process.version`
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct RuntimeVersion {
  pub major: u32,
  pub minor: u32,
  pub patch: u32,
}

impl RuntimeVersion {
  pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
    Self {
      major,
      minor,
      patch,
    }
  }
}

impl FromStr for RuntimeVersion {
  type Err = LoaderError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || LoaderError::InvalidRuntimeVersion(s.to_owned());
    let version = s.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    // drop pre-release and build metadata, "21.0.0-nightly2023" -> "21.0.0"
    let version = version
      .split(|c: char| c == '-' || c == '+')
      .next()
      .unwrap_or_default();

    let mut parts = version.split('.');
    let mut next_part = |required: bool| -> Result<u32, LoaderError> {
      match parts.next() {
        Some(p) => p.parse::<u32>().map_err(|_| invalid()),
        None if required => Err(invalid()),
        None => Ok(0),
      }
    };
    let major = next_part(true)?;
    let minor = next_part(false)?;
    let patch = next_part(false)?;
    if parts.next().is_some() {
      return Err(invalid());
    }
    Ok(Self::new(major, minor, patch))
  }
}

impl TryFrom<String> for RuntimeVersion {
  type Error = LoaderError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<RuntimeVersion> for String {
  fn from(version: RuntimeVersion) -> Self {
    version.to_string()
  }
}

impl fmt::Display for RuntimeVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}

#[cfg(test)]
mod tests {
  use super::{HookApi, RuntimeVersion};

  #[test]
  fn test_parse_runtime_version_with_prefix() {
    let version: RuntimeVersion = "v20.11.1".parse().unwrap();
    assert_eq!(version, RuntimeVersion::new(20, 11, 1));
    assert_eq!(version.to_string(), "20.11.1");
  }

  #[test]
  fn test_parse_runtime_version_with_prerelease() {
    let version: RuntimeVersion = "21.0.0-nightly20230801".parse().unwrap();
    assert_eq!(version, RuntimeVersion::new(21, 0, 0));
  }

  #[test]
  fn test_parse_runtime_version_partial() {
    let version: RuntimeVersion = "18".parse().unwrap();
    assert_eq!(version, RuntimeVersion::new(18, 0, 0));
  }

  #[test]
  fn test_parse_invalid_runtime_version() {
    assert!("".parse::<RuntimeVersion>().is_err());
    assert!("v1.x.0".parse::<RuntimeVersion>().is_err());
    assert!("1.2.3.4".parse::<RuntimeVersion>().is_err());
  }

  #[test]
  fn test_detect_hook_api() {
    assert_eq!(
      HookApi::detect(&RuntimeVersion::new(14, 18, 0)),
      HookApi::TwoPhase
    );
    assert_eq!(
      HookApi::detect(&RuntimeVersion::new(16, 11, 1)),
      HookApi::TwoPhase
    );
    assert_eq!(
      HookApi::detect(&RuntimeVersion::new(16, 12, 0)),
      HookApi::SinglePhase
    );
    assert_eq!(
      HookApi::detect(&RuntimeVersion::new(20, 0, 0)),
      HookApi::SinglePhase
    );
  }
}
