//! Semantic version arithmetic for release tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::classify::ChangeType;
use crate::error::ReleaseError;

/// `major.minor.patch`. Field order gives lexicographic comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// Parses a tag such as `v1.2.3`, `v.1.2.3` or `1.2.3`.
    ///
    /// `None` means no release exists yet and yields `0.0.0`.
    pub fn parse_tag(tag: Option<&str>) -> Result<Self, ReleaseError> {
        match tag {
            Some(tag) => tag.parse(),
            None => Ok(Self::default()),
        }
    }

    /// The tag name for this version, e.g. `v1.3.0`.
    pub fn tag(&self) -> String {
        format!("v{self}")
    }

    /// Bumps the component selected by `bump` and resets every lower component.
    ///
    /// Fails with [`ReleaseError::InvalidVersionFormat`] when the component is
    /// already `u64::MAX`, so a bump never wraps to a lower version.
    pub fn bump(&self, bump: ChangeType) -> Result<Self, ReleaseError> {
        let overflow = || ReleaseError::InvalidVersionFormat(format!("{self} cannot be bumped"));
        let next = match bump {
            ChangeType::Major => Self::new(self.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
            ChangeType::Minor => {
                Self::new(self.major, self.minor.checked_add(1).ok_or_else(overflow)?, 0)
            }
            ChangeType::Patch => {
                Self::new(self.major, self.minor, self.patch.checked_add(1).ok_or_else(overflow)?)
            }
        };
        Ok(next)
    }
}

pub fn next_version(current: Version, bump: ChangeType) -> Result<Version, ReleaseError> {
    current.bump(bump)
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReleaseError::InvalidVersionFormat(s.to_string());

        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("v.")
            .or_else(|| trimmed.strip_prefix('v'))
            .unwrap_or(trimmed);

        let parts = digits
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        match parts.as_slice() {
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
