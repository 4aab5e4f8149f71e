//! Change classification from pull request checklist markers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ClassifierConfig;

/// Which version component a change bumps. Ordered `Patch < Minor < Major`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    #[default]
    Patch,
    Minor,
    Major,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Patch => write!(f, "patch"),
            ChangeType::Minor => write!(f, "minor"),
            ChangeType::Major => write!(f, "major"),
        }
    }
}

/// The checklist markers ticked in one description (or across an aggregate).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMarkers {
    pub bugfix: bool,
    pub feature: bool,
    pub breaking: bool,
}

impl ChangeMarkers {
    pub fn scan(body: &str, config: &ClassifierConfig) -> Self {
        Self {
            bugfix: body.contains(&config.bugfix_marker),
            feature: body.contains(&config.feature_marker),
            breaking: body.contains(&config.breaking_marker),
        }
    }

    /// Highest change type the markers call for; a bugfix alone stays a patch.
    pub fn change_type(&self) -> ChangeType {
        if self.breaking {
            ChangeType::Major
        } else if self.feature {
            ChangeType::Minor
        } else {
            ChangeType::Patch
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            bugfix: self.bugfix || other.bugfix,
            feature: self.feature || other.feature,
            breaking: self.breaking || other.breaking,
        }
    }

    pub fn any(&self) -> bool {
        self.bugfix || self.feature || self.breaking
    }
}

pub fn classify(body: &str, config: &ClassifierConfig) -> ChangeType {
    ChangeMarkers::scan(body, config).change_type()
}
