//! Target platforms
//!
//! A platform is a named environment the suite is executed against. Results
//! are tracked per platform and aggregated across them.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// A target platform tag
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Platform of the running host, e.g. `linux-x86_64`
    pub fn host() -> Self {
        Self(format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Parse a comma separated platform list, skipping blanks
    pub fn parse_list(s: &str) -> Vec<Platform> {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Platform::new)
            .collect()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Platform {
    fn from(s: &str) -> Self {
        Platform::new(s)
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        Platform(s)
    }
}
