//! Dotted version numbers such as `5.4` or `5.10.1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// A dotted version. Missing trailing components compare as zero, so `5.4`
/// equals `5.4.0`.
#[derive(Debug, Clone, Eq)]
pub struct Version(Vec<u32>);

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Self(vec![major, minor])
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    fn component(&self, index: usize) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl FromStr for Version {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidVersion(s.to_string()));
        }
        trimmed
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map(Version)
            .map_err(|_| ConfigError::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct VersionVisitor;

impl serde::de::Visitor<'_> for VersionVisitor {
    type Value = Version;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a dotted version such as \"5.4\"")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Version, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Version, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Version, E> {
        self.visit_str(&v.to_string())
    }

    // Environment variables like `5.4` arrive as floats.
    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Version, E> {
        self.visit_str(&v.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(VersionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_components_compare_as_zero() {
        let a: Version = "5.4".parse().unwrap();
        let b: Version = "5.4.0".parse().unwrap();
        assert_eq!(a, b);
        assert!(a < "5.10".parse().unwrap());
        assert!(Version::new(5, 0) <= "5.0".parse().unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!("five".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
        assert!("5..1".parse::<Version>().is_err());
    }
}
