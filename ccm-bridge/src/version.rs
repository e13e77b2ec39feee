//! Structured engine versions.
//!
//! Versions keep the number of components they were written with, so `3.4`
//! is handed back to ccm as `3.4` and not `3.4.0`, but they compare
//! numerically with a missing patch treated as zero.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version {input:?}: {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: &'static str,
}

/// A Cassandra version, `major.minor[.patch][-extra]`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CassVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    pub extra: Option<String>,
}

impl CassVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch: Some(patch),
            extra: None,
        }
    }

    pub fn patch_or_zero(&self) -> u32 {
        self.patch.unwrap_or(0)
    }

    fn numeric(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch_or_zero())
    }
}

impl FromStr for CassVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| VersionParseError {
            input: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let (numbers, extra) = match trimmed.split_once('-') {
            Some((numbers, extra)) if !extra.is_empty() => (numbers, Some(extra.to_string())),
            Some(_) => return Err(err("empty pre-release suffix")),
            None => (trimmed, None),
        };

        let mut parts = numbers.split('.');
        let mut next = |required: bool| -> Result<Option<u32>, VersionParseError> {
            match parts.next() {
                Some(p) => p
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| err("components must be numbers")),
                None if required => Err(err("expected at least major.minor")),
                None => Ok(None),
            }
        };

        let major = next(true)?.unwrap_or_default();
        let minor = next(true)?.unwrap_or_default();
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(err("too many components"));
        }

        Ok(Self {
            major,
            minor,
            patch,
            extra,
        })
    }
}

impl TryFrom<String> for CassVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CassVersion> for String {
    fn from(v: CassVersion) -> Self {
        v.to_string()
    }
}

impl fmt::Display for CassVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        if let Some(extra) = &self.extra {
            write!(f, "-{extra}")?;
        }
        Ok(())
    }
}

impl PartialEq for CassVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CassVersion {}

impl PartialOrd for CassVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CassVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // a pre-release sorts before its release
        self.numeric()
            .cmp(&other.numeric())
            .then_with(|| match (&self.extra, &other.extra) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

/// A DataStax Enterprise version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DseVersion(pub CassVersion);

impl DseVersion {
    /// The Cassandra release bundled with this DSE release.
    pub fn cassandra_version(&self) -> CassVersion {
        match (self.0.major, self.0.minor) {
            (major, _) if major < 4 => CassVersion::new(1, 2, 0),
            (4, minor) if minor < 7 => CassVersion::new(2, 0, 0),
            (4, _) => CassVersion::new(2, 1, 0),
            (5, 0) => CassVersion::new(3, 0, 0),
            (5, _) => CassVersion::new(3, 11, 0),
            _ => CassVersion::new(4, 0, 0),
        }
    }
}

impl FromStr for DseVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(DseVersion)
    }
}

impl TryFrom<String> for DseVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DseVersion> for String {
    fn from(v: DseVersion) -> Self {
        v.to_string()
    }
}

impl fmt::Display for DseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
