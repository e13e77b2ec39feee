//! Parsers for ccm replies other than the status listing.

use crate::version::{CassVersion, DseVersion, VersionParseError};

/// Reply to `ccm list`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterList {
    pub clusters: Vec<String>,
    pub active: Option<String>,
}

impl ClusterList {
    /// One cluster per line, the active one marked with `*`.
    pub fn parse(text: &str) -> Self {
        let mut list = ClusterList::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (is_active, name) = match line.strip_prefix('*') {
                Some(name) => (true, name.trim()),
                None => (false, line),
            };
            if name.is_empty() || name.contains(char::is_whitespace) {
                tracing::trace!(line, "skipping cluster list line");
                continue;
            }
            if is_active {
                list.active = Some(name.to_string());
            }
            list.clusters.push(name.to_string());
        }
        list
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clusters.iter().any(|c| c == name)
    }
}

const RELEASE_VERSION: &str = "ReleaseVersion:";

/// Version from `ccm nodeN version`, which prints `ReleaseVersion: X.Y.Z`.
pub fn parse_release_version(text: &str) -> Result<CassVersion, Option<VersionParseError>> {
    let index = text.find(RELEASE_VERSION).ok_or(None)?;
    let value = text[index + RELEASE_VERSION.len()..]
        .lines()
        .next()
        .unwrap_or_default()
        .trim();
    value.parse().map_err(Some)
}

/// Version from `ccm nodeN dse -v`: the first non-empty line.
pub fn parse_dse_version(text: &str) -> Result<DseVersion, Option<VersionParseError>> {
    let value = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(None)?;
    value.parse().map_err(Some)
}

/// What a ccm reply carries, which decides how it is checked for failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Free-form diagnostics from commands that change state.
    Action,
    /// Listings, status and query results. Their lines may hold arbitrary
    /// cluster names or rows, so only the tool's own crash output counts.
    Data,
}

const CRASH_MARKERS: [&str; 2] = ["traceback (most recent call last)", "usage: ccm"];

const ACTION_FAILURE_MARKERS: [&str; 3] = ["[errno", "does not exist", "cannot "];

/// Whether ccm's reply reports that the command failed.
pub fn reports_failure(text: &str, kind: ReplyKind) -> bool {
    text.lines().any(|line| {
        let line = line.trim().to_ascii_lowercase();
        if CRASH_MARKERS.iter().any(|m| line.contains(m)) {
            return true;
        }
        kind == ReplyKind::Action
            && (line.starts_with("error:")
                || ACTION_FAILURE_MARKERS.iter().any(|m| line.contains(m)))
    })
}
