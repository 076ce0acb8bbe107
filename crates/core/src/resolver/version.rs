//! Version parsing and ordering for image tags and pinned versions.

use std::cmp::Ordering;
use std::fmt;

/// A version as found in tags and pipeline files.
///
/// Release versions compare numerically component by component, with
/// missing trailing components treated as zero (`5.5 == 5.5.0`).
/// Anything without a leading numeric release (e.g., `latest`) is
/// `Unversioned` and orders below every release.
#[derive(Debug, Clone)]
pub enum Version {
    Release(Vec<u64>),
    Unversioned(String),
}

impl Version {
    /// Parses the leading `N(.N)*` release of `raw`, ignoring any suffix.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let release_len = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let release = body[..release_len].trim_end_matches('.');

        let components: Option<Vec<u64>> = release
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect();

        match components {
            Some(parts) if !release.is_empty() => Version::Release(parts),
            _ => Version::Unversioned(trimmed.to_string()),
        }
    }

    pub fn is_release(&self) -> bool {
        matches!(self, Version::Release(_))
    }

    fn significant(parts: &[u64]) -> &[u64] {
        let end = parts
            .iter()
            .rposition(|&p| p != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        &parts[..end]
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Version::Release(a), Version::Release(b)) => {
                Self::significant(a).cmp(Self::significant(b))
            }
            (Version::Release(_), Version::Unversioned(_)) => Ordering::Greater,
            (Version::Unversioned(_), Version::Release(_)) => Ordering::Less,
            (Version::Unversioned(a), Version::Unversioned(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Release(parts) => {
                let joined: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                f.write_str(&joined.join("."))
            }
            Version::Unversioned(raw) => f.write_str(raw),
        }
    }
}

/// Turns a winning tag into the version string downstream artifacts use.
///
/// Drops everything from the first `-` (the variant suffix, e.g. `-apache`)
/// and collapses a `.0` patch component: `5.5.0-apache` becomes `5.5`.
pub fn normalize_tag(tag: &str) -> String {
    let base = tag.split('-').next().unwrap_or(tag);

    let parts: Vec<&str> = base.split('.').collect();
    if parts.len() == 3 && parts[2] == "0" && parts[..2].iter().all(|p| !p.is_empty()) {
        return format!("{}.{}", parts[0], parts[1]);
    }

    base.to_string()
}
