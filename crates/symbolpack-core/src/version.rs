use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

const COMPONENT_COUNT: usize = 4;

/// A package version as published on a feed.
///
/// Versions made of up to four dot-separated non-negative integers are
/// compared numerically, component by component, with missing trailing
/// components treated as zero. Anything else falls back to an ordinal,
/// case-insensitive comparison of the raw strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version {
    raw: String,
    components: Option<[u64; COMPONENT_COUNT]>,
}

impl Version {
    pub fn parse(input: &str) -> Self {
        let raw = input.trim().to_string();
        let components = parse_components(&raw);
        Self { raw, components }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> Option<[u64; COMPONENT_COUNT]> {
        self.components
    }

    pub fn is_numeric(&self) -> bool {
        self.components.is_some()
    }
}

fn parse_components(raw: &str) -> Option<[u64; COMPONENT_COUNT]> {
    let mut components = [0_u64; COMPONENT_COUNT];
    for (index, segment) in raw.split('.').take(COMPONENT_COUNT).enumerate() {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        components[index] = segment.parse().ok()?;
    }
    Some(components)
}

fn compare_ignore_case(left: &str, right: &str) -> Ordering {
    left.chars()
        .map(|ch| ch.to_ascii_uppercase())
        .cmp(right.chars().map(|ch| ch.to_ascii_uppercase()))
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.components, other.components) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => compare_ignore_case(&self.raw, &other.raw),
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
        f.write_str(&self.raw)
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.raw
    }
}

pub fn compare(left: &str, right: &str) -> Ordering {
    Version::parse(left).cmp(&Version::parse(right))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSelection {
    pub version: Version,
    pub max_available: Version,
    /// Set when no available version reaches the requested minimum and the
    /// highest available one was picked instead.
    pub shortfall: bool,
}

/// Highest version of a list, or `None` when it is empty.
///
/// Mixed lists of numeric and opaque versions do not form a total order
/// under the pairwise rule, so candidates are visited in a fixed textual
/// order first. The result does not depend on the order of the input.
pub fn highest_version<'a, I>(versions: I) -> Option<&'a Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    let mut candidates: Vec<&Version> = versions.into_iter().collect();
    candidates.sort_by_cached_key(|version| {
        (version.raw.to_ascii_uppercase(), version.raw.clone())
    });
    candidates
        .into_iter()
        .reduce(|best, candidate| if candidate > best { candidate } else { best })
}

/// Picks a candidate from a feed's version list: the highest version at or
/// above `minimum` wins. When nothing satisfies the minimum the highest
/// version is returned with `shortfall` set. Returns `None` only for an
/// empty list.
pub fn select_version(
    available: &[Version],
    minimum: Option<&Version>,
) -> Option<VersionSelection> {
    let max_available = highest_version(available)?.clone();

    let Some(minimum) = minimum else {
        return Some(VersionSelection {
            version: max_available.clone(),
            max_available,
            shortfall: false,
        });
    };

    match highest_version(available.iter().filter(|candidate| *candidate >= minimum)) {
        Some(candidate) => Some(VersionSelection {
            version: candidate.clone(),
            max_available,
            shortfall: false,
        }),
        None => Some(VersionSelection {
            version: max_available.clone(),
            max_available,
            shortfall: true,
        }),
    }
}
