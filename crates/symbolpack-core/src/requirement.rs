use serde::{Deserialize, Serialize};

use crate::version::Version;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub package_id: String,
    pub minimum: Option<Version>,
}

impl Requirement {
    pub fn new(package_id: impl Into<String>, minimum: Option<Version>) -> Self {
        Self {
            package_id: package_id.into(),
            minimum,
        }
    }

    pub fn at_least(package_id: impl Into<String>, minimum: &str) -> Self {
        Self::new(package_id, Some(Version::parse(minimum)))
    }

    /// Raises the minimum to `candidate` when it is higher. Returns whether the
    /// minimum changed; a lower or absent candidate never lowers it.
    pub fn raise(&mut self, candidate: Option<&Version>) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        match &self.minimum {
            Some(current) if current >= candidate => false,
            _ => {
                self.minimum = Some(candidate.clone());
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    pub package_id: String,
    pub version: Version,
    pub max_available_version: Option<Version>,
    #[serde(default)]
    pub dependencies: Vec<Requirement>,
}

/// Collapses requirements sharing a package id (compared case-insensitively)
/// into one entry carrying the highest minimum. The first occurrence keeps
/// its position.
pub fn merge_requirements(requirements: Vec<Requirement>) -> Vec<Requirement> {
    let mut merged: Vec<Requirement> = Vec::with_capacity(requirements.len());
    for requirement in requirements {
        match merged
            .iter_mut()
            .find(|existing| existing.package_id.eq_ignore_ascii_case(&requirement.package_id))
        {
            Some(existing) => {
                existing.raise(requirement.minimum.as_ref());
            }
            None => merged.push(requirement),
        }
    }
    merged
}
