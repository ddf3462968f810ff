use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::requirement::{merge_requirements, Requirement};
use crate::version::Version;

pub const PLATFORM_APPLICATION_PACKAGE_ID: &str = "Microsoft.Application.symbols";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDependency {
    #[serde(alias = "appId", alias = "AppId", alias = "Id")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Publisher")]
    pub publisher: String,
    #[serde(alias = "Version")]
    pub version: String,
}

/// The parts of an application's `app.json` that drive symbol resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppManifest {
    #[serde(alias = "appId", alias = "AppId", alias = "Id")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Publisher")]
    pub publisher: String,
    #[serde(default, alias = "Version")]
    pub version: Option<String>,
    #[serde(default, alias = "Application")]
    pub application: Option<String>,
    #[serde(default, alias = "Platform")]
    pub platform: Option<String>,
    #[serde(default, alias = "Runtime")]
    pub runtime: Option<String>,
    #[serde(default, alias = "Dependencies")]
    pub dependencies: Vec<AppDependency>,
}

impl AppManifest {
    pub fn from_json_str(input: &str) -> Result<Self> {
        let input = input.trim_start_matches('\u{feff}');
        let manifest: Self =
            serde_json::from_str(input).context("failed to parse application manifest")?;
        if manifest.id.trim().is_empty() {
            return Err(anyhow!("application manifest id must not be empty"));
        }
        for dependency in &manifest.dependencies {
            if dependency.id.trim().is_empty() {
                return Err(anyhow!(
                    "dependency '{}' from '{}' has an empty id",
                    dependency.name,
                    dependency.publisher
                ));
            }
        }
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed reading application manifest: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("invalid application manifest: {}", path.display()))
    }

    pub fn runtime(&self) -> &str {
        self.runtime.as_deref().unwrap_or("")
    }

    /// Root requirements in processing order: the platform application
    /// package first, then every declared dependency.
    pub fn root_requirements(&self) -> Vec<Requirement> {
        let mut roots = Vec::with_capacity(self.dependencies.len() + 1);
        if let Some(application) = self
            .application
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            roots.push(Requirement::new(
                PLATFORM_APPLICATION_PACKAGE_ID,
                Some(Version::parse(application)),
            ));
        }
        for dependency in &self.dependencies {
            let version = dependency.version.trim();
            let minimum = (!version.is_empty()).then(|| Version::parse(version));
            roots.push(Requirement::new(dependency_package_id(dependency), minimum));
        }
        merge_requirements(roots)
    }
}

pub fn dependency_package_id(dependency: &AppDependency) -> String {
    format!(
        "{}.{}.symbols.{}",
        strip_whitespace(&dependency.publisher),
        strip_whitespace(&dependency.name),
        dependency.id.trim()
    )
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect()
}
