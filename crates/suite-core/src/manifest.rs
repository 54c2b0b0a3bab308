//! Declarative suite manifest.
//!
//! A manifest names a plugin suite, its metadata and documentation, and an
//! ordered list of plugin descriptors. Validation happens at parse time:
//! descriptor order is meaningful and dependencies may only reference
//! plugins declared earlier in the list.

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Authorship block of a suite manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteMetadata {
    pub author: String,
    pub contact: String,
    pub version: String,
}

/// One plugin entry within a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique name of the plugin within the suite
    pub plugin_name: String,
    /// Names of plugins this one consumes, all declared earlier in the list
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Factory module identifier resolved against the plugin registry
    pub module_name: String,
    /// Source location relative to the suite root
    pub rel_path: String,
}

/// Parsed and validated suite description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteManifest {
    pub suite_name: String,
    pub metadata: SuiteMetadata,
    /// Path to the suite's documentation, relative to the suite root
    pub document: String,
    pub plugins: Vec<PluginDescriptor>,
}

impl SuiteManifest {
    /// Parse a manifest from YAML text and validate it
    pub fn from_yaml_str(text: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_yaml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load and validate a manifest from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_yaml_str(&contents)?;
        debug!(
            "Loaded manifest for suite '{}' ({} plugins)",
            manifest.suite_name,
            manifest.plugins.len()
        );
        Ok(manifest)
    }

    /// Structural checks beyond what deserialization enforces.
    ///
    /// Descriptors are processed in declaration order; a dependency naming
    /// a plugin declared later (or not at all) is rejected.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.suite_name.trim().is_empty() {
            return Err(ManifestError::MissingField("suite_name"));
        }
        if self.document.trim().is_empty() {
            return Err(ManifestError::MissingField("document"));
        }
        if self.plugins.is_empty() {
            return Err(ManifestError::NoPlugins);
        }

        let mut declared: HashSet<&str> = HashSet::new();
        for descriptor in &self.plugins {
            if descriptor.plugin_name.trim().is_empty() {
                return Err(ManifestError::MissingField("plugin_name"));
            }
            if descriptor.module_name.trim().is_empty() {
                return Err(ManifestError::MissingField("module_name"));
            }
            if descriptor.rel_path.trim().is_empty() {
                return Err(ManifestError::MissingField("rel_path"));
            }
            if !declared.insert(descriptor.plugin_name.as_str()) {
                return Err(ManifestError::DuplicatePlugin(
                    descriptor.plugin_name.clone(),
                ));
            }
            for dependency in &descriptor.dependencies {
                if !declared.contains(dependency.as_str()) || dependency == &descriptor.plugin_name
                {
                    return Err(ManifestError::UnknownDependency {
                        plugin: descriptor.plugin_name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// `(plugin_name, dependencies)` pairs in declaration order
    #[must_use]
    pub fn dependency_entries(&self) -> Vec<(String, Vec<String>)> {
        self.plugins
            .iter()
            .map(|d| (d.plugin_name.clone(), d.dependencies.clone()))
            .collect()
    }
}
