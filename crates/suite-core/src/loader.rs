//! Suite loading: manifest resolution, source installation, plugin
//! instantiation.
//!
//! A suite source is a directory containing `manifest.yaml`, a manifest
//! file directly, or a `.zip` archive of either. Archives are staged under
//! the workspace's `downloads/` directory before extraction; suite sources
//! are installed under `suites/<suite_name>/` exactly once (first writer
//! wins). A load failure registers nothing.

use crate::error::SuiteError;
use crate::manifest::SuiteManifest;
use crate::plugin::PluginRegistry;
use crate::suite::{LoadedPlugin, PluginSuite};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Name of the manifest file expected at the root of a suite source tree
pub const MANIFEST_FILE: &str = "manifest.yaml";

/// Managed directory layout for installed suites and fetched archives
#[derive(Debug, Clone)]
pub struct SuiteWorkspace {
    root: PathBuf,
    suites_dir: PathBuf,
    downloads_dir: PathBuf,
}

impl SuiteWorkspace {
    /// Create (or reuse) the workspace layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SuiteError> {
        let root = root.into();
        let suites_dir = root.join("suites");
        let downloads_dir = root.join("downloads");
        fs::create_dir_all(&suites_dir)?;
        fs::create_dir_all(&downloads_dir)?;
        debug!("Suite workspace ready at {}", root.display());
        Ok(Self {
            root,
            suites_dir,
            downloads_dir,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn suites_dir(&self) -> &Path {
        &self.suites_dir
    }

    #[must_use]
    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Installation directory for a suite of the given name
    #[must_use]
    pub fn suite_dir(&self, suite_name: &str) -> PathBuf {
        self.suites_dir.join(suite_name)
    }
}

/// Loads plugin suites from manifest sources against a factory registry
pub struct SuiteLoader<'a> {
    workspace: &'a SuiteWorkspace,
    registry: &'a PluginRegistry,
    workers: usize,
}

impl<'a> SuiteLoader<'a> {
    #[must_use]
    pub fn new(workspace: &'a SuiteWorkspace, registry: &'a PluginRegistry) -> Self {
        Self {
            workspace,
            registry,
            workers: num_cpus::get(),
        }
    }

    /// Worker count handed to suites built by this loader
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Resolve, install, and load a suite from `source`.
    ///
    /// `source` may be a suite directory, a manifest file, or a `.zip`
    /// archive. On success the returned suite is ready to run.
    pub fn load(&self, source: &Path) -> Result<PluginSuite, SuiteError> {
        let (manifest, tree) = self.resolve_source(source)?;
        self.load_resolved(manifest, &tree)
    }

    fn resolve_source(&self, source: &Path) -> Result<(SuiteManifest, PathBuf), SuiteError> {
        if source.is_dir() {
            let manifest = SuiteManifest::from_yaml(source.join(MANIFEST_FILE))?;
            Ok((manifest, source.to_path_buf()))
        } else if source.extension().and_then(OsStr::to_str) == Some("zip") {
            let tree = self.stage_archive(source)?;
            let manifest = SuiteManifest::from_yaml(tree.join(MANIFEST_FILE))?;
            Ok((manifest, tree))
        } else if source.is_file() {
            let manifest = SuiteManifest::from_yaml(source)?;
            let tree = source
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| SuiteError::InvalidSource(source.to_path_buf()))?;
            Ok((manifest, tree))
        } else {
            Err(SuiteError::InvalidSource(source.to_path_buf()))
        }
    }

    /// Copy the archive into `downloads/` and extract it next to the copy.
    /// Returns the directory holding the suite's manifest.
    fn stage_archive(&self, archive: &Path) -> Result<PathBuf, SuiteError> {
        let file_name = archive
            .file_name()
            .ok_or_else(|| SuiteError::InvalidSource(archive.to_path_buf()))?;
        let staged = self.workspace.downloads_dir().join(file_name);
        if staged != archive {
            fs::copy(archive, &staged)?;
        }

        let stem = archive
            .file_stem()
            .and_then(OsStr::to_str)
            .ok_or_else(|| SuiteError::InvalidSource(archive.to_path_buf()))?;
        let extract_dir = self.workspace.downloads_dir().join(stem);
        if extract_dir.exists() {
            fs::remove_dir_all(&extract_dir)?;
        }
        fs::create_dir_all(&extract_dir)?;

        let mut zip = ZipArchive::new(File::open(&staged)?)?;
        zip.extract(&extract_dir)?;
        debug!(
            "Extracted suite archive {} into {}",
            staged.display(),
            extract_dir.display()
        );

        if extract_dir.join(MANIFEST_FILE).is_file() {
            return Ok(extract_dir);
        }
        // Single wrapping directory inside the archive is also accepted.
        for entry in fs::read_dir(&extract_dir)? {
            let path = entry?.path();
            if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
                return Ok(path);
            }
        }
        Err(SuiteError::InvalidSource(archive.to_path_buf()))
    }

    fn install(&self, manifest: &SuiteManifest, tree: &Path) -> Result<PathBuf, SuiteError> {
        let suite_root = self.workspace.suite_dir(&manifest.suite_name);
        if suite_root.exists() {
            debug!(
                "Suite '{}' already installed; keeping existing copy",
                manifest.suite_name
            );
        } else {
            copy_dir_recursive(tree, &suite_root)?;
            info!(
                "Installed suite '{}' into {}",
                manifest.suite_name,
                suite_root.display()
            );
        }
        Ok(suite_root)
    }

    fn load_resolved(
        &self,
        manifest: SuiteManifest,
        tree: &Path,
    ) -> Result<PluginSuite, SuiteError> {
        let suite_root = self.install(&manifest, tree)?;

        let document = suite_root.join(&manifest.document);
        if !document.exists() {
            warn!(
                "Suite '{}' documentation not found at {}",
                manifest.suite_name,
                document.display()
            );
        }

        let mut plugins = Vec::with_capacity(manifest.plugins.len());
        for descriptor in &manifest.plugins {
            let source_file = suite_root.join(&descriptor.rel_path);
            if !source_file.is_file() {
                return Err(SuiteError::MissingSource(source_file));
            }
            let qualified_name = format!("{}.{}", manifest.suite_name, descriptor.module_name);
            let instance = self
                .registry
                .create(&descriptor.module_name)
                .ok_or_else(|| SuiteError::UnknownModule(descriptor.module_name.clone()))?
                .map_err(|source| SuiteError::Construction {
                    plugin: descriptor.plugin_name.clone(),
                    source,
                })?;
            debug!(
                "Loaded plugin '{}' as {}",
                descriptor.plugin_name, qualified_name
            );
            plugins.push(LoadedPlugin {
                name: descriptor.plugin_name.clone(),
                dependencies: descriptor.dependencies.clone(),
                qualified_name,
                instance,
            });
        }

        let suite = PluginSuite::new(&manifest.suite_name, plugins, self.workers)?;
        info!(
            "Suite '{}' ready: {} plugins",
            suite.name(),
            suite.plugin_names().len()
        );
        Ok(suite)
    }
}

/// Explicit registry of loaded suites.
///
/// Owns the workspace and the plugin factory table; construct one at
/// startup and pass it by handle wherever suites are needed.
pub struct SuiteManager {
    workspace: SuiteWorkspace,
    registry: PluginRegistry,
    suites: HashMap<String, Arc<PluginSuite>>,
    workers: usize,
}

impl SuiteManager {
    pub fn new(root: impl Into<PathBuf>, registry: PluginRegistry) -> Result<Self, SuiteError> {
        Ok(Self {
            workspace: SuiteWorkspace::new(root)?,
            registry,
            suites: HashMap::new(),
            workers: num_cpus::get(),
        })
    }

    /// Worker count handed to suites loaded by this manager
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn workspace(&self) -> &SuiteWorkspace {
        &self.workspace
    }

    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Load the suite at `source`, or return the already-loaded handle if a
    /// suite of the same name is present.
    pub fn load_suite(&mut self, source: &Path) -> Result<Arc<PluginSuite>, SuiteError> {
        let loader =
            SuiteLoader::new(&self.workspace, &self.registry).with_workers(self.workers);
        let (manifest, tree) = loader.resolve_source(source)?;
        if let Some(existing) = self.suites.get(&manifest.suite_name) {
            debug!("Suite '{}' already loaded", manifest.suite_name);
            return Ok(Arc::clone(existing));
        }
        let suite = Arc::new(loader.load_resolved(manifest, &tree)?);
        self.suites.insert(suite.name().to_string(), Arc::clone(&suite));
        Ok(suite)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<PluginSuite>> {
        self.suites.get(name).map(Arc::clone)
    }

    /// Names of loaded suites, sorted for stable output
    #[must_use]
    pub fn suite_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.suites.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
