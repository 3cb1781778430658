// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of handler units and plugin packages on disk.
//!
//! Each unit or package is loaded all-or-nothing: a unit with one bad handler
//! contributes no handlers, is recorded in the [`LoadReport`], and loading
//! moves on to the next unit.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use busline_core::{BuslineError, Handler};
use tracing::{debug, info, warn};

use crate::catalog::HandlerCatalog;
use crate::manifest::{parse_handler_unit, parse_plugin_manifest, PluginManifest};

/// Stems of local units skipped unless examples are requested.
const EXAMPLE_STEMS: &[&str] = &["template", "example"];

/// Manifest file expected at the root of every plugin package.
const PLUGIN_MANIFEST: &str = "plugin.toml";

/// A unit or package that failed to load.
#[derive(Debug, thiserror::Error)]
#[error("failed to load `{}`: {reason}", .unit.display())]
pub struct LoadError {
    pub unit: PathBuf,
    pub reason: String,
}

impl LoadError {
    fn new(unit: &Path, reason: impl Into<String>) -> Self {
        Self {
            unit: unit.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn from_error(unit: &Path, error: BuslineError) -> Self {
        let reason = match error {
            BuslineError::Load { reason, .. } => reason,
            other => other.to_string(),
        };
        Self::new(unit, reason)
    }
}

impl From<LoadError> for BuslineError {
    fn from(err: LoadError) -> Self {
        BuslineError::Load {
            unit: err.unit.display().to_string(),
            reason: err.reason,
        }
    }
}

/// Outcome of a load pass.
#[derive(Default)]
pub struct LoadReport {
    /// Instantiated handlers, in discovery order.
    pub handlers: Vec<Arc<dyn Handler>>,
    /// Units that contributed handlers (or were empty), in discovery order.
    pub units: Vec<PathBuf>,
    /// Plugin packages that loaded.
    pub plugins: Vec<PluginManifest>,
    /// Units and packages that were skipped because they failed.
    pub errors: Vec<LoadError>,
    /// Handlers skipped because they were disabled.
    pub disabled: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Appends `other` to this report.
    pub fn merge(&mut self, other: LoadReport) {
        self.handlers.extend(other.handlers);
        self.units.extend(other.units);
        self.plugins.extend(other.plugins);
        self.errors.extend(other.errors);
        self.disabled += other.disabled;
    }
}

impl std::fmt::Debug for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers: Vec<(&str, &str)> = self
            .handlers
            .iter()
            .map(|h| (h.name(), h.message_name()))
            .collect();
        f.debug_struct("LoadReport")
            .field("handlers", &handlers)
            .field("units", &self.units)
            .field("plugins", &self.plugins)
            .field("errors", &self.errors)
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// Loads handlers from local units and plugin packages.
///
/// Every call builds fresh handler instances; registering the results of two
/// calls registers two sets of handlers.
pub struct HandlerLoader {
    catalog: HandlerCatalog,
    include_examples: bool,
}

impl HandlerLoader {
    pub fn new(catalog: HandlerCatalog) -> Self {
        Self {
            catalog,
            include_examples: false,
        }
    }

    /// Also load local units named `template` or `example`.
    pub fn include_examples(mut self, include: bool) -> Self {
        self.include_examples = include;
        self
    }

    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// Loads local units and then plugin packages.
    pub fn load_all(&self, local_dir: &Path, plugin_dir: &Path, prefixes: &[String]) -> LoadReport {
        let mut report = self.load_local(local_dir);
        report.merge(self.load_plugins(plugin_dir, prefixes));
        info!(
            handlers = report.handlers.len(),
            units = report.units.len(),
            plugins = report.plugins.len(),
            failed = report.errors.len(),
            "handlers loaded"
        );
        report
    }

    /// Loads every `*.toml` unit at the top level of `dir`, in name order.
    pub fn load_local(&self, dir: &Path) -> LoadReport {
        let mut report = LoadReport::default();

        let units = match sorted_entries(dir) {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!(dir = %dir.display(), "local callback directory not found");
                return report;
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot read local callback directory");
                report.errors.push(LoadError::new(dir, e.to_string()));
                return report;
            }
        };

        for path in units {
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "toml") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if !self.include_examples && EXAMPLE_STEMS.contains(&stem) {
                debug!(unit = %path.display(), "skipping example unit");
                continue;
            }
            self.load_unit_into(&path, &mut report);
        }

        report
    }

    /// Loads every package in `dir` whose name starts with one of `prefixes`.
    pub fn load_plugins(&self, dir: &Path, prefixes: &[String]) -> LoadReport {
        let mut report = LoadReport::default();

        let packages = match sorted_entries(dir) {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                debug!(dir = %dir.display(), "plugin directory not found");
                return report;
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot read plugin directory");
                report.errors.push(LoadError::new(dir, e.to_string()));
                return report;
            }
        };

        for path in packages {
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stripped) = prefixes
                .iter()
                .filter(|p| !p.is_empty())
                .find_map(|p| name.strip_prefix(p.as_str()))
            else {
                continue;
            };

            match self.load_package(&path, stripped) {
                Ok(package) => {
                    info!(
                        plugin = %package.manifest.name,
                        version = %package.manifest.version,
                        handlers = package.handlers.len(),
                        "plugin loaded"
                    );
                    report.handlers.extend(package.handlers);
                    report.units.extend(package.units);
                    report.disabled += package.disabled;
                    report.plugins.push(package.manifest);
                }
                Err(err) => {
                    warn!(plugin = %path.display(), error = %err.reason, "skipping plugin");
                    report.errors.push(err);
                }
            }
        }

        report
    }

    fn load_unit_into(&self, path: &Path, report: &mut LoadReport) {
        match self.load_unit(path) {
            Ok((handlers, disabled)) => {
                debug!(unit = %path.display(), handlers = handlers.len(), "unit loaded");
                report.handlers.extend(handlers);
                report.units.push(path.to_path_buf());
                report.disabled += disabled;
            }
            Err(err) => {
                warn!(unit = %path.display(), error = %err.reason, "skipping handler unit");
                report.errors.push(err);
            }
        }
    }

    /// Builds all enabled handlers of one unit, or none.
    fn load_unit(&self, path: &Path) -> Result<(Vec<Arc<dyn Handler>>, usize), LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::new(path, e.to_string()))?;
        let unit_name = path.display().to_string();
        let unit = parse_handler_unit(&unit_name, &content)
            .map_err(|e| LoadError::from_error(path, e))?;

        let mut handlers = Vec::with_capacity(unit.handlers.len());
        let mut disabled = 0;
        for spec in &unit.handlers {
            if !spec.enabled {
                debug!(unit = %unit_name, message_name = %spec.message_name, "handler disabled");
                disabled += 1;
                continue;
            }
            let handler = self
                .catalog
                .create(spec)
                .map_err(|e| LoadError::from_error(path, e))?;
            handlers.push(handler);
        }
        Ok((handlers, disabled))
    }

    fn load_package(&self, dir: &Path, stripped_name: &str) -> Result<LoadedPackage, LoadError> {
        let manifest_path = dir.join(PLUGIN_MANIFEST);
        let content = fs::read_to_string(&manifest_path)
            .map_err(|e| LoadError::new(&manifest_path, e.to_string()))?;
        let manifest =
            parse_plugin_manifest(&content).map_err(|e| LoadError::from_error(&manifest_path, e))?;

        let entry_points = if manifest.entry_points.is_empty() {
            if stripped_name.is_empty() {
                return Err(LoadError::new(
                    dir,
                    "package name is only a prefix and no entry_points are declared",
                ));
            }
            vec![stripped_name.to_string()]
        } else {
            manifest.entry_points.clone()
        };

        let mut package = LoadedPackage {
            manifest,
            handlers: Vec::new(),
            units: Vec::new(),
            disabled: 0,
        };
        for entry in entry_points {
            let unit_path = dir.join(format!("{entry}.toml"));
            let (handlers, disabled) = self.load_unit(&unit_path)?;
            package.handlers.extend(handlers);
            package.units.push(unit_path);
            package.disabled += disabled;
        }
        Ok(package)
    }
}

impl std::fmt::Debug for HandlerLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerLoader")
            .field("catalog", &self.catalog)
            .field("include_examples", &self.include_examples)
            .finish()
    }
}

struct LoadedPackage {
    manifest: PluginManifest,
    handlers: Vec<Arc<dyn Handler>>,
    units: Vec<PathBuf>,
    disabled: usize,
}

/// Directory entries sorted by path; `None` if `dir` does not exist.
fn sorted_entries(dir: &Path) -> std::io::Result<Option<Vec<PathBuf>>> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut entries = read
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(Some(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;

    const ECHO_UNIT: &str = "[[handler]]\nkind = \"echo\"\nmessage_name = \"ping\"\n[handler.settings]\nreply_topic = \"out\"\n";

    #[test]
    fn missing_directories_are_not_errors() {
        let loader = HandlerLoader::new(builtin_catalog());
        let report = loader.load_all(
            Path::new("/no/such/local"),
            Path::new("/no/such/plugins"),
            &["busline_".to_string()],
        );
        assert!(report.is_clean());
        assert!(report.handlers.is_empty());
    }

    #[test]
    fn example_units_are_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("example.toml"), ECHO_UNIT).unwrap();
        fs::write(dir.path().join("template.toml"), ECHO_UNIT).unwrap();

        let skipped = HandlerLoader::new(builtin_catalog()).load_local(dir.path());
        assert!(skipped.handlers.is_empty());

        let included = HandlerLoader::new(builtin_catalog())
            .include_examples(true)
            .load_local(dir.path());
        assert_eq!(included.handlers.len(), 2);
    }

    #[test]
    fn non_toml_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not a unit").unwrap();
        fs::write(dir.path().join("ping.toml"), ECHO_UNIT).unwrap();
        let report = HandlerLoader::new(builtin_catalog()).load_local(dir.path());
        assert!(report.is_clean());
        assert_eq!(report.units, vec![dir.path().join("ping.toml")]);
    }

    #[test]
    fn load_error_converts_to_busline_error() {
        let err: BuslineError = LoadError::new(Path::new("a.toml"), "bad").into();
        assert_eq!(err.to_string(), "failed to load `a.toml`: bad");
    }
}
