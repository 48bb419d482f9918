//! Action metadata from the workspace `package.json`.
//!
//! Every runtime may carry a `package.json` whose `platform` block describes
//! the action for the automation platform:
//!
//! ```json
//! {
//!   "name": "sum",
//!   "version": "1.0.0",
//!   "platform": {
//!     "action": "sum",
//!     "runtime": "python",
//!     "entrypoint": "handler.handler",
//!     "inputs": { "a": "number", "b": "number" },
//!     "outputType": "number",
//!     "memoryLimitMb": 128,
//!     "timeoutSec": 60
//!   },
//!   "vro": { "module": "com.example.math" }
//! }
//! ```
//!
//! Workspaces without a manifest get defaults derived from the directory name
//! and the runtime.

use crate::packager::ActionType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// File name of the workspace manifest.
pub const MANIFEST_FILE: &str = "package.json";

const DEFAULT_VERSION: &str = "1.0.0";
const DEFAULT_MODULE: &str = "com.polyglot.actions";
const DEFAULT_MEMORY_LIMIT_MB: u64 = 64;
const DEFAULT_TIMEOUT_SEC: u64 = 180;

/// The manifest exists but cannot be read or parsed.
#[derive(Debug, Error)]
#[error("invalid manifest {}: {reason}", .path.display())]
pub struct ManifestError {
    pub path: PathBuf,
    pub reason: String,
}

/// `platform` block of the manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDefinition {
    pub action: Option<String>,
    pub runtime: Option<String>,
    pub entrypoint: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
    pub output_type: Option<String>,
    pub memory_limit_mb: Option<u64>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VroDefinition {
    module: Option<String>,
}

/// Parsed `package.json`, limited to the fields the packager uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub main: Option<String>,
    #[serde(default)]
    pub platform: PlatformDefinition,
    #[serde(default)]
    vro: VroDefinition,
    #[serde(default)]
    pub dependencies: BTreeMap<String, Value>,
}

impl ActionManifest {
    /// Runtime explicitly declared in `platform.runtime`, if it names a supported one.
    pub fn declared_runtime(&self) -> Option<ActionType> {
        self.platform.runtime.as_deref().and_then(|r| r.parse().ok())
    }

    /// Whether the manifest lists production dependencies.
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// Loads `package.json` from `workspace`.
///
/// Returns `Ok(None)` when the workspace has no manifest.
pub fn load_manifest(workspace: &Path) -> Result<Option<ActionManifest>, ManifestError> {
    let path = workspace.join(MANIFEST_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ManifestError {
                path,
                reason: format!("failed to read: {e}"),
            });
        }
    };

    serde_json::from_str(&content).map(Some).map_err(|e| ManifestError {
        path,
        reason: format!("failed to parse: {e}"),
    })
}

/// Fully resolved description of the action being packaged.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    pub name: String,
    pub module: String,
    pub version: String,
    pub description: Option<String>,
    pub runtime: ActionType,
    /// `<module path>.<function>`, e.g. `handler.handler`.
    pub entrypoint: String,
    pub inputs: BTreeMap<String, Value>,
    pub output_type: Option<String>,
    pub memory_limit_mb: u64,
    pub timeout_sec: u64,
}

impl ActionDefinition {
    /// Resolves the action definition for `workspace`, filling gaps with defaults.
    pub fn resolve(workspace: &Path, manifest: Option<&ActionManifest>, runtime: ActionType) -> Self {
        let fallback_name = workspace
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "action".to_string());
        let default_manifest = ActionManifest::default();
        let manifest = manifest.unwrap_or(&default_manifest);
        let platform = &manifest.platform;

        let entrypoint = platform
            .entrypoint
            .clone()
            .or_else(|| match runtime {
                // `main` names the handler module in plain Node projects.
                ActionType::Node => manifest.main.as_deref().map(entrypoint_from_main),
                _ => None,
            })
            .or_else(|| runtime.default_entrypoint().map(String::from))
            .unwrap_or_else(|| "handler.handler".to_string());

        Self {
            name: platform
                .action
                .clone()
                .or_else(|| manifest.name.clone())
                .unwrap_or(fallback_name),
            module: manifest
                .vro
                .module
                .clone()
                .unwrap_or_else(|| DEFAULT_MODULE.to_string()),
            version: manifest
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            description: platform.description.clone().or_else(|| manifest.description.clone()),
            runtime,
            entrypoint,
            inputs: platform.inputs.clone(),
            output_type: platform.output_type.clone(),
            memory_limit_mb: platform.memory_limit_mb.unwrap_or(DEFAULT_MEMORY_LIMIT_MB),
            timeout_sec: platform.timeout_sec.unwrap_or(DEFAULT_TIMEOUT_SEC),
        }
    }

    /// Path of the entry module relative to the compiled output root.
    ///
    /// `src/handler.handler` with extension `js` maps to `src/handler.js`.
    pub fn entry_module_path(&self) -> PathBuf {
        let module = self
            .entrypoint
            .rsplit_once('.')
            .map(|(module, _function)| module)
            .unwrap_or(&self.entrypoint);
        let mut path = PathBuf::from(module);
        if let Some(ext) = self.runtime.entry_extension() {
            path.set_extension(ext);
        }
        path
    }
}

fn entrypoint_from_main(main: &str) -> String {
    let module = main
        .trim_start_matches("./")
        .trim_end_matches(".js")
        .trim_end_matches(".cjs");
    format!("{module}.handler")
}

/// Document written to `<metadata dir>/action.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMetadata<'a> {
    pub name: &'a str,
    pub module: &'a str,
    pub version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub runtime: ActionType,
    pub entrypoint: &'a str,
    pub inputs: &'a BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<&'a str>,
    pub memory_limit_mb: u64,
    pub timeout_sec: u64,
    /// File name of the bundle archive the metadata describes.
    pub bundle: &'a str,
}

impl<'a> ActionMetadata<'a> {
    pub fn new(definition: &'a ActionDefinition, bundle: &'a str) -> Self {
        Self {
            name: &definition.name,
            module: &definition.module,
            version: &definition.version,
            description: definition.description.as_deref(),
            runtime: definition.runtime,
            entrypoint: &definition.entrypoint,
            inputs: &definition.inputs,
            output_type: definition.output_type.as_deref(),
            memory_limit_mb: definition.memory_limit_mb,
            timeout_sec: definition.timeout_sec,
            bundle,
        }
    }
}
