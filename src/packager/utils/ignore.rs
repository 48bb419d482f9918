//! Fixed ignore list for pass-through source copies.

use glob::Pattern;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

/// Directory and file names never copied from a workspace.
pub const IGNORED_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".vscode",
    ".idea",
    ".DS_Store",
];

/// File name patterns never copied from a workspace.
pub const IGNORED_PATTERNS: &[&str] = &["*.pyc", "*.log"];

static PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    IGNORED_PATTERNS
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                log::warn!("Skipping invalid ignore pattern {p}: {e}");
                None
            }
        })
        .collect()
});

/// Names, patterns and absolute paths excluded from a copy.
///
/// The default list holds [`IGNORED_NAMES`] and [`IGNORED_PATTERNS`]; callers
/// add the staging and output directories when they live inside the workspace.
#[derive(Clone, Debug, Default)]
pub struct IgnoreList {
    excluded_paths: Arc<Vec<PathBuf>>,
    extra_names: Arc<Vec<String>>,
}

impl IgnoreList {
    /// Also excludes `path` and everything below it.
    pub fn exclude_path(mut self, path: impl Into<PathBuf>) -> Self {
        Arc::make_mut(&mut self.excluded_paths).push(path.into());
        self
    }

    /// Also excludes entries with this exact file name.
    pub fn exclude_name(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.extra_names).push(name.into());
        self
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.excluded_paths.iter().any(|excluded| path.starts_with(excluded)) {
            return true;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        IGNORED_NAMES.contains(&name)
            || self.extra_names.iter().any(|n| n == name)
            || PATTERNS.iter().any(|p| p.matches(name))
    }
}
