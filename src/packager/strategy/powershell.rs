//! PowerShell strategy: pass-through scripts, `Save-Module`-vendored modules under `Modules/`.

use super::{BundleLayout, RuntimeStrategy, StrategyBase};
use crate::packager::{
    error::{CompileError, DependencyInstallError, ErrorExt},
    utils::process::ToolCommand,
};
use regex::Regex;
use std::path::{Path, PathBuf};

/// A module listed in a manifest's `RequiredModules`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequiredModule {
    pub name: String,
    /// Exact version (`RequiredVersion`).
    pub required_version: Option<String>,
    /// Lower bound (`ModuleVersion`).
    pub minimum_version: Option<String>,
}

impl RequiredModule {
    fn save_command(&self, destination: &Path) -> String {
        let mut command = format!(
            "Save-Module -Name {} -Path {} -Force -ErrorAction Stop",
            ps_quote(&self.name),
            ps_quote(&destination.to_string_lossy())
        );
        if let Some(version) = &self.required_version {
            command.push_str(&format!(" -RequiredVersion {}", ps_quote(version)));
        } else if let Some(version) = &self.minimum_version {
            command.push_str(&format!(" -MinimumVersion {}", ps_quote(version)));
        }
        command
    }
}

/// Single-quoted PowerShell string literal.
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Extracts `RequiredModules` from the text of a `.psd1` module manifest.
///
/// Understands plain names (`'Az.Accounts'`) and hashtable entries
/// (`@{ ModuleName = 'Pester'; RequiredVersion = '5.5.0' }`), as an array or a
/// single value.
pub fn parse_required_modules(manifest: &str) -> Result<Vec<RequiredModule>, regex::Error> {
    let block = Regex::new(
        r#"(?is)RequiredModules\s*=\s*(?:@\((?P<list>.*?)\)|(?P<single>@\{.*?\}|'[^']*'|"[^"]*"))"#,
    )?;
    let hashtable = Regex::new(r"(?s)@\{(?P<body>.*?)\}")?;
    let key_value = Regex::new(r#"(?i)(?P<key>\w+)\s*=\s*['"](?P<value>[^'"]*)['"]"#)?;
    let quoted = Regex::new(r#"'(?P<a>[^']+)'|"(?P<b>[^"]+)""#)?;

    // Comment lines may mention RequiredModules in the generated manifest template.
    let content: String = manifest
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let Some(caps) = block.captures(&content) else {
        return Ok(Vec::new());
    };
    let body = caps
        .name("list")
        .or_else(|| caps.name("single"))
        .map(|m| m.as_str())
        .unwrap_or_default();

    let mut modules = Vec::new();
    for table in hashtable.captures_iter(body) {
        let mut module = RequiredModule {
            name: String::new(),
            required_version: None,
            minimum_version: None,
        };
        for kv in key_value.captures_iter(&table["body"]) {
            let value = kv["value"].to_string();
            match kv["key"].to_ascii_lowercase().as_str() {
                "modulename" => module.name = value,
                "requiredversion" => module.required_version = Some(value),
                "moduleversion" => module.minimum_version = Some(value),
                _ => {}
            }
        }
        if !module.name.is_empty() {
            modules.push(module);
        }
    }

    let plain = hashtable.replace_all(body, "");
    for caps in quoted.captures_iter(&plain) {
        if let Some(name) = caps.name("a").or_else(|| caps.name("b")) {
            modules.push(RequiredModule {
                name: name.as_str().to_string(),
                required_version: None,
                minimum_version: None,
            });
        }
    }

    Ok(modules)
}

#[derive(Clone, Debug)]
pub struct PowerShellStrategy {
    base: StrategyBase,
}

impl PowerShellStrategy {
    pub fn new(base: StrategyBase) -> Self {
        Self { base }
    }

    /// First `*.psd1` in the workspace root, by name.
    fn module_manifest(&self) -> Result<Option<PathBuf>, DependencyInstallError> {
        let workspace = self.base.workspace();
        let mut manifests = Vec::new();
        for entry in std::fs::read_dir(workspace).fs_context("listing workspace", workspace)? {
            let path = entry.fs_context("listing workspace", workspace)?.path();
            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("psd1"))
            {
                manifests.push(path);
            }
        }
        manifests.sort();
        Ok(manifests.into_iter().next())
    }
}

impl RuntimeStrategy for PowerShellStrategy {
    fn base(&self) -> &StrategyBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StrategyBase {
        &mut self.base
    }

    async fn compile(&self) -> Result<(), CompileError> {
        self.base.copy_sources().await?;
        self.base.verify_entry_point()
    }

    async fn install_dependencies(&self) -> Result<(), DependencyInstallError> {
        let vendor = self.base.prepare_vendor_dir().await?;

        let Some(manifest) = self.module_manifest()? else {
            log::info!("No PowerShell module manifest, nothing to vendor");
            return Ok(());
        };
        let content = tokio::fs::read_to_string(&manifest)
            .await
            .fs_context("reading module manifest", &manifest)?;
        let modules = parse_required_modules(&content).map_err(|e| DependencyInstallError::InvalidManifest {
            path: manifest.clone(),
            reason: e.to_string(),
        })?;
        if modules.is_empty() {
            log::info!("{} declares no RequiredModules", manifest.display());
            return Ok(());
        }

        let script = std::iter::once("$ErrorActionPreference = 'Stop'".to_string())
            .chain(modules.iter().map(|m| m.save_command(&vendor)))
            .collect::<Vec<_>>()
            .join("; ");

        let command = ToolCommand::new(&self.base.options().toolchain().pwsh, self.base.workspace())
            .args(["-NoLogo", "-NoProfile", "-NonInteractive", "-Command"])
            .arg(script);
        self.base.run_tool(command).await?;
        Ok(())
    }

    fn layout(&self) -> BundleLayout {
        BundleLayout {
            vendored_dir: self.base.options().vendor_dir(),
            dependencies_prefix: PathBuf::from("Modules"),
        }
    }
}
