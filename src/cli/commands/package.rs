//! `polyglotpkg package`: run the full pipeline for one workspace.

use crate::{
    cli::{OutputManager, RuntimeConfig, args::PackageArgs},
    error::{CliError, Result},
    packager::{
        LifecycleEvent, Packager, PackagerOptions, PackagerOptionsBuilder, PackagingError, ProgressSink, Toolchain,
    },
};
use std::time::Duration;

/// Messages printed as each stage starts.
const STAGE_MESSAGES: [(LifecycleEvent, &str); 3] = [
    (LifecycleEvent::CompileStart, "Compiling project..."),
    (LifecycleEvent::DependenciesStart, "Bundling dependencies..."),
    (LifecycleEvent::BundleStart, "Packaging project..."),
];

fn toolchain(args: &PackageArgs) -> Toolchain {
    let mut toolchain = Toolchain::default();
    if let Some(npm) = &args.npm {
        toolchain.npm = npm.clone();
    }
    if let Some(tsc) = &args.tsc {
        toolchain.tsc = tsc.clone();
    }
    if let Some(python) = &args.python {
        toolchain.python = python.clone();
    }
    if let Some(pwsh) = &args.pwsh {
        toolchain.pwsh = pwsh.clone();
    }
    toolchain
}

/// Maps command line arguments onto packager options.
///
/// Option combinations the builder rejects are usage errors.
pub fn options(args: &PackageArgs, config: &RuntimeConfig) -> Result<PackagerOptions> {
    let mut builder = PackagerOptionsBuilder::new()
        .workspace(&args.workspace)
        .skip_metadata_packaging(args.skip_metadata)
        .toolchain(toolchain(args));

    if let Some(output) = &args.output {
        builder = builder.output_archive_path(output);
    }
    if let Some(staging) = &args.staging {
        builder = builder.bundle_staging_path(staging);
    }
    if let Some(runtime) = args.runtime {
        builder = builder.runtime_override(runtime);
    }
    if let Some(seconds) = args.tool_timeout {
        builder = builder.tool_timeout(Duration::from_secs(seconds));
    }
    if !config.is_quiet() {
        builder = builder.progress_sink(ProgressSink::new(std::io::stderr()));
    }

    builder.build().map_err(|e| match e {
        PackagingError::InvalidOptions(reason) => CliError::InvalidArguments { reason }.into(),
        other => other.into(),
    })
}

fn register_progress(packager: &Packager, output: &OutputManager) {
    for (event, message) in STAGE_MESSAGES {
        let output = output.clone();
        packager.once(event, move || output.progress(message));
    }
}

/// Packages the workspace and prints a summary. Returns the process exit code.
pub async fn package(args: &PackageArgs, config: &RuntimeConfig) -> Result<i32> {
    let options = options(args, config)?;
    let packager = Packager::new();
    register_progress(&packager, config.output());

    let archive = packager.package_project(options).await?;

    config.success(&format!("Created {}", archive.path.display()));
    config.indent(&format!("runtime:  {}", archive.action_type));
    config.indent(&format!("size:     {} bytes ({} entries)", archive.size, archive.entries));
    config.indent(&format!("sha256:   {}", archive.checksum));
    if let Some(metadata_dir) = &archive.metadata_dir {
        config.indent(&format!("metadata: {}", metadata_dir.display()));
    }
    Ok(0)
}
