//! End-to-end packaging runs against fixture workspaces.

mod common;

use common::*;
use polyglotpkg::packager::{
    ActionType, CompileError, DependencyInstallError, DetectionError, LifecycleEvent, Packager, PackagerOptions,
    PackagerOptionsBuilder, PackagerState, PackagingError, ToolError, Toolchain,
};
use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::mpsc::UnboundedReceiver;

fn options_with(workspace: &Path, toolchain: Toolchain) -> PackagerOptions {
    PackagerOptionsBuilder::new()
        .workspace(workspace)
        .toolchain(toolchain)
        .build()
        .unwrap()
}

fn drain(rx: &mut UnboundedReceiver<LifecycleEvent>) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn empty_workspace_is_a_detection_error() {
    let root = tempfile::tempdir().unwrap();
    let packager = Packager::new();
    let mut rx = packager.subscribe();

    let err = packager
        .package_project(options_with(root.path(), Toolchain::default()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PackagingError::Detection(DetectionError::UnsupportedProjectType(_))
    ));
    assert!(drain(&mut rx).is_empty());
    assert!(!root.path().join("dist").exists());
}

#[tokio::test]
async fn powershell_without_modules_needs_no_tools() {
    let root = tempfile::tempdir().unwrap();
    let ws = powershell_workspace(root.path());
    let toolchain = Toolchain {
        pwsh: "polyglotpkg-no-such-pwsh".into(),
        ..Toolchain::default()
    };

    let archive = Packager::new()
        .package_project(options_with(&ws, toolchain))
        .await
        .unwrap();

    assert_eq!(archive.action_type, ActionType::PowerShell);
    assert_eq!(archive_listing(&archive.path), vec!["handler.ps1"]);
}

#[cfg(unix)]
#[tokio::test]
async fn node_workspace_packages_entry_and_dependency() {
    let root = tempfile::tempdir().unwrap();
    let ws = node_workspace(root.path());
    let toolchain = Toolchain {
        npm: stub_npm(&root.path().join("bin")).into_os_string(),
        ..Toolchain::default()
    };

    let packager = Packager::new();
    let mut rx = packager.subscribe();
    let starts = Arc::new(AtomicUsize::new(0));
    for event in [
        LifecycleEvent::CompileStart,
        LifecycleEvent::DependenciesStart,
        LifecycleEvent::BundleStart,
    ] {
        let starts = starts.clone();
        packager.once(event, move || {
            starts.fetch_add(1, Ordering::SeqCst);
        });
    }

    let archive = packager.package_project(options_with(&ws, toolchain)).await.unwrap();

    assert_eq!(archive.path, ws.join("dist").join("bundle.zip"));
    assert_eq!(archive.action_type, ActionType::Node);
    assert_eq!(
        archive_listing(&archive.path),
        vec![
            "index.js",
            "lib/",
            "lib/util.js",
            "node_modules/",
            "node_modules/left-pad/",
            "node_modules/left-pad/index.js",
            "package.json",
        ]
    );
    assert_eq!(
        drain(&mut rx),
        vec![
            LifecycleEvent::CompileStart,
            LifecycleEvent::CompileComplete,
            LifecycleEvent::DependenciesStart,
            LifecycleEvent::DependenciesComplete,
            LifecycleEvent::BundleStart,
            LifecycleEvent::BundleComplete,
        ]
    );
    assert_eq!(starts.load(Ordering::SeqCst), 3);
    assert_eq!(packager.state(), PackagerState::Done);

    let metadata: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(ws.join("dist").join("vro").join("action.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(metadata["name"], "padString");
    assert_eq!(metadata["module"], "com.example.strings");
    assert_eq!(metadata["entrypoint"], "index.handler");
    assert_eq!(metadata["runtime"], "nodejs");
}

#[cfg(unix)]
#[tokio::test]
async fn repeated_runs_produce_identical_archives() {
    let root = tempfile::tempdir().unwrap();
    let ws = node_workspace(root.path());
    let toolchain = Toolchain {
        npm: stub_npm(&root.path().join("bin")).into_os_string(),
        ..Toolchain::default()
    };
    let packager = Packager::new();

    let first = packager
        .package_project(options_with(&ws, toolchain.clone()))
        .await
        .unwrap();
    let first_listing = archive_listing(&first.path);
    let second = packager.package_project(options_with(&ws, toolchain)).await.unwrap();

    assert_eq!(first_listing, archive_listing(&second.path));
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(packager.cached_workspace(), Some(ws));
}

#[cfg(unix)]
#[tokio::test]
async fn failed_install_writes_no_archive_and_stops_events() {
    let root = tempfile::tempdir().unwrap();
    let ws = node_workspace(root.path());
    let toolchain = Toolchain {
        npm: failing_npm(&root.path().join("bin")).into_os_string(),
        ..Toolchain::default()
    };
    let packager = Packager::new();
    let mut rx = packager.subscribe();
    let bundle_started = Arc::new(AtomicUsize::new(0));
    let b = bundle_started.clone();
    packager.once(LifecycleEvent::BundleStart, move || {
        b.fetch_add(1, Ordering::SeqCst);
    });

    let err = packager.package_project(options_with(&ws, toolchain)).await.unwrap_err();

    match &err {
        PackagingError::Dependencies(DependencyInstallError::Tool(ToolError::Failed {
            code,
            stderr_tail,
            ..
        })) => {
            assert_eq!(*code, Some(1));
            assert!(stderr_tail.iter().any(|line| line.contains("404 Not Found")));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("dependencies stage failed"));
    assert!(!ws.join("dist").join("bundle.zip").exists());
    assert_eq!(
        drain(&mut rx),
        vec![
            LifecycleEvent::CompileStart,
            LifecycleEvent::CompileComplete,
            LifecycleEvent::DependenciesStart,
            LifecycleEvent::DependenciesFailed,
        ]
    );
    assert_eq!(bundle_started.load(Ordering::SeqCst), 0);
    assert_eq!(packager.state(), PackagerState::Failed);
}

#[cfg(unix)]
#[tokio::test]
async fn python_dependencies_land_at_bundle_root() {
    let root = tempfile::tempdir().unwrap();
    let ws = python_workspace(root.path());
    let toolchain = Toolchain {
        python: stub_python(&root.path().join("bin")).into_os_string(),
        ..Toolchain::default()
    };

    let archive = Packager::new()
        .package_project(options_with(&ws, toolchain))
        .await
        .unwrap();

    assert_eq!(archive.action_type, ActionType::Python);
    assert_eq!(
        archive_listing(&archive.path),
        vec!["main.py", "requests/", "requests/__init__.py", "requirements.txt"]
    );
}

#[tokio::test]
async fn missing_entry_point_fails_compile() {
    let root = tempfile::tempdir().unwrap();
    let ws = root.path().join("ws");
    std::fs::create_dir_all(&ws).unwrap();
    std::fs::write(ws.join("package.json"), r#"{ "name": "x", "main": "app.js" }"#).unwrap();
    std::fs::write(ws.join("index.js"), "exports.handler = () => 1;\n").unwrap();

    let err = Packager::new()
        .package_project(options_with(&ws, Toolchain::default()))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("compile stage failed: entry point `app.handler` not found"));
}

#[cfg(unix)]
#[tokio::test]
async fn typescript_prefers_workspace_local_tsc() {
    let root = tempfile::tempdir().unwrap();
    let ws = typescript_workspace(root.path());
    stub_tsc(&ws.join("node_modules").join(".bin"));
    let toolchain = Toolchain {
        tsc: "polyglotpkg-no-such-tsc".into(),
        npm: "polyglotpkg-no-such-npm".into(),
        ..Toolchain::default()
    };

    let archive = Packager::new()
        .package_project(options_with(&ws, toolchain))
        .await
        .unwrap();

    assert_eq!(archive.action_type, ActionType::Node);
    assert_eq!(
        archive_listing(&archive.path),
        vec!["index.js", "node_modules/", "package.json"]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn failing_tsc_is_a_compile_error() {
    let root = tempfile::tempdir().unwrap();
    let ws = typescript_workspace(root.path());
    let toolchain = Toolchain {
        tsc: failing_tsc(&root.path().join("bin")).into_os_string(),
        ..Toolchain::default()
    };
    let packager = Packager::new();
    let mut rx = packager.subscribe();

    let err = packager.package_project(options_with(&ws, toolchain)).await.unwrap_err();

    match &err {
        PackagingError::Compile(CompileError::Tool(ToolError::Failed { code, stderr_tail, .. })) => {
            assert_eq!(*code, Some(2));
            assert!(stderr_tail.iter().any(|line| line.contains("TS2304")));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        drain(&mut rx),
        vec![LifecycleEvent::CompileStart, LifecycleEvent::CompileFailed]
    );
    assert!(!ws.join("dist").join("bundle.zip").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn lock_file_selects_npm_ci() {
    let root = tempfile::tempdir().unwrap();
    let log = root.path().join("npm.log");
    let npm = recording_npm(&root.path().join("bin"), &log);

    let locked = node_workspace(&root.path().join("locked"));
    std::fs::write(locked.join("package-lock.json"), r#"{ "lockfileVersion": 3 }"#).unwrap();
    let unlocked = node_workspace(&root.path().join("unlocked"));

    for ws in [&locked, &unlocked] {
        let toolchain = Toolchain {
            npm: npm.clone().into_os_string(),
            ..Toolchain::default()
        };
        Packager::new()
            .package_project(options_with(ws, toolchain))
            .await
            .unwrap();
    }

    assert_eq!(
        std::fs::read_to_string(&log).unwrap(),
        "ci --omit=dev --no-audit --no-fund\ninstall --omit=dev --no-audit --no-fund\n"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn powershell_required_modules_are_saved_under_modules() {
    let root = tempfile::tempdir().unwrap();
    let ws = powershell_module_workspace(root.path());
    let log = root.path().join("pwsh.log");
    let toolchain = Toolchain {
        pwsh: stub_pwsh(&root.path().join("bin"), &log).into_os_string(),
        ..Toolchain::default()
    };

    let archive = Packager::new()
        .package_project(options_with(&ws, toolchain))
        .await
        .unwrap();

    assert_eq!(archive.action_type, ActionType::PowerShell);
    assert_eq!(
        archive_listing(&archive.path),
        vec![
            "Greeter.psd1",
            "Modules/",
            "Modules/Az.Accounts/",
            "Modules/Az.Accounts/Az.Accounts.psd1",
            "Modules/Pester/",
            "Modules/Pester/Pester.psd1",
            "handler.ps1",
        ]
    );
    let script = std::fs::read_to_string(&log).unwrap();
    assert!(script.starts_with("$ErrorActionPreference = 'Stop'"));
    assert!(script.contains("Save-Module -Name 'Pester'"));
    assert!(script.contains("-RequiredVersion '5.5.0'"));
}

#[cfg(unix)]
#[tokio::test]
async fn pyproject_dependencies_are_installed() {
    let root = tempfile::tempdir().unwrap();
    let ws = pyproject_workspace(root.path());
    let log = root.path().join("python.log");
    let toolchain = Toolchain {
        python: recording_python(&root.path().join("bin"), &log).into_os_string(),
        ..Toolchain::default()
    };

    let archive = Packager::new()
        .package_project(options_with(&ws, toolchain))
        .await
        .unwrap();

    assert_eq!(archive.action_type, ActionType::Python);
    assert_eq!(
        archive_listing(&archive.path),
        vec!["main.py", "pyproject.toml", "requests/", "requests/__init__.py"]
    );
    let args = std::fs::read_to_string(&log).unwrap();
    assert!(args.starts_with("-m pip install --target "));
    assert!(args.trim_end().ends_with("requests>=2.31 click"));
    assert!(!args.contains(" -r "));
}
