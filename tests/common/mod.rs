//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

/// Writes a minimal Node action with one production dependency.
pub fn node_workspace(root: &Path) -> PathBuf {
    let ws = root.join("node-action");
    fs::create_dir_all(ws.join("lib")).unwrap();
    fs::write(
        ws.join("package.json"),
        r#"{
  "name": "pad-action",
  "version": "1.2.0",
  "description": "Pads a string",
  "main": "index.js",
  "dependencies": { "left-pad": "1.3.0" },
  "platform": {
    "action": "padString",
    "inputs": { "value": "string", "width": "number" },
    "outputType": "string"
  },
  "vro": { "module": "com.example.strings" }
}
"#,
    )
    .unwrap();
    fs::write(
        ws.join("index.js"),
        "const pad = require('left-pad');\nexports.handler = (context, inputs) => pad(inputs.value, inputs.width);\n",
    )
    .unwrap();
    fs::write(ws.join("lib").join("util.js"), "module.exports = {};\n").unwrap();
    fs::write(ws.join("debug.log"), "noise\n").unwrap();
    fs::create_dir_all(ws.join(".git")).unwrap();
    fs::write(ws.join(".git").join("HEAD"), "ref: refs/heads/main\n").unwrap();
    ws
}

/// Writes a Python action whose requirements name one package.
pub fn python_workspace(root: &Path) -> PathBuf {
    let ws = root.join("python-action");
    fs::create_dir_all(&ws).unwrap();
    fs::write(ws.join("requirements.txt"), "requests==2.31.0\n").unwrap();
    fs::write(ws.join("main.py"), "import requests\n\ndef handler(context, inputs):\n    return 1\n").unwrap();
    ws
}

/// Writes a PowerShell action with no module dependencies.
pub fn powershell_workspace(root: &Path) -> PathBuf {
    let ws = root.join("pwsh-action");
    fs::create_dir_all(&ws).unwrap();
    fs::write(ws.join("handler.ps1"), "function Handler($context, $inputs) { 'ok' }\n").unwrap();
    ws
}

/// Writes a TypeScript action: `tsconfig.json`, a source file and no dependencies.
pub fn typescript_workspace(root: &Path) -> PathBuf {
    let ws = root.join("ts-action");
    fs::create_dir_all(ws.join("src")).unwrap();
    fs::write(ws.join("package.json"), r#"{ "name": "ts-action", "main": "index.js" }"#).unwrap();
    fs::write(ws.join("tsconfig.json"), r#"{ "compilerOptions": { "rootDir": "src" } }"#).unwrap();
    fs::write(
        ws.join("src").join("index.ts"),
        "export const handler = (context: unknown, inputs: { value: string }) => inputs.value;\n",
    )
    .unwrap();
    ws
}

/// Writes a PowerShell module action whose manifest requires two modules.
pub fn powershell_module_workspace(root: &Path) -> PathBuf {
    let ws = powershell_workspace(root);
    fs::write(
        ws.join("Greeter.psd1"),
        r#"@{
    RootModule = 'handler.ps1'
    ModuleVersion = '1.0.0'
    RequiredModules = @(
        'Az.Accounts',
        @{ ModuleName = 'Pester'; RequiredVersion = '5.5.0' }
    )
}
"#,
    )
    .unwrap();
    ws
}

/// Writes a Python action declaring dependencies only in `pyproject.toml`.
pub fn pyproject_workspace(root: &Path) -> PathBuf {
    let ws = root.join("pyproject-action");
    fs::create_dir_all(&ws).unwrap();
    fs::write(
        ws.join("pyproject.toml"),
        "[project]\nname = \"sum\"\nversion = \"0.1.0\"\ndependencies = [\"requests>=2.31\", \"click\"]\n",
    )
    .unwrap();
    fs::write(ws.join("main.py"), "import requests\n\ndef handler(context, inputs):\n    return 1\n").unwrap();
    ws
}

/// Writes an executable shell script standing in for a real tool.
#[cfg(unix)]
pub fn stub_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// npm stand-in that installs `left-pad` into `./node_modules`.
#[cfg(unix)]
pub fn stub_npm(dir: &Path) -> PathBuf {
    stub_tool(
        dir,
        "npm",
        r#"echo "added 1 package ($*)"
mkdir -p node_modules/left-pad
printf 'module.exports = function (s) { return s; };\n' > node_modules/left-pad/index.js"#,
    )
}

/// npm stand-in failing the way a missing package does.
#[cfg(unix)]
pub fn failing_npm(dir: &Path) -> PathBuf {
    stub_tool(
        dir,
        "npm",
        r#"echo "npm ERR! 404 Not Found - GET https://registry.npmjs.org/left-pad-does-not-exist" >&2
exit 1"#,
    )
}

/// npm stand-in recording its arguments to `log` before installing `left-pad`.
#[cfg(unix)]
pub fn recording_npm(dir: &Path, log: &Path) -> PathBuf {
    stub_tool(
        dir,
        "npm",
        &format!(
            r#"echo "$*" >> '{}'
mkdir -p node_modules/left-pad
printf 'module.exports = function (s) {{ return s; }};\n' > node_modules/left-pad/index.js"#,
            log.display()
        ),
    )
}

/// tsc stand-in writing `index.js` into the `--outDir` it is given.
#[cfg(unix)]
pub fn stub_tsc(dir: &Path) -> PathBuf {
    stub_tool(
        dir,
        "tsc",
        r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--outDir" ]; then out="$2"; fi
  shift
done
mkdir -p "$out"
printf 'exports.handler = (context, inputs) => inputs.value;\n' > "$out/index.js""#,
    )
}

/// tsc stand-in reporting a type error.
#[cfg(unix)]
pub fn failing_tsc(dir: &Path) -> PathBuf {
    stub_tool(
        dir,
        "tsc",
        r#"echo "src/index.ts(1,14): error TS2304: Cannot find name 'contxt'." >&2
exit 2"#,
    )
}

/// pwsh stand-in that records the `-Command` script to `log` and creates one
/// directory per `Save-Module -Name ... -Path ...` it contains.
#[cfg(unix)]
pub fn stub_pwsh(dir: &Path, log: &Path) -> PathBuf {
    stub_tool(
        dir,
        "pwsh",
        &format!(
            r#"script=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-Command" ]; then script="$2"; fi
  shift
done
printf '%s\n' "$script" > '{}'
printf '%s\n' "$script" | tr ';' '\n' \
  | sed -n "s/.*-Name '\([^']*\)' -Path '\([^']*\)'.*/\2\/\1/p" \
  | while read -r module; do
      mkdir -p "$module"
      echo '@{{}}' > "$module/$(basename "$module").psd1"
    done"#,
            log.display()
        ),
    )
}

/// Python stand-in recording its arguments to `log`, then behaving like [`stub_python`].
#[cfg(unix)]
pub fn recording_python(dir: &Path, log: &Path) -> PathBuf {
    stub_tool(
        dir,
        "python3",
        &format!(
            r#"echo "$*" >> '{}'
target=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--target" ]; then target="$2"; fi
  shift
done
mkdir -p "$target/requests"
printf '__version__ = "2.31.0"\n' > "$target/requests/__init__.py""#,
            log.display()
        ),
    )
}

/// Python stand-in whose `-m pip install --target DIR` creates a `requests` package.
#[cfg(unix)]
pub fn stub_python(dir: &Path) -> PathBuf {
    stub_tool(
        dir,
        "python3",
        r#"target=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--target" ]; then target="$2"; fi
  shift
done
mkdir -p "$target/requests"
printf '__version__ = "2.31.0"\n' > "$target/requests/__init__.py""#,
    )
}

/// Entry names of a zip archive, in archive order.
pub fn archive_listing(path: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}
