//! External programs invoked by the runtime strategies.

use std::ffi::OsString;

/// Programs the strategies shell out to.
///
/// Each entry is a program name resolved through `PATH` or a path to an
/// executable. Overriding an entry lets a caller substitute a compatible tool
/// (for example a pinned `npm` or a wrapper script).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    /// Node package manager, used for `npm ci` / `npm install`.
    pub npm: OsString,
    /// TypeScript compiler. A workspace-local `node_modules/.bin/tsc` wins when present.
    pub tsc: OsString,
    /// Python interpreter, run as `python -m pip`.
    pub python: OsString,
    /// PowerShell host, used for `Save-Module`.
    pub pwsh: OsString,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            npm: "npm".into(),
            tsc: "tsc".into(),
            python: if cfg!(windows) { "python" } else { "python3" }.into(),
            pwsh: "pwsh".into(),
        }
    }
}
