//! Runtime variants a workspace can be classified as.

use std::{fmt, str::FromStr};

/// Runtime of an action workspace.
///
/// `Unknown` is a legitimate detection outcome; the packager reports it as an
/// unsupported project type instead of falling back to a default runtime.
///
/// # Examples
///
/// ```
/// use polyglotpkg::packager::ActionType;
///
/// let runtime: ActionType = "python".parse().unwrap();
/// assert_eq!(runtime, ActionType::Python);
/// assert_eq!(runtime.to_string(), "python");
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Node.js, optionally TypeScript.
    #[serde(rename = "nodejs", alias = "node")]
    Node,
    /// Python 3.
    #[serde(alias = "python3")]
    Python,
    /// PowerShell (Core).
    #[serde(alias = "pwsh")]
    PowerShell,
    /// No supported runtime marker was found.
    Unknown,
}

impl ActionType {
    /// Runtimes the packager can build, in detection priority order.
    pub const SUPPORTED: [ActionType; 3] = [ActionType::Node, ActionType::Python, ActionType::PowerShell];

    /// Canonical runtime name used in manifests and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Node => "nodejs",
            ActionType::Python => "python",
            ActionType::PowerShell => "powershell",
            ActionType::Unknown => "unknown",
        }
    }

    /// Whether a strategy exists for this runtime.
    pub fn is_supported(&self) -> bool {
        !matches!(self, ActionType::Unknown)
    }

    /// Extension of entry-point source files in compiled output.
    pub fn entry_extension(&self) -> Option<&'static str> {
        match self {
            ActionType::Node => Some("js"),
            ActionType::Python => Some("py"),
            ActionType::PowerShell => Some("ps1"),
            ActionType::Unknown => None,
        }
    }

    /// Entrypoint used when the manifest does not declare one.
    pub fn default_entrypoint(&self) -> Option<&'static str> {
        match self {
            ActionType::Node => Some("index.handler"),
            ActionType::Python => Some("main.handler"),
            ActionType::PowerShell => Some("handler.handler"),
            ActionType::Unknown => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nodejs" | "node" => Ok(ActionType::Node),
            "python" | "python3" => Ok(ActionType::Python),
            "powershell" | "pwsh" => Ok(ActionType::PowerShell),
            other => Err(format!(
                "Unsupported runtime: {other}. Valid runtimes: nodejs, python, powershell"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("node".parse::<ActionType>().unwrap(), ActionType::Node);
        assert_eq!("Python3".parse::<ActionType>().unwrap(), ActionType::Python);
        assert_eq!("pwsh".parse::<ActionType>().unwrap(), ActionType::PowerShell);
        assert!("ruby".parse::<ActionType>().is_err());
        assert!("unknown".parse::<ActionType>().is_err());
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&ActionType::Node).unwrap();
        assert_eq!(json, "\"nodejs\"");
        let parsed: ActionType = serde_json::from_str("\"pwsh\"").unwrap();
        assert_eq!(parsed, ActionType::PowerShell);
    }
}
