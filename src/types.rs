use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use serde::Deserialize;

/// Target platform, used for install-rule filters and toolchain defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// Platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Linux
        }
    }

    pub fn is_windows(self) -> bool {
        matches!(self, Platform::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        };
        f.write_str(s)
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" | "osx" => Ok(Platform::Macos),
            "windows" | "win32" | "win64" => Ok(Platform::Windows),
            other => Err(format!(
                "invalid platform: {other} (expected \"linux\", \"macos\" or \"windows\")"
            )),
        }
    }
}

/// Result of stat'ing a file: size and last-modified time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub size: u64,
    pub modified: SystemTime,
}

/// Which of the two worker pools a task belongs to (or `Link` / `Install`,
/// which never go through a pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Compile,
    Link,
    Generate,
    Install,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Compile => "compile",
            TaskKind::Link => "link",
            TaskKind::Generate => "generate",
            TaskKind::Install => "install",
        };
        f.write_str(s)
    }
}
