use std::path::{Path, PathBuf};

use crate::app::config::AppConfig;
use crate::app::models::ResolvedToolPaths;

const RESOURCES_DIR: &str = "resources";
const BRIDGE_TOOL_DIR: &str = "platform-tools";
const MIRROR_TOOL_DIR: &str = "scrcpy";
pub const BRIDGE_TOOL: &str = "adb";
pub const MIRROR_TOOL: &str = "scrcpy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Unix,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub fn executable_name(self, stem: &str) -> String {
        match self {
            Self::Windows => format!("{stem}.exe"),
            Self::Unix => stem.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackagingMode {
    /// Installed build: tools live in the extracted resources next to the binary.
    Packaged { resources_root: PathBuf },
    /// Source checkout: tools live under the build root.
    Development { build_root: PathBuf },
}

impl PackagingMode {
    pub fn detect(config: &AppConfig) -> Self {
        let configured = normalize_command_path(&config.bridge.resources_dir);
        if !configured.is_empty() {
            return Self::Packaged {
                resources_root: PathBuf::from(configured),
            };
        }
        if cfg!(debug_assertions) {
            return Self::Development {
                build_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
            };
        }
        let resources_root = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::Packaged { resources_root }
    }

    fn resources_dir(&self) -> PathBuf {
        match self {
            Self::Packaged { resources_root } => resources_root.join(RESOURCES_DIR),
            Self::Development { build_root } => build_root.join(RESOURCES_DIR),
        }
    }
}

pub fn resolve(mode: &PackagingMode, os: OsFamily) -> ResolvedToolPaths {
    let resources = mode.resources_dir();
    ResolvedToolPaths {
        bridge_executable: resources
            .join(BRIDGE_TOOL_DIR)
            .join(os.executable_name(BRIDGE_TOOL)),
        mirror_executable: resources
            .join(MIRROR_TOOL_DIR)
            .join(os.executable_name(MIRROR_TOOL)),
    }
}

pub fn normalize_command_path(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|candidate| candidate.strip_suffix('"'))
    {
        return inner.trim().to_string();
    }
    if let Some(inner) = trimmed
        .strip_prefix('\'')
        .and_then(|candidate| candidate.strip_suffix('\''))
    {
        return inner.trim().to_string();
    }
    trimmed.to_string()
}
