use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

use crate::app::error::AppError;

/// Outcome of one bridge call: trimmed stdout, or a structured failure.
pub type CommandResult = Result<String, AppError>;

pub fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub fn new_trace_id() -> String {
    resolve_trace_id(None)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedToolPaths {
    pub bridge_executable: PathBuf,
    pub mirror_executable: PathBuf,
}

/// One line of `adb devices -l`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSummary {
    pub serial: String,
    pub state: String,
    pub model: Option<String>,
    pub product: Option<String>,
    pub transport_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    pub serial: String,
    pub connected: bool,
    pub properties: BTreeMap<String, String>,
    pub checked_at_ms: i64,
}

impl DeviceIdentity {
    pub fn disconnected(checked_at_ms: i64) -> Self {
        Self {
            checked_at_ms,
            ..Self::default()
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub ip: String,
    pub port: u16,
    /// mDNS instance name (first column of `adb mdns services`).
    pub label: String,
    pub service: Option<String>,
}

impl DiscoveredDevice {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstalledPackage {
    pub id: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ToolVersions {
    pub adb: Option<String>,
    pub scrcpy: Option<String>,
}
