use serde::Serialize;
use tracing::{info, warn};

use crate::app::adb::bridge::CommandBridge;
use crate::app::adb::parse::{parse_adb_version, parse_scrcpy_version};
use crate::app::config::{Preferences, PREF_ADB_VERSION, PREF_SCRCPY_VERSION};
use crate::app::error::{AppError, ParseError};
use crate::app::models::ToolVersions;

#[derive(Debug, Clone, Serialize)]
pub struct ToolCheckReport {
    pub versions: ToolVersions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AppError>,
    /// What the user should look at: `ADB`, `SCRCPY`, `PATH configuration`,
    /// or `SCRCPY or ADB` when the message names none of them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicated: Option<String>,
}

impl ToolCheckReport {
    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// Versions remembered from the last successful check.
pub fn cached_versions(prefs: &Preferences) -> ToolVersions {
    let read = |key: &str| Some(prefs.get(key).to_string()).filter(|value| !value.is_empty());
    ToolVersions {
        adb: read(PREF_ADB_VERSION),
        scrcpy: read(PREF_SCRCPY_VERSION),
    }
}

pub fn implicated_tool(err: &AppError) -> &'static str {
    if let Some(hint) = err.hint.as_deref().filter(|_| err.is_tool_not_found()) {
        if hint.starts_with("ADB") {
            return "ADB";
        }
        if hint.starts_with("SCRCPY") {
            return "SCRCPY";
        }
    }
    let lowered = err.error.to_lowercase();
    if lowered.contains("scrcpy") {
        "SCRCPY"
    } else if lowered.contains("adb") {
        "ADB"
    } else if lowered.contains("path") {
        "PATH configuration"
    } else {
        "SCRCPY or ADB"
    }
}

async fn probe<B: CommandBridge + ?Sized>(
    bridge: &B,
    command: &str,
    tool: &str,
    parse: fn(&str) -> Result<String, ParseError>,
    trace_id: &str,
) -> Result<String, AppError> {
    let output = bridge.run_generic(command, trace_id).await?;
    parse(&output)
        .map_err(|err| AppError::process(format!("Unable to parse {tool} version: {err}"), None, trace_id))
}

/// `adb --version` first, then `scrcpy --version`; stops at the first failure.
/// Successful values are cached in `prefs`.
pub async fn check_tool_versions<B: CommandBridge + ?Sized>(
    bridge: &B,
    prefs: &mut Preferences,
    trace_id: &str,
) -> ToolCheckReport {
    let mut report = ToolCheckReport {
        versions: cached_versions(prefs),
        error: None,
        implicated: None,
    };

    let steps: [(&str, &str, &str, fn(&str) -> Result<String, ParseError>); 2] = [
        ("adb --version", "ADB", PREF_ADB_VERSION, parse_adb_version),
        ("scrcpy --version", "scrcpy", PREF_SCRCPY_VERSION, parse_scrcpy_version),
    ];
    for (command, tool, key, parse) in steps {
        match probe(bridge, command, tool, parse, trace_id).await {
            Ok(version) => {
                info!(trace_id = %trace_id, tool = %tool, version = %version, "tool version detected");
                prefs.set(key, version.clone());
                if key == PREF_ADB_VERSION {
                    report.versions.adb = Some(version);
                } else {
                    report.versions.scrcpy = Some(version);
                }
            }
            Err(err) => {
                warn!(trace_id = %trace_id, tool = %tool, error = %err.error, "tool version check failed");
                report.implicated = Some(implicated_tool(&err).to_string());
                report.error = Some(err);
                break;
            }
        }
    }
    report
}
