use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::adb::bridge::ExecutionBridge;
use crate::app::commands::IpcClient;
use crate::app::config::{load_config, preferences_path, AppConfig, Preferences};
use crate::app::error::AppError;

/// Everything built once at startup. Dropped through [`AppState::shutdown`].
pub struct AppState {
    pub config: AppConfig,
    pub bridge: Arc<ExecutionBridge>,
    pub preferences: Preferences,
}

impl AppState {
    pub fn new(config: AppConfig, preferences: Preferences) -> Self {
        let bridge = Arc::new(ExecutionBridge::new(&config));
        Self {
            config,
            bridge,
            preferences,
        }
    }

    pub fn load(trace_id: &str) -> Result<Self, AppError> {
        let config = load_config(trace_id)?;
        Ok(Self::with_config(config, trace_id))
    }

    /// Reads preferences from their default location.
    pub fn with_config(config: AppConfig, trace_id: &str) -> Self {
        let state = Self::new(config, load_preferences(&preferences_path(), trace_id));
        let paths = state.bridge.tool_paths();
        info!(
            trace_id = %trace_id,
            adb = %paths.bridge_executable.display(),
            scrcpy = %paths.mirror_executable.display(),
            "resolved tool paths"
        );
        state
    }

    /// A handle for the untrusted side of the boundary.
    pub fn client(&self) -> IpcClient<ExecutionBridge> {
        IpcClient::new(Arc::clone(&self.bridge))
    }

    pub fn shutdown(mut self, trace_id: &str) -> Result<(), AppError> {
        if self.preferences.is_dirty() {
            self.preferences.save(trace_id)?;
            if !self.preferences.is_dirty() {
                info!(trace_id = %trace_id, "preferences saved");
            }
        }
        Ok(())
    }
}

/// An unreadable file is logged and replaced by an empty store at the same
/// path, so the next change rewrites it.
fn load_preferences(path: &Path, trace_id: &str) -> Preferences {
    match Preferences::load(path, trace_id) {
        Ok(preferences) => preferences,
        Err(err) => {
            warn!(
                trace_id = %trace_id,
                path = %path.display(),
                error = %err.error,
                "preferences unreadable, starting empty"
            );
            Preferences::empty_at(path)
        }
    }
}
