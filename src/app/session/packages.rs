use futures::try_join;
use tracing::{info, warn};

use crate::app::adb::apps::{merge_disabled, parse_pm_list_packages_output, pm_failure_reason};
use crate::app::adb::bridge::CommandBridge;
use crate::app::error::AppError;
use crate::app::models::{new_trace_id, InstalledPackage};

pub fn validate_package_id(id: &str) -> Result<(), String> {
    let id = id.trim();
    if id.is_empty() {
        return Err("package id is required".to_string());
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_')
    {
        return Err(format!("invalid package id: {id}"));
    }
    Ok(())
}

/// `-s` lists system packages, `-3` third-party ones. The disabled list is
/// fetched alongside and matched by id.
pub async fn list_packages<B: CommandBridge + ?Sized>(
    bridge: &B,
    include_system: bool,
    trace_id: &str,
) -> Result<Vec<InstalledPackage>, AppError> {
    let scope = if include_system { "-s" } else { "-3" };
    let scoped_cmd = format!("pm list packages {scope}");
    let (installed, disabled) = try_join!(
        bridge.run_on_device_shell(&scoped_cmd, trace_id),
        bridge.run_on_device_shell("pm list packages -d", trace_id),
    )?;
    let mut ids = parse_pm_list_packages_output(&installed);
    ids.sort();
    ids.dedup();
    Ok(merge_disabled(ids, &parse_pm_list_packages_output(&disabled)))
}

/// Runs one `pm` subcommand; a `Failure [...]` line counts as a failed run.
async fn run_pm<B: CommandBridge + ?Sized>(
    bridge: &B,
    action: &str,
    id: &str,
    trace_id: &str,
) -> Result<String, AppError> {
    validate_package_id(id).map_err(|msg| AppError::validation(msg, trace_id))?;
    let output = bridge
        .run_on_device_shell(&format!("pm {action} {}", id.trim()), trace_id)
        .await?;
    if let Some(reason) = pm_failure_reason(&output) {
        return Err(AppError::process(reason, None, trace_id));
    }
    Ok(output)
}

#[derive(Debug, Clone, Default)]
pub struct PackageInventory {
    packages: Vec<InstalledPackage>,
    include_system: bool,
    selected: Option<String>,
    notice: Option<String>,
}

impl PackageInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packages(&self) -> &[InstalledPackage] {
        &self.packages
    }

    pub fn include_system(&self) -> bool {
        self.include_system
    }

    pub fn selected(&self) -> Option<&InstalledPackage> {
        let id = self.selected.as_deref()?;
        self.find(id)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn find(&self, id: &str) -> Option<&InstalledPackage> {
        self.packages.iter().find(|package| package.id == id)
    }

    pub fn select(&mut self, id: &str) -> bool {
        if self.find(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    /// Replaces the list wholesale and drops the selection, even on failure.
    pub async fn rebuild<B: CommandBridge + ?Sized>(
        &mut self,
        bridge: &B,
        include_system: bool,
    ) -> Result<usize, AppError> {
        let trace_id = new_trace_id();
        self.include_system = include_system;
        self.selected = None;
        self.packages.clear();
        let packages = list_packages(bridge, include_system, &trace_id).await?;
        info!(trace_id = %trace_id, count = packages.len(), include_system, "package list rebuilt");
        self.packages = packages;
        Ok(self.packages.len())
    }

    pub async fn uninstall<B: CommandBridge + ?Sized>(
        &mut self,
        bridge: &B,
        id: &str,
    ) -> Result<String, AppError> {
        let trace_id = new_trace_id();
        let output = self
            .report(run_pm(bridge, "uninstall", id, &trace_id).await, || {
                format!("Successfully uninstalled {id}")
            })?;
        self.refresh_after_change(bridge, &trace_id).await;
        Ok(output)
    }

    /// Enables a disabled package, disables an enabled one. Returns whether
    /// the package is disabled afterwards.
    pub async fn toggle_disable<B: CommandBridge + ?Sized>(
        &mut self,
        bridge: &B,
        id: &str,
    ) -> Result<bool, AppError> {
        let trace_id = new_trace_id();
        let Some(package) = self.find(id) else {
            return Err(AppError::validation(format!("Unknown package: {id}"), &trace_id));
        };
        let (action, now_disabled) = if package.disabled {
            ("enable", false)
        } else {
            ("disable-user", true)
        };
        self.report(run_pm(bridge, action, id, &trace_id).await, || {
            if now_disabled {
                format!("Successfully disabled {id}")
            } else {
                format!("Successfully enabled {id}")
            }
        })?;
        self.refresh_after_change(bridge, &trace_id).await;
        Ok(now_disabled)
    }

    fn report(
        &mut self,
        result: Result<String, AppError>,
        success: impl FnOnce() -> String,
    ) -> Result<String, AppError> {
        match result {
            Ok(output) => {
                self.notice = Some(success());
                Ok(output)
            }
            Err(err) => {
                self.notice = Some(err.error.clone());
                Err(err)
            }
        }
    }

    async fn refresh_after_change<B: CommandBridge + ?Sized>(&mut self, bridge: &B, trace_id: &str) {
        let include_system = self.include_system;
        if let Err(err) = self.rebuild(bridge, include_system).await {
            warn!(trace_id = %trace_id, error = %err.error, "package list refresh failed");
        }
    }
}
