use futures::future::join_all;
use tracing::{info, warn};

use crate::app::adb::bridge::CommandBridge;
use crate::app::adb::parse::{parse_connected_serials, parse_is_dir_probe, parse_ls_names};
use crate::app::adb::paths::{
    as_directory, device_breadcrumbs, device_parent_dir, join_device_path, quote_device_arg,
};
use crate::app::error::AppError;
use crate::app::models::{new_trace_id, FileEntry};

/// Back/forward stack. `cursor` always indexes a valid entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    stack: Vec<String>,
    cursor: usize,
}

impl NavigationHistory {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            stack: vec![start.into()],
            cursor: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.stack[self.cursor]
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Drops any forward entries, then appends.
    pub fn push(&mut self, path: impl Into<String>) {
        self.stack.truncate(self.cursor + 1);
        self.stack.push(path.into());
        self.cursor = self.stack.len() - 1;
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.stack.len()
    }

    pub fn back(&mut self) -> Option<&str> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    pub fn forward(&mut self) -> Option<&str> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }
}

async fn ensure_device_attached<B: CommandBridge + ?Sized>(
    bridge: &B,
    trace_id: &str,
) -> Result<(), AppError> {
    let output = bridge.run_generic("adb devices", trace_id).await?;
    if parse_connected_serials(&output).is_empty() {
        return Err(AppError::no_device("No devices connected", trace_id));
    }
    Ok(())
}

/// Lists `dir` and classifies every entry with its own `test -d` probe. The
/// probes run concurrently; results are matched back by position.
pub async fn list_directory<B: CommandBridge + ?Sized>(
    bridge: &B,
    dir: &str,
    trace_id: &str,
) -> Result<Vec<FileEntry>, AppError> {
    ensure_device_attached(bridge, trace_id).await?;

    let dir = as_directory(dir);
    let listing = bridge
        .run_on_device_shell(&format!("cd {} && ls -1A", quote_device_arg(&dir)), trace_id)
        .await?;
    let names = parse_ls_names(&listing);

    let probes = names.iter().map(|name| {
        let target = join_device_path(&dir, name, false);
        let command = format!(
            "test -d {} && echo true || echo false",
            quote_device_arg(&target)
        );
        async move { bridge.run_on_device_shell(&command, trace_id).await }
    });
    let results = join_all(probes).await;

    let mut directories = Vec::new();
    let mut files = Vec::new();
    for (name, result) in names.into_iter().zip(results) {
        let is_dir = match result {
            Ok(output) => parse_is_dir_probe(&output),
            Err(err) => {
                warn!(trace_id = %trace_id, entry = %name, error = %err.error, "type probe failed");
                false
            }
        };
        let entry = FileEntry {
            path: join_device_path(&dir, &name, is_dir),
            name,
            is_dir,
        };
        if is_dir {
            directories.push(entry);
        } else {
            files.push(entry);
        }
    }
    directories.extend(files);
    Ok(directories)
}

#[derive(Debug, Clone)]
pub struct FileNavigator {
    history: NavigationHistory,
    root: String,
    entries: Vec<FileEntry>,
    selected: Option<FileEntry>,
    error: Option<AppError>,
    notice: Option<String>,
}

impl FileNavigator {
    pub fn new(home: &str, root: &str) -> Self {
        Self {
            history: NavigationHistory::new(as_directory(home)),
            root: as_directory(root),
            entries: Vec::new(),
            selected: None,
            error: None,
            notice: None,
        }
    }

    pub fn current_path(&self) -> &str {
        self.history.current()
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&FileEntry> {
        self.selected.as_ref()
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    pub fn banner(&self) -> Option<&str> {
        self.error.as_ref().map(|err| err.error.as_str())
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn breadcrumbs(&self) -> Vec<(String, String)> {
        device_breadcrumbs(self.current_path())
    }

    /// Stops at the root, and at `/` for paths outside it.
    pub fn can_go_up(&self) -> bool {
        let current = self.current_path();
        current != self.root && device_parent_dir(current) != current
    }

    pub fn can_download(&self) -> bool {
        self.selected.is_some()
    }

    pub fn can_delete(&self) -> bool {
        self.selected.is_some()
    }

    /// Failures empty the listing and become the banner; they never propagate.
    async fn load<B: CommandBridge + ?Sized>(&mut self, bridge: &B) {
        let trace_id = new_trace_id();
        let path = self.current_path().to_string();
        self.entries.clear();
        match list_directory(bridge, &path, &trace_id).await {
            Ok(entries) => {
                info!(trace_id = %trace_id, path = %path, count = entries.len(), "directory loaded");
                self.entries = entries;
                self.error = None;
            }
            Err(err) => {
                warn!(trace_id = %trace_id, path = %path, error = %err.error, "directory load failed");
                self.error = Some(err);
            }
        }
    }

    pub async fn reload<B: CommandBridge + ?Sized>(&mut self, bridge: &B) {
        self.load(bridge).await;
    }

    pub async fn navigate<B: CommandBridge + ?Sized>(&mut self, bridge: &B, path: &str) {
        self.history.push(as_directory(path));
        self.selected = None;
        self.load(bridge).await;
    }

    pub async fn back<B: CommandBridge + ?Sized>(&mut self, bridge: &B) -> bool {
        if self.history.back().is_none() {
            return false;
        }
        self.selected = None;
        self.load(bridge).await;
        true
    }

    pub async fn forward<B: CommandBridge + ?Sized>(&mut self, bridge: &B) -> bool {
        if self.history.forward().is_none() {
            return false;
        }
        self.selected = None;
        self.load(bridge).await;
        true
    }

    pub async fn up<B: CommandBridge + ?Sized>(&mut self, bridge: &B) -> bool {
        if !self.can_go_up() {
            return false;
        }
        let parent = device_parent_dir(self.current_path());
        self.navigate(bridge, &parent).await;
        true
    }

    /// Directories are entered; files become the selection.
    pub async fn open<B: CommandBridge + ?Sized>(&mut self, bridge: &B, entry: &FileEntry) {
        if entry.is_dir {
            self.navigate(bridge, &entry.path).await;
        } else {
            self.select(entry);
        }
    }

    pub fn select(&mut self, entry: &FileEntry) -> bool {
        if entry.is_dir {
            return false;
        }
        self.selected = Some(entry.clone());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub async fn download_selected<B: CommandBridge + ?Sized>(
        &mut self,
        bridge: &B,
    ) -> Result<String, AppError> {
        let trace_id = new_trace_id();
        let Some(entry) = self.selected.clone() else {
            return Err(AppError::validation("No file selected", &trace_id));
        };
        match bridge.download_path(&entry.path, &trace_id).await {
            Ok(output) => {
                self.notice = Some("File downloaded successfully".to_string());
                Ok(output)
            }
            Err(err) => {
                self.notice = Some(err.error.clone());
                Err(err)
            }
        }
    }

    pub async fn delete_selected<B: CommandBridge + ?Sized>(
        &mut self,
        bridge: &B,
    ) -> Result<String, AppError> {
        let trace_id = new_trace_id();
        let Some(entry) = self.selected.clone() else {
            return Err(AppError::validation("No file selected", &trace_id));
        };
        match bridge.delete_path(&entry.path, &trace_id).await {
            Ok(output) => {
                self.selected = None;
                self.notice = Some(format!("Deleted {}", entry.name));
                self.load(bridge).await;
                Ok(output)
            }
            Err(err) => {
                self.notice = Some(err.error.clone());
                Err(err)
            }
        }
    }
}
