use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::app::adb::locator::{resolve, OsFamily, PackagingMode, BRIDGE_TOOL};
use crate::app::adb::paths::{quote_device_arg, quote_host_arg, validate_device_path};
use crate::app::adb::runner::{run_shell_line, CommandOutput, ShellInvocation};
use crate::app::config::{config_path, AppConfig};
use crate::app::error::AppError;
use crate::app::models::{CommandResult, ResolvedToolPaths};

/// The four operations the UI side may request. Nothing else crosses over.
#[async_trait]
pub trait CommandBridge: Send + Sync {
    async fn run_generic(&self, command_line: &str, trace_id: &str) -> CommandResult;

    async fn run_on_device_shell(&self, shell_command: &str, trace_id: &str) -> CommandResult;

    async fn download_path(&self, remote_path: &str, trace_id: &str) -> CommandResult;

    async fn delete_path(&self, remote_path: &str, trace_id: &str) -> CommandResult;
}

/// Replaces a leading `adb` token with the quoted absolute path. Any other line
/// is returned untouched.
pub fn rewrite_command_line<'a>(command_line: &'a str, bridge_executable: &Path) -> Cow<'a, str> {
    let Some(rest) = command_line.strip_prefix(BRIDGE_TOOL) else {
        return Cow::Borrowed(command_line);
    };
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Cow::Borrowed(command_line);
    }
    let program = quote_host_arg(&bridge_executable.display().to_string());
    Cow::Owned(format!("{program}{rest}"))
}

pub fn device_shell_command_line(shell_command: &str) -> String {
    format!("adb shell {}", quote_host_arg(shell_command))
}

pub fn pull_command_line(remote_path: &str, local_dir: &Path) -> String {
    format!(
        "adb pull {} {}",
        quote_host_arg(remote_path),
        quote_host_arg(&local_dir.display().to_string())
    )
}

pub fn delete_shell_command(remote_path: &str) -> String {
    format!("rm -r {}", quote_device_arg(remote_path))
}

fn failure_message(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    let stdout = output.stdout.trim();
    if !stderr.is_empty() {
        stderr.to_string()
    } else if !stdout.is_empty() {
        stdout.to_string()
    } else {
        match output.exit_code {
            Some(code) => format!("Command exited with code {code}"),
            None => "Command terminated by signal".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionBridge {
    mode: PackagingMode,
    os: OsFamily,
    download_dir: PathBuf,
}

impl ExecutionBridge {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_layout(
            PackagingMode::detect(config),
            OsFamily::current(),
            config.download_dir(),
        )
    }

    pub fn with_layout(mode: PackagingMode, os: OsFamily, download_dir: PathBuf) -> Self {
        Self {
            mode,
            os,
            download_dir,
        }
    }

    pub fn tool_paths(&self) -> ResolvedToolPaths {
        resolve(&self.mode, self.os)
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Checked on every call: tools may be removed or replaced while we run.
    fn ensure_tools(&self, trace_id: &str) -> Result<ResolvedToolPaths, AppError> {
        let paths = self.tool_paths();
        let settings_hint = format!(
            "Reinstall the application, or set bridge.resources_dir in {}",
            config_path().display()
        );
        if !paths.mirror_executable.is_file() {
            return Err(AppError::tool_not_found(
                format!(
                    "Scrcpy path not found: {}",
                    paths.mirror_executable.display()
                ),
                format!("SCRCPY is missing. {settings_hint}"),
                trace_id,
            ));
        }
        if !paths.bridge_executable.is_file() {
            return Err(AppError::tool_not_found(
                format!(
                    "ADB executable not found: {}",
                    paths.bridge_executable.display()
                ),
                format!("ADB is missing. {settings_hint}"),
                trace_id,
            ));
        }
        Ok(paths)
    }

    fn invocation(&self, command_line: String, paths: &ResolvedToolPaths) -> ShellInvocation {
        let bridge_dir = paths
            .bridge_executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut search_path_prepend = vec![bridge_dir.clone()];
        if let Some(mirror_dir) = paths.mirror_executable.parent() {
            search_path_prepend.push(mirror_dir.to_path_buf());
        }
        ShellInvocation {
            command_line,
            working_dir: bridge_dir,
            search_path_prepend,
            // scrcpy looks up adb through this variable.
            envs: vec![(
                "ADB".to_string(),
                OsString::from(paths.bridge_executable.as_os_str()),
            )],
        }
    }

    async fn execute(&self, command_line: &str, trace_id: &str) -> CommandResult {
        let paths = self.ensure_tools(trace_id)?;
        self.execute_with(command_line, &paths, trace_id).await
    }

    async fn execute_with(
        &self,
        command_line: &str,
        paths: &ResolvedToolPaths,
        trace_id: &str,
    ) -> CommandResult {
        if command_line.trim().is_empty() {
            return Err(AppError::validation("command is required", trace_id));
        }
        let rewritten = rewrite_command_line(command_line, &paths.bridge_executable);
        let invocation = self.invocation(rewritten.into_owned(), paths);
        info!(
            trace_id = %trace_id,
            command = %invocation.command_line,
            cwd = %invocation.working_dir.display(),
            "executing command"
        );

        let output = run_shell_line(&invocation, trace_id).await?;
        if !output.success() {
            let message = failure_message(&output);
            warn!(
                trace_id = %trace_id,
                exit_code = ?output.exit_code,
                error = %message,
                "command failed"
            );
            return Err(AppError::process(message, output.exit_code, trace_id));
        }
        if !output.stderr.trim().is_empty() {
            warn!(trace_id = %trace_id, stderr = %output.stderr.trim(), "command stderr");
        }
        debug!(trace_id = %trace_id, stdout = %output.stdout.trim(), "command stdout");
        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl CommandBridge for ExecutionBridge {
    async fn run_generic(&self, command_line: &str, trace_id: &str) -> CommandResult {
        self.execute(command_line, trace_id).await
    }

    async fn run_on_device_shell(&self, shell_command: &str, trace_id: &str) -> CommandResult {
        let paths = self.ensure_tools(trace_id)?;
        if shell_command.trim().is_empty() {
            return Err(AppError::validation("shell command is required", trace_id));
        }
        self.execute_with(&device_shell_command_line(shell_command), &paths, trace_id)
            .await
    }

    async fn download_path(&self, remote_path: &str, trace_id: &str) -> CommandResult {
        let paths = self.ensure_tools(trace_id)?;
        validate_device_path(remote_path)
            .map_err(|message| AppError::validation(message, trace_id))?;
        let line = pull_command_line(remote_path.trim(), &self.download_dir);
        self.execute_with(&line, &paths, trace_id).await
    }

    async fn delete_path(&self, remote_path: &str, trace_id: &str) -> CommandResult {
        let paths = self.ensure_tools(trace_id)?;
        validate_device_path(remote_path)
            .map_err(|message| AppError::validation(message, trace_id))?;
        let shell = delete_shell_command(remote_path.trim());
        self.execute_with(&device_shell_command_line(&shell), &paths, trace_id)
            .await
    }
}
