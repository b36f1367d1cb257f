//! The privilege boundary. Untrusted callers reach the bridge only through
//! the four named channels below; any other name is rejected before the
//! bridge is touched.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::adb::bridge::CommandBridge;
use crate::app::error::AppError;
use crate::app::models::{resolve_trace_id, CommandResponse, CommandResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ExecuteCommand,
    ShellCommand,
    DownloadFile,
    DeleteFile,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ExecuteCommand,
        Capability::ShellCommand,
        Capability::DownloadFile,
        Capability::DeleteFile,
    ];

    pub fn channel(self) -> &'static str {
        match self {
            Capability::ExecuteCommand => "execute-command",
            Capability::ShellCommand => "shell-command",
            Capability::DownloadFile => "download-file",
            Capability::DeleteFile => "delete-file",
        }
    }

    pub fn from_channel(channel: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|capability| capability.channel() == channel)
    }

    fn payload_field(self) -> &'static str {
        match self {
            Capability::ExecuteCommand => "command",
            Capability::ShellCommand => "shell_command",
            Capability::DownloadFile | Capability::DeleteFile => "remote_path",
        }
    }
}

/// One message from the untrusted side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcRequest {
    pub channel: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub trace_id: Option<String>,
}

impl IpcRequest {
    pub fn new(capability: Capability, payload: impl Into<String>, trace_id: Option<String>) -> Self {
        Self {
            channel: capability.channel().to_string(),
            payload: payload.into(),
            trace_id,
        }
    }
}

fn ensure_non_empty(value: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(
            format!("{field} is required"),
            trace_id,
        ));
    }
    Ok(())
}

pub async fn invoke<B: CommandBridge + ?Sized>(
    host: &B,
    request: IpcRequest,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(request.trace_id);
    let Some(capability) = Capability::from_channel(&request.channel) else {
        warn!(trace_id = %trace_id, channel = %request.channel, "rejected channel");
        return Err(AppError::channel_rejected(&request.channel, &trace_id));
    };
    ensure_non_empty(&request.payload, capability.payload_field(), &trace_id)?;
    debug!(trace_id = %trace_id, channel = capability.channel(), "dispatching");

    let payload = request.payload.as_str();
    let data = match capability {
        Capability::ExecuteCommand => host.run_generic(payload, &trace_id).await?,
        Capability::ShellCommand => host.run_on_device_shell(payload, &trace_id).await?,
        Capability::DownloadFile => host.download_path(payload, &trace_id).await?,
        Capability::DeleteFile => host.delete_path(payload, &trace_id).await?,
    };
    Ok(CommandResponse { trace_id, data })
}

/// Accepts the wire form `{"channel": "...", "payload": "...", "trace_id": "..."}`.
pub async fn invoke_json<B: CommandBridge + ?Sized>(
    host: &B,
    raw: &str,
) -> Result<CommandResponse<String>, AppError> {
    let request: IpcRequest = serde_json::from_str(raw).map_err(|err| {
        AppError::validation(format!("Malformed request: {err}"), resolve_trace_id(None))
    })?;
    invoke(host, request).await
}

/// Untrusted-side handle. Implements [`CommandBridge`] by sending every call
/// through [`invoke`], so session code runs unchanged on either side.
pub struct IpcClient<B: ?Sized> {
    host: Arc<B>,
}

impl<B: CommandBridge + ?Sized> IpcClient<B> {
    pub fn new(host: Arc<B>) -> Self {
        Self { host }
    }

    async fn call(&self, capability: Capability, payload: &str, trace_id: &str) -> CommandResult {
        let request = IpcRequest::new(capability, payload, Some(trace_id.to_string()));
        invoke(self.host.as_ref(), request)
            .await
            .map(|response| response.data)
    }
}

impl<B: ?Sized> Clone for IpcClient<B> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
        }
    }
}

#[async_trait]
impl<B: CommandBridge + ?Sized> CommandBridge for IpcClient<B> {
    async fn run_generic(&self, command_line: &str, trace_id: &str) -> CommandResult {
        self.call(Capability::ExecuteCommand, command_line, trace_id)
            .await
    }

    async fn run_on_device_shell(&self, shell_command: &str, trace_id: &str) -> CommandResult {
        self.call(Capability::ShellCommand, shell_command, trace_id)
            .await
    }

    async fn download_path(&self, remote_path: &str, trace_id: &str) -> CommandResult {
        self.call(Capability::DownloadFile, remote_path, trace_id)
            .await
    }

    async fn delete_path(&self, remote_path: &str, trace_id: &str) -> CommandResult {
        self.call(Capability::DeleteFile, remote_path, trace_id)
            .await
    }
}

#[cfg(test)]
mod tests;
