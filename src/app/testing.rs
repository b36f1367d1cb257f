use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::adb::bridge::CommandBridge;
use crate::app::error::AppError;
use crate::app::models::CommandResult;

type Handler = Box<dyn Fn(&str) -> CommandResult + Send + Sync>;

/// Scripted bridge. Every capability is flattened to a readable line
/// (`adb shell <cmd>`, `adb pull <path>`, `adb shell rm -r <path>`) that is
/// recorded and handed to the handler.
pub struct FakeBridge {
    calls: Mutex<Vec<String>>,
    handler: Handler,
}

impl FakeBridge {
    pub fn new(handler: impl Fn(&str) -> CommandResult + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn dispatch(&self, line: String) -> CommandResult {
        let result = (self.handler)(&line);
        self.calls.lock().expect("calls lock").push(line);
        result
    }
}

pub fn ok(stdout: &str) -> CommandResult {
    Ok(stdout.to_string())
}

pub fn process_failure(message: &str) -> CommandResult {
    Err(AppError::process(message, Some(1), "fake"))
}

#[async_trait]
impl CommandBridge for FakeBridge {
    async fn run_generic(&self, command_line: &str, _trace_id: &str) -> CommandResult {
        self.dispatch(command_line.to_string())
    }

    async fn run_on_device_shell(&self, shell_command: &str, _trace_id: &str) -> CommandResult {
        self.dispatch(format!("adb shell {shell_command}"))
    }

    async fn download_path(&self, remote_path: &str, _trace_id: &str) -> CommandResult {
        self.dispatch(format!("adb pull {remote_path}"))
    }

    async fn delete_path(&self, remote_path: &str, _trace_id: &str) -> CommandResult {
        self.dispatch(format!("adb shell rm -r {remote_path}"))
    }
}
