use serde::Serialize;
use std::fmt;

pub const ERR_TOOL_NOT_FOUND: &str = "ERR_TOOL_NOT_FOUND";
pub const ERR_PROCESS: &str = "ERR_PROCESS";
pub const ERR_CHANNEL_REJECTED: &str = "ERR_CHANNEL_REJECTED";
pub const ERR_NO_DEVICE: &str = "ERR_NO_DEVICE";
pub const ERR_VALIDATION: &str = "ERR_VALIDATION";
pub const ERR_SYSTEM: &str = "ERR_SYSTEM";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppError {
    pub error: String,
    pub code: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            trace_id: trace_id.into(),
            exit_code: None,
            hint: None,
        }
    }

    pub fn validation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_VALIDATION, message, trace_id)
    }

    pub fn system(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_SYSTEM, message, trace_id)
    }

    /// A bundled executable is missing. The hint tells the user what to fix.
    pub fn tool_not_found(
        message: impl Into<String>,
        hint: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(ERR_TOOL_NOT_FOUND, message, trace_id);
        err.hint = Some(hint.into());
        err
    }

    /// The command ran but exited non-zero. `message` is the tool's own output.
    pub fn process(
        message: impl Into<String>,
        exit_code: Option<i32>,
        trace_id: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(ERR_PROCESS, message, trace_id);
        err.exit_code = exit_code;
        err
    }

    pub fn channel_rejected(channel: &str, trace_id: impl Into<String>) -> Self {
        Self::new(
            ERR_CHANNEL_REJECTED,
            format!("Invalid channel: {channel}"),
            trace_id,
        )
    }

    pub fn no_device(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_NO_DEVICE, message, trace_id)
    }

    pub fn is_tool_not_found(&self) -> bool {
        self.code == ERR_TOOL_NOT_FOUND
    }

    pub fn is_no_device(&self) -> bool {
        self.code == ERR_NO_DEVICE
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for AppError {}

/// Failure of a pure text parser over tool output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no version number found in output")]
    MissingVersion,

    #[error("expected ip:port, got {0:?}")]
    InvalidEndpoint(String),

    #[error("line has too few columns: {0:?}")]
    TooFewColumns(String),
}
