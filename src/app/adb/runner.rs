use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::app::error::AppError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A shell command line plus the environment it runs in.
#[derive(Debug, Clone)]
pub struct ShellInvocation {
    pub command_line: String,
    pub working_dir: PathBuf,
    /// Directories placed in front of the inherited `PATH`, in order.
    pub search_path_prepend: Vec<PathBuf>,
    pub envs: Vec<(String, OsString)>,
}

fn search_path(prepend: &[PathBuf]) -> Option<OsString> {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let entries = prepend
        .iter()
        .cloned()
        .chain(std::env::split_paths(&inherited));
    std::env::join_paths(entries).ok()
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    use std::os::windows::process::CommandExt;

    let mut command = std::process::Command::new("cmd.exe");
    // /S keeps cmd from stripping our quotes unpredictably.
    command
        .arg("/S")
        .arg("/C")
        .raw_arg(format!("\"{command_line}\""));
    Command::from(command)
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

/// Spawns the line through the platform shell and waits for it. Both pipes are
/// drained concurrently by `output()`, so chatty tools cannot block on a full pipe.
pub async fn run_shell_line(
    invocation: &ShellInvocation,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut command = shell_command(&invocation.command_line);
    command
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(path) = search_path(&invocation.search_path_prepend) {
        command.env("PATH", path);
    }
    for (key, value) in &invocation.envs {
        command.env(key, value);
    }

    let output = command
        .output()
        .await
        .map_err(|err| AppError::system(format!("Failed to spawn command: {err}"), trace_id))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(command_line: &str) -> ShellInvocation {
        ShellInvocation {
            command_line: command_line.to_string(),
            working_dir: std::env::temp_dir(),
            search_path_prepend: Vec::new(),
            envs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn does_not_deadlock_on_large_stdout() {
        let line = if cfg!(windows) {
            "for /L %i in (1,1,100000) do @echo 1234567890"
        } else {
            "i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done"
        };
        let output = run_shell_line(&invocation(line), "test-trace-large-output")
            .await
            .expect("expected large-output command to complete");
        assert!(output.success());
        assert!(output.stdout.len() >= 1_000_000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_streams_and_exit_code_separately() {
        let output = run_shell_line(&invocation("echo out; echo err 1>&2; exit 3"), "t")
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn prepends_search_path_and_sets_env() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = invocation("echo \"$PATH\"; echo \"$SP_MARKER\"");
        shell.search_path_prepend = vec![dir.path().to_path_buf()];
        shell.envs = vec![("SP_MARKER".to_string(), OsString::from("yes"))];
        let output = run_shell_line(&shell, "t").await.unwrap();
        let mut lines = output.stdout.lines();
        let path_line = lines.next().unwrap_or_default();
        assert!(path_line.starts_with(&dir.path().display().to_string()));
        assert_eq!(lines.next(), Some("yes"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = invocation("pwd");
        shell.working_dir = dir.path().to_path_buf();
        let output = run_shell_line(&shell, "t").await.unwrap();
        let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }
}
