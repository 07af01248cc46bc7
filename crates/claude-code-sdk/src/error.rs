use std::path::PathBuf;

use thiserror::Error;

/// How many characters of an undecodable line appear in the error message.
const DECODE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum ClaudeSdkError {
    /// The subprocess could not be started, or the transport was used while
    /// not connected.
    #[error("{0}")]
    CliConnection(String),

    /// No `claude` executable could be located. A connection failure.
    #[error("{}", not_found_display(.message, .cli_path.as_ref()))]
    CliNotFound {
        message: String,
        cli_path: Option<PathBuf>,
    },

    /// The subprocess exited with a non-zero status.
    #[error("{}", process_display(.exit_code, .stderr))]
    Process { exit_code: i32, stderr: String },

    /// A stdout line that looks like JSON failed to parse. `line` keeps the
    /// full text; only the message is truncated.
    #[error("Failed to decode JSON: {}...", preview(.line))]
    JsonDecode {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClaudeSdkError {
    pub(crate) fn not_found(message: impl Into<String>, cli_path: Option<PathBuf>) -> Self {
        ClaudeSdkError::CliNotFound {
            message: message.into(),
            cli_path,
        }
    }

    /// True for failures to start or reach the subprocess, including a
    /// missing binary.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClaudeSdkError::CliConnection(_) | ClaudeSdkError::CliNotFound { .. }
        )
    }

    /// Exit code of a failed subprocess, if this is a process failure.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ClaudeSdkError::Process { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

fn not_found_display(message: &str, cli_path: Option<&PathBuf>) -> String {
    match cli_path {
        Some(path) => format!("{message}: {}", path.display()),
        None => message.to_owned(),
    }
}

fn process_display(exit_code: &i32, stderr: &str) -> String {
    if stderr.is_empty() {
        format!("CLI process failed (exit code: {exit_code})")
    } else {
        format!("CLI process failed (exit code: {exit_code})\nError output: {stderr}")
    }
}

fn preview(line: &str) -> String {
    line.chars().take(DECODE_PREVIEW_CHARS).collect()
}
