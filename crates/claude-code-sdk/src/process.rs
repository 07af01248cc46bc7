use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::command::build_command;
use crate::locate::CliLocator;
use crate::transport::Transport;
use crate::types::QueryOptions;
use crate::{ClaudeSdkError, Result};

/// Marker added to the child's environment so the CLI knows who launched it.
pub const ENTRYPOINT_ENV: &str = "CLAUDE_CODE_ENTRYPOINT";
const ENTRYPOINT: &str = "sdk-rust";

// ─── SubprocessCliTransport ───────────────────────────────────────────────

/// Runs `claude --output-format stream-json --verbose … --print <prompt>`
/// and reads its stdout as JSONL.
///
/// The prompt travels on the command line; stdin is not used. Stderr is
/// drained by a background task and only surfaced if the process exits with
/// a non-zero code.
///
/// Lifecycle is `Unconnected → Connected → Disconnected`. There is no way back
/// from `Disconnected`; build a new transport for a new query.
pub struct SubprocessCliTransport {
    prompt: String,
    options: QueryOptions,
    cli_path: PathBuf,
    state: Lifecycle,
}

enum Lifecycle {
    Unconnected,
    Connected(Box<LiveProcess>),
    Disconnected,
}

struct LiveProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    output: Option<OutputReader>,
    exhausted: bool,
}

/// Created on the first read: stdout reader plus the stderr drain.
struct OutputReader {
    stdout: BufReader<ChildStdout>,
    buf: Vec<u8>,
    stderr_drain: Option<JoinHandle<Vec<String>>>,
}

impl SubprocessCliTransport {
    /// Prepare a transport, resolving the binary from
    /// `options.path_to_executable` or, failing that, the environment.
    pub fn new(prompt: impl Into<String>, options: QueryOptions) -> Result<Self> {
        let cli_path = match &options.path_to_executable {
            Some(path) => path.clone(),
            None => CliLocator::from_env().locate()?,
        };
        Ok(Self::with_cli_path(prompt, options, cli_path))
    }

    /// Prepare a transport for a known binary; no discovery happens.
    pub fn with_cli_path(
        prompt: impl Into<String>,
        options: QueryOptions,
        cli_path: impl Into<PathBuf>,
    ) -> Self {
        SubprocessCliTransport {
            prompt: prompt.into(),
            options,
            cli_path: cli_path.into(),
            state: Lifecycle::Unconnected,
        }
    }

    pub fn cli_path(&self) -> &Path {
        &self.cli_path
    }

    /// The argument vector this transport spawns, binary path first.
    pub fn command_line(&self) -> Vec<String> {
        build_command(&self.cli_path, &self.prompt, &self.options)
    }

    fn spawn(&self) -> Result<LiveProcess> {
        let argv = self.command_line();
        let mut cmd = Command::new(&self.cli_path);
        cmd.args(&argv[1..])
            .env(ENTRYPOINT_ENV, ENTRYPOINT)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let cwd = match &self.options.cwd {
            Some(dir) => Some(std::path::absolute(dir).map_err(|e| {
                ClaudeSdkError::CliConnection(format!(
                    "Invalid working directory {}: {e}",
                    dir.display()
                ))
            })?),
            None => None,
        };
        if let Some(dir) = &cwd {
            cmd.current_dir(dir);
        }

        tracing::info!(
            cli = %self.cli_path.display(),
            args = argv.len() - 1,
            cwd = ?cwd,
            "spawning claude subprocess"
        );

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(LiveProcess {
            child,
            stdout,
            stderr,
            output: None,
            exhausted: false,
        })
    }

    fn spawn_error(&self, err: std::io::Error) -> ClaudeSdkError {
        if err.kind() == std::io::ErrorKind::NotFound {
            ClaudeSdkError::not_found("Claude Code not found", Some(self.cli_path.clone()))
        } else {
            ClaudeSdkError::CliConnection(format!("Failed to start Claude Code: {err}"))
        }
    }
}

impl LiveProcess {
    /// Take the pipes and start the stderr drain. Called once, on first read.
    fn start_reading(&mut self) -> Result<&mut OutputReader> {
        if self.output.is_none() {
            let stdout = self
                .stdout
                .take()
                .ok_or_else(|| ClaudeSdkError::CliConnection("Not connected".into()))?;

            let stderr_drain = self.stderr.take().map(|stderr| {
                tokio::spawn(async move {
                    let mut collected = Vec::new();
                    let mut reader = BufReader::new(stderr);
                    let mut buf = Vec::new();
                    loop {
                        match read_line_lossy(&mut reader, &mut buf).await {
                            Ok(Some(line)) => collected.push(line),
                            Ok(None) => break,
                            Err(e) => {
                                tracing::debug!(error = %e, "stderr read failed");
                                break;
                            }
                        }
                    }
                    collected
                })
            });

            self.output = Some(OutputReader {
                stdout: BufReader::new(stdout),
                buf: Vec::new(),
                stderr_drain,
            });
        }
        self.output
            .as_mut()
            .ok_or_else(|| ClaudeSdkError::CliConnection("Not connected".into()))
    }

    /// Read stdout until a decodable value or EOF.
    ///
    /// Blank lines are skipped. A line that fails to parse is an error only
    /// if it starts with `{` or `[`; anything else is CLI chatter and ignored,
    /// including lines that are not valid UTF-8.
    async fn next_value(&mut self) -> Result<Option<Value>> {
        let reader = self.start_reading()?;
        loop {
            let next = read_line_lossy(&mut reader.stdout, &mut reader.buf).await?;
            let Some(line) = next else {
                return Ok(None);
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => return Ok(Some(value)),
                Err(source) if trimmed.starts_with('{') || trimmed.starts_with('[') => {
                    return Err(ClaudeSdkError::JsonDecode {
                        line: trimmed.to_owned(),
                        source,
                    });
                }
                Err(_) => {
                    tracing::debug!(line = %trimmed, "skipping non-JSON stdout line");
                }
            }
        }
    }

    /// After stdout closes: finish draining stderr, then wait for exit.
    ///
    /// The drain is joined before the exit status is inspected, so every
    /// stderr line is in the buffer when the error is built.
    async fn finish(&mut self) -> Result<()> {
        let stderr_lines = match self.output.as_mut().and_then(|o| o.stderr_drain.take()) {
            Some(drain) => drain.await.unwrap_or_default(),
            None => Vec::new(),
        };

        let status = self.child.wait().await?;
        match status.code() {
            Some(code) if code != 0 => {
                tracing::warn!(exit_code = code, "claude subprocess failed");
                Err(ClaudeSdkError::Process {
                    exit_code: code,
                    stderr: stderr_lines.join("\n"),
                })
            }
            _ => Ok(()),
        }
    }

    /// Send a kill signal unless the child has already exited.
    fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                tracing::debug!(pid = ?self.child.id(), "terminating claude subprocess");
                let _ = self.child.start_kill();
            }
        }
        if let Some(drain) = self.output.as_mut().and_then(|o| o.stderr_drain.take()) {
            drain.abort();
        }
    }
}

/// Read one `\n`-terminated line, replacing invalid UTF-8 with U+FFFD.
/// Returns `None` at EOF.
async fn read_line_lossy<R>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_owned()))
}

#[async_trait]
impl Transport for SubprocessCliTransport {
    async fn connect(&mut self) -> Result<()> {
        match self.state {
            Lifecycle::Connected(_) => Ok(()),
            Lifecycle::Disconnected => Err(ClaudeSdkError::CliConnection(
                "Transport already disconnected".into(),
            )),
            Lifecycle::Unconnected => {
                let process = self.spawn()?;
                self.state = Lifecycle::Connected(Box::new(process));
                Ok(())
            }
        }
    }

    fn disconnect(&mut self) {
        if let Lifecycle::Connected(process) = &mut self.state {
            process.terminate();
        }
        if !matches!(self.state, Lifecycle::Unconnected) {
            self.state = Lifecycle::Disconnected;
        }
    }

    async fn next_message(&mut self) -> Result<Option<Value>> {
        let Lifecycle::Connected(process) = &mut self.state else {
            return Err(ClaudeSdkError::CliConnection("Not connected".into()));
        };
        if process.exhausted {
            return Ok(None);
        }
        match process.next_value().await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                process.exhausted = true;
                process.finish().await.map(|()| None)
            }
            Err(e) => {
                process.exhausted = true;
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        matches!(self.state, Lifecycle::Connected(_))
    }
}

impl Drop for SubprocessCliTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
