// Subprocess plumbing shared by the pip, pytest and probe adapters
// reason: tokio for async process management, the ports are async
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::info;

use testmatrix_core::domain::EnvOverlay;
use testmatrix_core::port::TimeProvider;

/// Maximum bytes of collaborator output kept in a failure reason
pub const MAX_REASON_BYTES: usize = 2048;

/// Which interpreter to drive, and from where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonToolchain {
    /// Interpreter executable (name on PATH or path)
    pub python: String,
    /// Working directory for every child process
    pub working_dir: PathBuf,
}

impl Default for PythonToolchain {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            working_dir: PathBuf::from("."),
        }
    }
}

/// How the child's stdout/stderr are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputMode {
    /// Child writes straight to our stdout/stderr
    Inherit,
    /// Child output is collected
    Capture,
    /// stdout goes straight through; stderr is echoed line by line as it
    /// arrives and also collected
    Stream,
}

#[derive(Debug, Clone)]
pub(crate) struct ProcessOutcome {
    pub status: ExitStatus,
    pub duration_ms: i64,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn describe(&self) -> String {
        describe_status(&self.status)
    }
}

/// Spawns one child at a time and waits for it. No timeout: a hung child
/// hangs the caller.
pub(crate) struct SubprocessRunner {
    toolchain: PythonToolchain,
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessRunner {
    pub fn new(toolchain: PythonToolchain, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            toolchain,
            time_provider,
        }
    }

    pub fn python(&self) -> &str {
        &self.toolchain.python
    }

    /// Run `<python> <args...>` with `overlay` added to the child environment only
    pub async fn run_python(
        &self,
        args: &[String],
        overlay: &EnvOverlay,
        mode: OutputMode,
    ) -> std::io::Result<ProcessOutcome> {
        let python = &self.toolchain.python;
        let start_time = self.time_provider.now_millis();

        info!(
            command = %format_command_line(python, args),
            overlay = ?overlay,
            working_dir = %self.toolchain.working_dir.display(),
            "Starting subprocess"
        );

        let mut command = Command::new(python);
        command
            .args(args)
            .envs(overlay)
            .current_dir(&self.toolchain.working_dir)
            .stdin(Stdio::null());

        let (status, stdout, stderr) = match mode {
            OutputMode::Inherit => {
                let status = command
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .await?;
                (status, String::new(), String::new())
            }
            OutputMode::Capture => {
                let output = command
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .await?;
                (
                    output.status,
                    String::from_utf8_lossy(&output.stdout).to_string(),
                    String::from_utf8_lossy(&output.stderr).to_string(),
                )
            }
            OutputMode::Stream => {
                let mut child = command
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::piped())
                    .spawn()?;
                let mut stderr = String::new();
                if let Some(pipe) = child.stderr.take() {
                    let mut reader = BufReader::new(pipe);
                    let mut line = Vec::new();
                    while reader.read_until(b'\n', &mut line).await? > 0 {
                        let text = String::from_utf8_lossy(&line);
                        eprint!("{text}");
                        stderr.push_str(&text);
                        line.clear();
                    }
                }
                let status = child.wait().await?;
                (status, String::new(), stderr)
            }
        };

        let duration_ms = self.time_provider.now_millis() - start_time;
        info!(
            command = %python,
            duration_ms = %duration_ms,
            exit_code = ?status.code(),
            "Subprocess completed"
        );

        Ok(ProcessOutcome {
            status,
            duration_ms,
            stdout,
            stderr,
        })
    }
}

/// Render argv the way a shell trace would
pub fn format_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|part| {
            if part.is_empty() || part.contains(char::is_whitespace) {
                format!("'{part}'")
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable exit status (`exit code 2`, `terminated by signal 9`)
pub fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {signal}");
        }
    }
    "abnormal termination".to_string()
}

/// Keep the last `max_bytes` of `text` on a char boundary
pub fn tail(text: &str, max_bytes: usize) -> &str {
    let text = text.trim_end();
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_command_line_quotes_spaces() {
        let args = vec!["-m".to_string(), "pytest".to_string(), "a b".to_string()];
        assert_eq!(format_command_line("python", &args), "python -m pytest 'a b'");
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("short\n", 64), "short");
        assert_eq!(tail("0123456789", 4), "6789");
        // 'é' is two bytes; never split it
        assert_eq!(tail("aé", 1), "");
        assert_eq!(tail("aéb", 3), "éb");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_overlay_reaches_child_only() {
        use testmatrix_core::port::time_provider::SystemTimeProvider;

        let runner = SubprocessRunner::new(
            PythonToolchain {
                python: "sh".to_string(),
                working_dir: PathBuf::from("."),
            },
            Arc::new(SystemTimeProvider),
        );
        let mut overlay = EnvOverlay::new();
        overlay.insert("TESTMATRIX_OVERLAY_PROBE".to_string(), "scoped".to_string());

        let outcome = runner
            .run_python(
                &["-c".to_string(), "echo $TESTMATRIX_OVERLAY_PROBE".to_string()],
                &overlay,
                OutputMode::Capture,
            )
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.stdout.trim(), "scoped");
        assert!(std::env::var("TESTMATRIX_OVERLAY_PROBE").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stream_mode_keeps_stderr() {
        use testmatrix_core::port::time_provider::SystemTimeProvider;

        let runner = SubprocessRunner::new(
            PythonToolchain {
                python: "sh".to_string(),
                working_dir: PathBuf::from("."),
            },
            Arc::new(SystemTimeProvider),
        );
        let outcome = runner
            .run_python(
                &[
                    "-c".to_string(),
                    "echo progress; echo first >&2; echo second >&2; exit 3".to_string(),
                ],
                &EnvOverlay::new(),
                OutputMode::Stream,
            )
            .await
            .unwrap();

        assert_eq!(outcome.exit_code(), Some(3));
        assert!(outcome.stdout.is_empty());
        assert_eq!(outcome.stderr, "first\nsecond\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_describe_signal() {
        use testmatrix_core::port::time_provider::SystemTimeProvider;

        let runner = SubprocessRunner::new(
            PythonToolchain {
                python: "sh".to_string(),
                working_dir: PathBuf::from("."),
            },
            Arc::new(SystemTimeProvider),
        );
        let outcome = runner
            .run_python(
                &["-c".to_string(), "kill -9 $$".to_string()],
                &EnvOverlay::new(),
                OutputMode::Capture,
            )
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.exit_code(), None);
        assert_eq!(outcome.describe(), "terminated by signal 9");
    }
}
