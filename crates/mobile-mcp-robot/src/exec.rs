//! Helper-tool invocation
//!
//! Every backend shells out to adb, go-ios, xcrun or an image tool. They all go
//! through [`CommandRunner`] so tests can script the tool output and assert on
//! the exact command lines that were issued.

use crate::constants::{EXEC_TIMEOUT, MAX_OUTPUT_SIZE};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Failure of a helper-tool invocation
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} produced more than {limit} bytes of output")]
    OutputTooLarge { program: String, limit: usize },

    #[error("{program} {args} failed with {status}: {stderr}")]
    Failed {
        program: String,
        args: String,
        status: String,
        stdout: String,
        stderr: String,
    },
}

impl ExecError {
    /// Combined stdout and stderr of a tool that ran but exited non-zero
    pub fn output(&self) -> Option<String> {
        match self {
            ExecError::Failed { stdout, stderr, .. } => {
                Some(format!("{}{}", stdout, stderr).trim().to_string())
            }
            _ => None,
        }
    }
}

/// Options for a single invocation
#[derive(Debug, Clone)]
pub struct ExecOptions {
    pub timeout: Duration,
    pub max_output: usize,
    /// Discard all output; used for fire-and-forget commands
    pub silent: bool,
    /// Bytes fed to the tool's stdin
    pub input: Option<Vec<u8>>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: EXEC_TIMEOUT,
            max_output: MAX_OUTPUT_SIZE,
            silent: false,
            input: None,
        }
    }
}

impl ExecOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn with_input(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: Some(input.into()),
            ..Self::default()
        }
    }
}

/// Runs an external program and returns its stdout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<Vec<u8>, ExecError>;
}

/// [`CommandRunner`] backed by real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<Vec<u8>, ExecError> {
        tracing::debug!("exec: {} {}", program, args.join(" "));

        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);
        command.stdin(if options.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if options.silent {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: program.to_string(),
            source,
        })?;

        if let (Some(input), Some(mut stdin)) = (options.input.clone(), child.stdin.take()) {
            // Written from a separate task so a tool that streams output while
            // still reading input cannot deadlock against us.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!("Failed to write tool stdin: {}", e);
                }
            });
        }

        // Dropping the child on timeout kills it.
        let output = tokio::time::timeout(options.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecError::Timeout {
                program: program.to_string(),
                timeout: options.timeout,
            })?
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if output.stdout.len() > options.max_output {
            return Err(ExecError::OutputTooLarge {
                program: program.to_string(),
                limit: options.max_output,
            });
        }

        if !output.status.success() {
            return Err(ExecError::Failed {
                program: program.to_string(),
                args: args.join(" "),
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }
}

/// Build an owned argument vector from string slices
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRunner;
    use super::*;

    #[test]
    fn test_failed_output_joins_streams() {
        let err = ExecError::Failed {
            program: "adb".to_string(),
            args: "shell".to_string(),
            status: "exit status: 1".to_string(),
            stdout: "out ".to_string(),
            stderr: "err\n".to_string(),
        };
        assert_eq!(err.output().as_deref(), Some("out err"));
    }

    #[test]
    fn test_default_options() {
        let opts = ExecOptions::default();
        assert_eq!(opts.timeout, EXEC_TIMEOUT);
        assert_eq!(opts.max_output, MAX_OUTPUT_SIZE);
        assert!(!opts.silent);
        assert!(ExecOptions::silent().silent);
        assert_eq!(ExecOptions::with_input("x").input, Some(b"x".to_vec()));
    }

    #[tokio::test]
    async fn test_scripted_runner_rules_are_consumed_in_order() {
        let runner = ScriptedRunner::new()
            .on_times("dump", "first", 1)
            .on("dump", "second");

        let a = runner.run("adb", &args(["dump"]), &ExecOptions::default()).await;
        let b = runner.run("adb", &args(["dump"]), &ExecOptions::default()).await;
        assert_eq!(a.unwrap(), b"first");
        assert_eq!(b.unwrap(), b"second");
        assert_eq!(runner.count_matching("adb dump"), 2);
    }

    #[tokio::test]
    async fn test_scripted_runner_silent_discards_stdout() {
        let runner = ScriptedRunner::new().on("--version", "tool 1.0");

        let loud = runner.run("tool", &args(["--version"]), &ExecOptions::default()).await;
        let quiet = runner.run("tool", &args(["--version"]), &ExecOptions::silent()).await;
        assert_eq!(loud.unwrap(), b"tool 1.0");
        assert!(quiet.unwrap().is_empty(), "silent runs never see stdout");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_silent_discards_stdout() {
        let loud = SystemRunner
            .run("echo", &args(["hello"]), &ExecOptions::default())
            .await
            .unwrap();
        let quiet = SystemRunner
            .run("echo", &args(["hello"]), &ExecOptions::silent())
            .await
            .unwrap();
        assert_eq!(loud, b"hello\n");
        assert!(quiet.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_reports_failure() {
        let err = SystemRunner
            .run("sh", &args(["-c", "echo oops >&2; exit 3"]), &ExecOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.output().as_deref(), Some("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_feeds_stdin() {
        let out = SystemRunner
            .run("cat", &[], &ExecOptions::with_input("hello"))
            .await
            .unwrap();
        assert_eq!(out, b"hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_times_out() {
        let opts = ExecOptions {
            timeout: Duration::from_millis(100),
            ..ExecOptions::default()
        };
        let err = SystemRunner
            .run("sleep", &args(["5"]), &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let err = SystemRunner
            .run("definitely-not-a-real-tool-4711", &[], &ExecOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
