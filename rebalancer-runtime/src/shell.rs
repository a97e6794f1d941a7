//! External command execution.
//!
//! Commands are spawned directly with an argument vector, never through a
//! shell, so interpolated values cannot introduce shell syntax.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;

/// Flags whose following argument is a secret and must not be logged.
const SECRET_FLAGS: &[&str] = &["--private-key", "-k"];

const REDACTED: &str = "[REDACTED]";

/// A fully-built command line: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Value following `flag`, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Command line with private keys and credential paths masked.
    pub fn redacted(&self) -> String {
        let mut out = self.program.clone();
        let mut mask_next = false;
        for arg in &self.args {
            out.push(' ');
            if mask_next {
                out.push_str(REDACTED);
                mask_next = false;
                continue;
            }
            mask_next = SECRET_FLAGS.contains(&arg.as_str());
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                out.push('\'');
                out.push_str(arg);
                out.push('\'');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Always renders the redacted form.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Captured output of a zero-exit command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A command that exited non-zero or could not be spawned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandFailure {
    pub error: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandFailure {
    /// Captured stderr when there is any, otherwise the process error.
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            &self.error
        } else {
            stderr
        }
    }
}

/// Runs one command and captures its output. No retries, no timeout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, CommandFailure>;
}

/// Spawns real child processes via tokio.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, CommandFailure> {
        tracing::info!(cmd = %command, "executing external command");
        let started = Instant::now();

        let output = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| CommandFailure {
                error: format!("failed to spawn {}: {e}", command.program),
                ..Default::default()
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let duration_ms = started.elapsed().as_millis() as u64;

        if !output.status.success() {
            tracing::debug!(program = %command.program, duration_ms, status = %output.status, "command failed");
            return Err(CommandFailure {
                error: format!("{} exited with {}", command.program, output.status),
                stdout,
                stderr,
            });
        }

        tracing::debug!(program = %command.program, duration_ms, "command finished");
        Ok(CommandOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_redacts_private_key() {
        let cmd = CommandSpec::new("cast")
            .args(["send", "0x036CbD53842c5426634e7929541eC2318f3dCF7c", "depositUsdc(uint256)", "5000000"])
            .args(["--rpc-url", "https://sepolia.base.org", "--private-key", KEY]);
        let shown = cmd.redacted();
        assert!(!shown.contains(KEY));
        assert!(shown.ends_with("--private-key [REDACTED]"));
        assert!(shown.contains("--rpc-url https://sepolia.base.org"));
        assert_eq!(cmd.to_string(), shown);
    }

    #[test]
    fn test_redacts_credential_path() {
        let cmd = CommandSpec::new("cdpcurl")
            .args(["-k", "/home/me/Downloads/cdp_api_key.json"])
            .arg("https://api.cdp.coinbase.com/platform/v2/data/evm/token-balances/base-sepolia/0x0");
        let shown = cmd.redacted();
        assert!(!shown.contains("cdp_api_key.json"));
        assert!(shown.starts_with("cdpcurl -k [REDACTED] https://"));
    }

    #[test]
    fn test_quotes_arguments_with_spaces() {
        let cmd = CommandSpec::new("cdpcurl").args(["-d", "{\"a\": 1}"]);
        assert_eq!(cmd.redacted(), "cdpcurl -d '{\"a\": 1}'");
    }

    #[test]
    fn test_flag_value() {
        let cmd = CommandSpec::new("cast").args(["call", "--rpc-url", "http://localhost:8545"]);
        assert_eq!(cmd.flag_value("--rpc-url"), Some("http://localhost:8545"));
        assert_eq!(cmd.flag_value("--private-key"), None);
    }

    #[test]
    fn test_failure_diagnostic_prefers_stderr() {
        let failure = CommandFailure {
            error: "cast exited with exit status: 1".into(),
            stdout: String::new(),
            stderr: "execution reverted\n".into(),
        };
        assert_eq!(failure.diagnostic(), "execution reverted");

        let failure = CommandFailure {
            error: "failed to spawn cast: No such file or directory".into(),
            ..Default::default()
        };
        assert!(failure.diagnostic().starts_with("failed to spawn"));
    }

    #[tokio::test]
    async fn test_process_runner_missing_binary() {
        let cmd = CommandSpec::new("definitely-not-a-real-binary-7f3a").arg("--version");
        let err = ProcessRunner.run(&cmd).await.unwrap_err();
        assert!(err.error.contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let ok = ProcessRunner
            .run(&CommandSpec::new("echo").arg("0x0000000000000000000000000000000000000000"))
            .await
            .unwrap();
        assert_eq!(ok.stdout.trim(), "0x0000000000000000000000000000000000000000");

        let err = ProcessRunner.run(&CommandSpec::new("false")).await.unwrap_err();
        assert!(err.error.contains("exited with"));
    }
}
