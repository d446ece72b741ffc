//! External command invocation.
//!
//! Every interaction with the host package managers goes through
//! [`CommandRunner`]. Commands are always argument vectors, never strings
//! handed to a shell, so probe subjects and package names are never
//! interpretable by `sh`.
//!
//! A nonzero exit is a normal, captured outcome ([`CommandOutput`] with
//! `success == false`). Only a missing or unspawnable executable is an
//! error, so probes can fail open and the orchestrator decides what a
//! nonzero exit means for each step.

use crate::error::{AtelierError, Result};
use std::process::Command;

/// Captured result of running an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Whether the command exited with code 0.
    pub success: bool,
}

impl CommandOutput {
    /// The most useful diagnostic text: stderr if present, stdout otherwise.
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// The seam between the orchestration layer and the host system.
///
/// Production code uses [`SystemRunner`]; tests substitute a recording or
/// scripted implementation.
pub trait CommandRunner: Send + Sync {
    /// Run `argv[0]` with the remaining elements as arguments, capturing
    /// stdout and stderr.
    fn run(&self, argv: &[&str]) -> Result<CommandOutput>;
}

/// Runs commands against the real host system.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[&str]) -> Result<CommandOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            AtelierError::ProcessInvocation {
                program: String::new(),
                message: "empty argument vector".into(),
            }
        })?;

        tracing::debug!(command = %argv.join(" "), "invoking");

        let output = Command::new(program).args(args).output().map_err(|e| {
            AtelierError::ProcessInvocation {
                program: (*program).to_string(),
                message: e.to_string(),
            }
        })?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        };

        if !result.success {
            tracing::debug!(
                command = %argv.join(" "),
                code = ?result.exit_code,
                "command exited nonzero"
            );
        }

        Ok(result)
    }
}

/// Scripted [`CommandRunner`] for testing.
///
/// Records every invocation and replays configured outputs. Unconfigured
/// commands succeed with empty output, so tests only script the commands
/// they care about.
#[derive(Debug, Default)]
pub struct MockRunner {
    responses: std::sync::Mutex<std::collections::HashMap<String, CommandOutput>>,
    unspawnable: std::sync::Mutex<std::collections::HashSet<String>>,
    calls: std::sync::Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful exit with the given stdout.
    pub fn respond_success(&self, argv: &[&str], stdout: &str) {
        self.respond(
            argv,
            CommandOutput {
                exit_code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
                success: true,
            },
        );
    }

    /// Script a nonzero exit with the given stderr.
    pub fn respond_failure(&self, argv: &[&str], code: i32, stderr: &str) {
        self.respond(
            argv,
            CommandOutput {
                exit_code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
                success: false,
            },
        );
    }

    /// Script an exact output for an exact argument vector.
    pub fn respond(&self, argv: &[&str], output: CommandOutput) {
        self.responses
            .lock()
            .unwrap()
            .insert(argv.join("\u{1f}"), output);
    }

    /// Make invocations of `program` fail as unspawnable.
    pub fn fail_to_spawn(&self, program: &str) {
        self.unspawnable.lock().unwrap().insert(program.to_string());
    }

    /// Every argument vector run so far, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, argv: &[&str]) -> Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push(argv.iter().map(|s| s.to_string()).collect());

        let program = argv.first().copied().unwrap_or_default();
        if self.unspawnable.lock().unwrap().contains(program) {
            return Err(AtelierError::ProcessInvocation {
                program: program.to_string(),
                message: "No such file or directory".into(),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&argv.join("\u{1f}"))
            .cloned()
            .unwrap_or(CommandOutput {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
                success: true,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_successful_command() {
        let runner = SystemRunner;
        let out = runner.run(&["echo", "hello"]).unwrap();
        assert!(out.success);
        assert_eq!(out.exit_code, Some(0));
        assert!(out.stdout.contains("hello"));
    }

    #[test]
    fn nonzero_exit_is_not_an_error() {
        let runner = SystemRunner;
        let out = runner.run(&["false"]).unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(1));
    }

    #[test]
    fn missing_executable_is_an_error() {
        let runner = SystemRunner;
        let err = runner
            .run(&["atelier-no-such-binary-on-any-system"])
            .unwrap_err();
        assert!(matches!(err, AtelierError::ProcessInvocation { .. }));
    }

    #[test]
    fn empty_argv_is_an_error() {
        let runner = SystemRunner;
        assert!(runner.run(&[]).is_err());
    }

    #[test]
    fn arguments_are_not_shell_interpolated() {
        let runner = SystemRunner;
        // If this went through a shell the subshell would run; echo must
        // reproduce the literal text instead.
        let out = runner.run(&["echo", "$(id)"]).unwrap();
        assert!(out.stdout.contains("$(id)"));
    }

    #[test]
    fn captures_stderr() {
        let runner = SystemRunner;
        let out = runner.run(&["ls", "/atelier-definitely-missing"]).unwrap();
        assert!(!out.success);
        assert!(!out.stderr.is_empty());
        assert_eq!(out.diagnostic(), out.stderr.trim());
    }

    #[test]
    fn diagnostic_falls_back_to_stdout() {
        let out = CommandOutput {
            exit_code: Some(1),
            stdout: "E: Unable to locate package\n".into(),
            stderr: String::new(),
            success: false,
        };
        assert_eq!(out.diagnostic(), "E: Unable to locate package");
    }

    #[test]
    fn mock_replays_scripted_output_and_records_calls() {
        let mock = MockRunner::new();
        mock.respond_success(&["dpkg", "-l", "gimp"], "ii  gimp  2.10.34\n");

        let out = mock.run(&["dpkg", "-l", "gimp"]).unwrap();
        assert!(out.success);
        assert!(out.stdout.contains("gimp"));

        let calls = mock.calls();
        assert_eq!(calls, vec![vec!["dpkg", "-l", "gimp"]]);
    }

    #[test]
    fn mock_defaults_to_empty_success() {
        let mock = MockRunner::new();
        let out = mock.run(&["flatpak", "--version"]).unwrap();
        assert!(out.success);
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn mock_unspawnable_program_errors() {
        let mock = MockRunner::new();
        mock.fail_to_spawn("dpkg");
        assert!(mock.run(&["dpkg", "-l", "gimp"]).is_err());
    }
}
