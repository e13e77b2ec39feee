//! Command execution.
//!
//! The bridge only ever sees [`CommandTransport`]; whether ccm runs on this
//! machine or behind an SSH session is decided once, at construction.

mod local;
#[cfg(feature = "remote")]
mod remote;

pub use local::LocalTransport;
#[cfg(feature = "remote")]
pub use remote::RemoteTransport;

use crate::error::TransportError;

/// Output from one command execution
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// stdout and stderr together. Remote output may interleave the two
    /// streams in any order.
    pub output: String,
    /// Exit code, when the transport could observe one.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn new(output: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    /// Create from std::process::Output
    pub fn from_output(output: std::process::Output) -> Self {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Self {
            output: combined,
            exit_code: output.status.code(),
        }
    }

    /// False only when an exit code was observed and it was non-zero.
    pub fn exited_cleanly(&self) -> bool {
        self.exit_code.is_none_or(|code| code == 0)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.output.contains(text)
    }
}

/// Runs an argument vector (`argv[0]` is the program) and captures its output.
///
/// A reply that reports failure is still `Ok`; interpreting it is the
/// caller's job. `Err` means the command could not be run at all.
pub trait CommandTransport: Send {
    fn execute(&mut self, argv: &[String]) -> Result<CommandOutput, TransportError>;

    /// Release any held connection. Called on bridge teardown.
    fn finalize(&mut self) {}
}

impl<T: CommandTransport + ?Sized> CommandTransport for Box<T> {
    fn execute(&mut self, argv: &[String]) -> Result<CommandOutput, TransportError> {
        (**self).execute(argv)
    }

    fn finalize(&mut self) {
        (**self).finalize()
    }
}

/// Join `argv` into one command line for a remote shell, quoting every token
/// that is not made of plain characters so each argument arrives intact.
pub fn shell_join(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(arg: &str) -> String {
    let plain = |c: char| c.is_ascii_alphanumeric() || "-_.,:/=+@%".contains(c);
    if !arg.is_empty() && arg.chars().all(plain) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r#"'"'"'"#))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_plain_arguments_are_not_quoted() {
        let line = shell_join(&argv(&["ccm", "node1", "start", "--jvm_arg=-Dfoo=bar"]));
        assert_eq!(line, "ccm node1 start --jvm_arg=-Dfoo=bar");
    }

    #[test]
    fn test_special_arguments_are_quoted() {
        let line = shell_join(&argv(&["ccm", "node1", "cqlsh", "-x", "SELECT * FROM t; rm -rf /"]));
        assert_eq!(line, "ccm node1 cqlsh -x 'SELECT * FROM t; rm -rf /'");

        let line = shell_join(&argv(&["echo", "it's", ""]));
        assert_eq!(line, r#"echo 'it'"'"'s' ''"#);
    }

    #[test]
    fn test_command_output() {
        let output = CommandOutput::new("node1: UP", Some(0));
        assert!(output.exited_cleanly());
        assert!(output.contains("UP"));
        assert!(CommandOutput::new("", None).exited_cleanly());
        assert!(!CommandOutput::new("boom", Some(1)).exited_cleanly());
    }
}
