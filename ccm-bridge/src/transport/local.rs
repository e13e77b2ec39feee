use super::{CommandOutput, CommandTransport};
use crate::error::TransportError;

/// Runs each command as a child process of this one
#[derive(Debug, Default, Clone)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

impl CommandTransport for LocalTransport {
    fn execute(&mut self, argv: &[String]) -> Result<CommandOutput, TransportError> {
        let (program, args) = argv.split_first().ok_or(TransportError::EmptyCommand)?;

        let output = std::process::Command::new(program)
            .args(args)
            .output().map_err(|source| TransportError::Spawn {
            program: program.clone(),
            source,
        })?;

        let output = CommandOutput::from_output(output);
        tracing::trace!(
            exit_code = ?output.exit_code,
            output = %output.output,
            "local command finished"
        );
        Ok(output)
    }
}
