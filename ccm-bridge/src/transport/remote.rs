use super::{CommandOutput, CommandTransport, shell_join};
use crate::error::TransportError;
use crate::ssh::{SessionManager, SessionSettings};

/// Runs commands on a remote host over one long-lived SSH session
pub struct RemoteTransport {
    session: SessionManager,
}

impl RemoteTransport {
    /// Nothing is connected until the first command.
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            session: SessionManager::new(settings),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_established()
    }
}

impl CommandTransport for RemoteTransport {
    fn execute(&mut self, argv: &[String]) -> Result<CommandOutput, TransportError> {
        if argv.is_empty() {
            return Err(TransportError::EmptyCommand);
        }
        let command_line = shell_join(argv);
        tracing::trace!(
            host = %self.session.settings().host,
            command_line = %command_line,
            "executing remote command"
        );
        self.session.execute(&command_line)
    }

    fn finalize(&mut self) {
        self.session.finalize();
    }
}
