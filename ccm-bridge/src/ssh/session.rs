use crate::config::Authentication;
use crate::error::TransportError;
use crate::transport::CommandOutput;
use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::time::Duration;

/// libssh2's LIBSSH2_ERROR_EAGAIN
const EAGAIN: i32 = -37;
const READ_CHUNK: usize = 4096;
/// Longest single wait for the session socket to become readable
const READ_WAIT: Duration = Duration::from_millis(500);
const OUTBOUND_NAP: Duration = Duration::from_millis(10);

/// Where and as whom to log in
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub authentication: Authentication,
}

struct Connection {
    session: ssh2::Session,
    /// Second handle on the session socket, used to wait for readability.
    /// It shares the underlying descriptor and its flags with libssh2's.
    socket: TcpStream,
}

/// Owns the SSH session used to run ccm on a remote host.
///
/// The session is opened on first use and kept for the lifetime of the
/// manager. Commands are strictly serialized: each runs on its own exec
/// channel and the channel is drained and closed before the next one opens.
pub struct SessionManager {
    settings: SessionSettings,
    connection: Option<Connection>,
}

impl SessionManager {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            connection: None,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn is_established(&self) -> bool {
        self.connection.is_some()
    }

    /// Connect, handshake and authenticate, unless already done.
    pub fn establish(&mut self) -> Result<(), TransportError> {
        if self.connection.is_some() {
            return Ok(());
        }

        let SessionSettings {
            host,
            port,
            username,
            authentication,
        } = &self.settings;
        tracing::info!(
            host = %host,
            port = *port,
            username = %username,
            "Establishing ssh session"
        );

        let tcp = TcpStream::connect((host.as_str(), *port)).map_err(|source| {
            TransportError::Connect {
                host: host.clone(),
                port: *port,
                source,
            }
        })?;
        let socket = tcp.try_clone()?;

        let mut session = ssh2::Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;

        let authenticated = match authentication {
            Authentication::Password { password } => {
                session.userauth_password(username, password)
            }
            Authentication::PublicKey {
                public_key,
                private_key,
            } => session.userauth_pubkey_file(
                username,
                Some(public_key.as_path()),
                private_key.as_path(),
                None,
            ),
        };
        authenticated.map_err(|e| {
            tracing::error!(username = %username, error = %e, "ssh authentication rejected");
            TransportError::Authentication {
                username: username.clone(),
            }
        })?;

        if !session.authenticated() {
            return Err(TransportError::Authentication {
                username: username.clone(),
            });
        }

        // handshake and authentication ran blocking; command I/O does not
        session.set_blocking(false);

        self.connection = Some(Connection { session, socket });
        tracing::info!(host = %host, "ssh session established");
        Ok(())
    }

    /// Run `command_line` through the remote shell and collect both output streams.
    pub fn execute(&mut self, command_line: &str) -> Result<CommandOutput, TransportError> {
        self.establish()?;
        let Some(connection) = self.connection.as_ref() else {
            return Err(TransportError::ConnectionLost);
        };

        match connection.run(command_line) {
            Ok(output) => Ok(output),
            Err(e) => {
                // the session state is unknown after a failure mid-command
                tracing::warn!(error = %e, "dropping ssh session after failed command");
                self.connection = None;
                Err(e)
            }
        }
    }

    /// Disconnect and drop the session. Safe to call repeatedly.
    pub fn finalize(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.session.set_blocking(true);
            if let Err(e) = connection
                .session
                .disconnect(None, "ccm-bridge finished", None)
            {
                tracing::debug!(error = %e, "ssh disconnect failed");
            }
            tracing::info!(host = %self.settings.host, "ssh session closed");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl Connection {
    fn run(&self, command_line: &str) -> Result<CommandOutput, TransportError> {
        let mut channel = self.retry(|s| s.channel_session())?;
        self.retry(|_| channel.exec(command_line))?;

        let mut output = Vec::new();
        let mut buffer = [0u8; READ_CHUNK];
        loop {
            let mut progressed = false;
            for stream_id in [0, 1] {
                match channel.stream(stream_id).read(&mut buffer) {
                    Ok(0) => {}
                    Ok(n) => {
                        output.extend_from_slice(&buffer[..n]);
                        progressed = true;
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                    Err(e) => return Err(e.into()),
                }
            }

            if !progressed {
                if channel.eof() {
                    break;
                }
                self.synchronize()?;
            }
        }

        self.retry(|_| channel.close())?;
        self.retry(|_| channel.wait_close())?;
        let exit_code = channel.exit_status().ok();

        let output = String::from_utf8_lossy(&output).into_owned();
        tracing::trace!(exit_code = ?exit_code, output = %output, "remote command finished");
        Ok(CommandOutput { output, exit_code })
    }

    /// Repeat a libssh2 call until it stops asking to be retried.
    fn retry<T>(
        &self,
        mut f: impl FnMut(&ssh2::Session) -> Result<T, ssh2::Error>,
    ) -> Result<T, TransportError> {
        loop {
            match f(&self.session) {
                Ok(value) => return Ok(value),
                Err(e) if matches!(e.code(), ssh2::ErrorCode::Session(EAGAIN)) => {
                    self.synchronize()?
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Wait for the socket in the direction libssh2 is blocked on.
    ///
    /// Inbound waits are real: a blocking `peek` with [`READ_WAIT`] as its
    /// timeout returns as soon as data arrives. The standard socket API has
    /// no writability wait, so outbound is a short nap before retrying.
    fn synchronize(&self) -> Result<(), TransportError> {
        match self.session.block_directions() {
            ssh2::BlockDirections::None => Ok(()),
            ssh2::BlockDirections::Outbound => {
                std::thread::sleep(OUTBOUND_NAP);
                Ok(())
            }
            ssh2::BlockDirections::Inbound | ssh2::BlockDirections::Both => self.wait_readable(),
        }
    }

    /// Block until the session socket has data, is closed, or [`READ_WAIT`]
    /// passes. The socket is shared with libssh2, which expects it
    /// non-blocking, so that mode is restored before returning.
    fn wait_readable(&self) -> Result<(), TransportError> {
        self.socket.set_nonblocking(false)?;
        let waited = self
            .socket
            .set_read_timeout(Some(READ_WAIT))
            .and_then(|()| self.socket.peek(&mut [0u8; 1]));
        self.socket.set_nonblocking(true)?;

        match waited {
            Ok(0) => Err(TransportError::ConnectionLost),
            Ok(_) => Ok(()),
            // timed out; libssh2 is asked again
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(()),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_is_lazy() {
        let manager = SessionManager::new(SessionSettings {
            host: "127.0.0.1".to_string(),
            port: 22,
            username: "vagrant".to_string(),
            authentication: Authentication::default(),
        });
        assert!(!manager.is_established());
        assert_eq!(manager.settings().username, "vagrant");
    }

    #[test]
    fn test_connect_failure_is_a_transport_error() {
        // port 1 on localhost is not an ssh server in any test environment
        let mut manager = SessionManager::new(SessionSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "vagrant".to_string(),
            authentication: Authentication::default(),
        });
        assert!(manager.execute("ccm list").is_err());
        assert!(!manager.is_established());
    }

    fn connected_pair() -> (Connection, TcpStream) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        client.set_nonblocking(true).unwrap();
        let connection = Connection {
            session: ssh2::Session::new().unwrap(),
            socket: client,
        };
        (connection, server)
    }

    #[test]
    fn test_wait_readable_returns_when_data_arrives() {
        use std::io::Write;

        let (connection, mut server) = connected_pair();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            server.write_all(b"x").unwrap();
            server
        });

        let started = std::time::Instant::now();
        connection.wait_readable().unwrap();
        assert!(started.elapsed() < READ_WAIT);
        let _server = writer.join().unwrap();

        // libssh2 keeps its non-blocking socket
        let mut buffer = [0u8; 4];
        assert_eq!((&connection.socket).read(&mut buffer).unwrap(), 1);
        let err = (&connection.socket).read(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn test_wait_readable_times_out_quietly() {
        let (connection, _server) = connected_pair();
        connection.wait_readable().unwrap();
    }

    #[test]
    fn test_wait_readable_detects_closed_peer() {
        let (connection, server) = connected_pair();
        drop(server);
        assert!(matches!(
            connection.wait_readable(),
            Err(TransportError::ConnectionLost)
        ));
    }
}
