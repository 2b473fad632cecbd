//! SVDRP session: greeting handshake and command/reply exchange.

use log::{debug, info};
use tokio::net::TcpStream;

use svdrp_protocol::{status, Greeting, Response, Result, StatusLine, SvdrpError};

use super::connection::{connect_tcp, Connection, ConnectionConfig, Transport};

/// One logical session with a VDR server.
///
/// Commands are strictly sequential: every method waits for the full reply
/// before returning. Call [`Session::close`] when done; a dropped session
/// still says goodbye in the background.
pub struct Session<S: Transport = TcpStream> {
    conn: Connection<S>,
    greeting: Greeting,
}

impl Session<TcpStream> {
    /// Connect over TCP and read the greeting.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let stream = connect_tcp(config).await?;
        Self::from_stream(stream, config).await
    }
}

impl<S: Transport> Session<S> {
    /// Start a session on an already open stream.
    pub async fn from_stream(stream: S, config: &ConnectionConfig) -> Result<Self> {
        let mut conn = Connection::new(stream, config);

        let first = conn.receive_one().await?;
        if first.code != status::GREETING {
            conn.close().await;
            return Err(SvdrpError::UnexpectedReply {
                code: first.code,
                message: first.message,
            });
        }

        let greeting = Greeting::parse(&first.message)?;
        conn.set_encoding(&greeting.encoding);
        info!(
            "Connected to {} (VDR {}, {})",
            greeting.hostname, greeting.version, greeting.encoding
        );

        Ok(Self { conn, greeting })
    }

    pub fn greeting(&self) -> &Greeting {
        &self.greeting
    }

    /// Send one raw command line.
    pub async fn send(&mut self, command: &str) -> Result<()> {
        self.conn.send(command).await
    }

    /// Read a single status line.
    pub async fn receive_one(&mut self) -> Result<StatusLine> {
        self.conn.receive_one().await
    }

    /// Read a complete, possibly multi-line, reply.
    pub async fn receive_list(&mut self) -> Result<Response> {
        self.conn.receive_list().await
    }

    /// Send a command and read its complete reply.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        self.send(command).await?;
        self.receive_list().await
    }

    /// Send a command whose only acceptable reply is `expected`.
    /// Returns the reply text.
    pub(crate) async fn command_expect(&mut self, command: &str, expected: u16) -> Result<String> {
        let response = self.command(command).await?;
        let message = response.lines.join("\n");
        if response.code != expected {
            debug!("{} answered {} instead of {}", command, response.code, expected);
            return Err(SvdrpError::UnexpectedReply {
                code: response.code,
                message,
            });
        }
        Ok(message)
    }

    /// Say goodbye and close the connection. Never fails.
    pub async fn close(mut self) {
        self.conn.close().await;
        info!("Session with {} closed", self.greeting.hostname);
    }
}
