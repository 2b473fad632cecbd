//! Line-oriented connection to an SVDRP server.

use std::time::Duration;

use bytes::BytesMut;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use svdrp_protocol::{
    decode_line, decode_status_line, encode_command, lookup_encoding, Response,
    ResponseAggregator, Result, StatusLine, SvdrpError, DEFAULT_PORT,
};

/// Byte stream a connection can run over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Transport for T {}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    /// Inactivity limit for every read and write.
    pub read_timeout: Duration,
    /// Limit for the goodbye sent while closing.
    pub quit_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(20),
            quit_timeout: Duration::from_secs(5),
        }
    }
}

impl ConnectionConfig {
    /// `host:port` for display and connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Open a TCP stream to the configured server.
pub async fn connect_tcp(config: &ConnectionConfig) -> Result<TcpStream> {
    let addr = config.address();
    info!("Connecting to {}", addr);

    let stream = timeout(config.connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| SvdrpError::Transport(format!("connect to {} timed out", addr)))??;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Framed text connection: sends command lines, reads status lines.
///
/// Dropping a connection that was not closed sends a best-effort `QUIT`
/// in the background.
pub struct Connection<S: Transport> {
    stream: Option<S>,
    read_buf: BytesMut,
    encoding: &'static Encoding,
    read_timeout: Duration,
    quit_timeout: Duration,
}

impl<S: Transport> Connection<S> {
    /// Wrap an established stream. Lines are UTF-8 until
    /// [`Connection::set_encoding`] is called.
    pub fn new(stream: S, config: &ConnectionConfig) -> Self {
        Self {
            stream: Some(stream),
            read_buf: BytesMut::with_capacity(4096),
            encoding: UTF_8,
            read_timeout: config.read_timeout,
            quit_timeout: config.quit_timeout,
        }
    }

    /// Switch the character encoding by label, e.g. `ISO-8859-15`.
    pub fn set_encoding(&mut self, label: &str) {
        self.encoding = lookup_encoding(label);
        debug!("Using encoding {}", self.encoding.name());
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Send one command line.
    pub async fn send(&mut self, command: &str) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| SvdrpError::Transport("connection closed".to_string()))?;

        debug!("Sending: {}", command);
        let data = encode_command(command, self.encoding);
        timeout(self.read_timeout, async {
            stream.write_all(&data).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| SvdrpError::Transport("write timed out".to_string()))??;
        Ok(())
    }

    /// Read the next raw line.
    async fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(line) = decode_line(&mut self.read_buf, self.encoding) {
                trace!("Received: {}", line);
                return Ok(line);
            }

            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| SvdrpError::Transport("connection closed".to_string()))?;
            let n = timeout(self.read_timeout, stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| {
                    SvdrpError::Transport(format!(
                        "no reply within {:?}",
                        self.read_timeout
                    ))
                })??;
            if n == 0 {
                return Err(SvdrpError::Transport(
                    "connection closed by server".to_string(),
                ));
            }
        }
    }

    /// Read one status line. Error codes become [`SvdrpError::Server`].
    pub async fn receive_one(&mut self) -> Result<StatusLine> {
        let line = self.read_line().await?;
        let status = decode_status_line(&line)?;
        debug!("Reply {}{}", status.code, if status.is_continuation { "-" } else { "" });
        svdrp_protocol::check_status(status)
    }

    /// Read lines until the final line of a reply.
    ///
    /// An error status fails the whole reply. The remaining lines of that
    /// reply are still consumed so the next command reads its own reply.
    pub async fn receive_list(&mut self) -> Result<Response> {
        let mut aggregator = ResponseAggregator::new();
        loop {
            let line = self.read_line().await?;
            let status = decode_status_line(&line)?;
            let more = status.is_continuation;
            match aggregator.push(status) {
                Ok(Some(response)) => {
                    debug!("Reply {} with {} lines", response.code, response.lines.len());
                    return Ok(response);
                }
                Ok(None) => {}
                Err(e) => {
                    if more {
                        self.skip_reply().await?;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Discard lines up to and including the final line of a reply.
    async fn skip_reply(&mut self) -> Result<()> {
        loop {
            let line = self.read_line().await?;
            if !decode_status_line(&line)?.is_continuation {
                return Ok(());
            }
            trace!("Skipping {}", line);
        }
    }

    /// Send `QUIT` and close the stream. Failures are logged, not returned.
    pub async fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            say_goodbye(stream, self.quit_timeout).await;
        }
    }
}

async fn say_goodbye<S: Transport>(mut stream: S, limit: Duration) {
    let result = timeout(limit, async {
        stream.write_all(b"QUIT\n").await?;
        stream.flush().await?;
        stream.shutdown().await
    })
    .await;

    match result {
        Ok(Ok(())) => debug!("Sent QUIT"),
        Ok(Err(e)) => warn!("Failed to send QUIT: {}", e),
        Err(_) => warn!("Sending QUIT timed out after {:?}", limit),
    }
}

impl<S: Transport> Drop for Connection<S> {
    fn drop(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let limit = self.quit_timeout;
                handle.spawn(say_goodbye(stream, limit));
            }
            Err(_) => debug!("No runtime to send QUIT, closing connection"),
        }
    }
}
