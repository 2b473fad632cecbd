//! Scripted in-memory SVDRP server for tests.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

use super::connection::ConnectionConfig;

pub const GREETING: &str =
    "220 vdr SVDRP VideoDiskRecorder 2.4.1; Sun Dec 27 17:15:23 2020; UTF-8";

pub fn config() -> ConnectionConfig {
    ConnectionConfig {
        read_timeout: Duration::from_millis(500),
        quit_timeout: Duration::from_millis(200),
        ..ConnectionConfig::default()
    }
}

/// Answers expected command lines with canned replies, in order.
///
/// Lines that do not match the next expected command (such as a `PUTE`
/// body) are recorded without a reply. The join handle yields every
/// received line once the client hangs up.
pub struct ScriptedServer {
    greeting: String,
    script: VecDeque<(String, String)>,
}

impl ScriptedServer {
    pub fn new(script: Vec<(&str, &str)>) -> Self {
        Self::with_greeting(GREETING, script)
    }

    pub fn with_greeting(greeting: &str, script: Vec<(&str, &str)>) -> Self {
        Self {
            greeting: greeting.to_string(),
            script: script
                .into_iter()
                .map(|(cmd, reply)| (cmd.to_string(), reply.to_string()))
                .collect(),
        }
    }

    pub fn start(mut self) -> (DuplexStream, JoinHandle<Vec<String>>) {
        let (client, server) = duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut received = Vec::new();
            if write
                .write_all(format!("{}\r\n", self.greeting).as_bytes())
                .await
                .is_err()
            {
                return received;
            }

            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let matches = self.script.front().is_some_and(|(cmd, _)| *cmd == line);
                received.push(line);
                if !matches {
                    continue;
                }
                if let Some((_, reply)) = self.script.pop_front() {
                    for reply_line in reply.lines() {
                        let _ = write.write_all(format!("{}\r\n", reply_line).as_bytes()).await;
                    }
                }
            }
            received
        });
        (client, handle)
    }
}
