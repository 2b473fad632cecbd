//! `PLUG` command.

use svdrp_protocol::{Plugins, Result};

use super::connection::Transport;
use super::session::Session;

impl<S: Transport> Session<S> {
    /// List the plugins loaded into the server.
    pub async fn list_plugins(&mut self) -> Result<Plugins> {
        let lines = self.command("PLUG").await?.lines;
        // heading and closing lines carry no plugin
        let body = match lines.len() {
            0..=2 => &[][..],
            n => &lines[1..n - 1],
        };
        Plugins::from_lines(body)
    }
}
