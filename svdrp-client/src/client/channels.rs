//! Channel commands: `LSTC`, `MOVC`, `DELC`.

use log::info;

use svdrp_protocol::{status, Channel, ChannelKey, ChannelList, Result, SvdrpError};

use super::connection::Transport;
use super::session::Session;

impl<S: Transport> Session<S> {
    /// Fetch the whole channel list. With `with_groups` the group
    /// separators are included and numbered 1, 2, ... in list order.
    pub async fn list_channels(&mut self, with_groups: bool) -> Result<ChannelList> {
        let command = if with_groups { "LSTC :groups" } else { "LSTC" };
        let response = self.command(command).await?;
        ChannelList::from_lines(&response.lines)
    }

    /// Fetch a single channel by number or id.
    pub async fn get_channel(&mut self, key: impl Into<ChannelKey>) -> Result<Channel> {
        let key = key.into();
        let response = self.command(&format!("LSTC {}", key)).await?;
        match response.lines.first() {
            Some(line) => Channel::parse_list_line(line),
            None => Err(SvdrpError::NotFound(format!("channel {}", key))),
        }
    }

    /// Move channel `from` to position `to`.
    ///
    /// Returns the numbers the server reports as moved, which is where the
    /// channel came from and where it was put.
    pub async fn move_channel(&mut self, from: u32, to: u32) -> Result<(u32, u32)> {
        let message = self
            .command_expect(&format!("MOVC {} {}", from, to), status::OK)
            .await?;
        let moved = parse_moved(&message)?;
        info!("Moved channel {} to {}", moved.0, moved.1);
        Ok(moved)
    }

    /// Delete a channel. Ids are resolved to the current number first.
    pub async fn delete_channel(&mut self, key: impl Into<ChannelKey>) -> Result<String> {
        let number = match key.into() {
            ChannelKey::Number(n) => n,
            key @ ChannelKey::Id(_) => self.get_channel(key).await?.number,
        };
        let message = self
            .command_expect(&format!("DELC {}", number), status::OK)
            .await?;
        info!("Deleted channel {}", number);
        Ok(message)
    }
}

/// Extract the two quoted numbers of `Channel "5" moved to "7"`.
fn parse_moved(message: &str) -> Result<(u32, u32)> {
    let quoted: Vec<&str> = message.split('"').skip(1).step_by(2).collect();
    match *quoted.as_slice() {
        [from, to, ..] => match (from.parse(), to.parse()) {
            (Ok(from), Ok(to)) => Ok((from, to)),
            _ => Err(malformed_move(message)),
        },
        _ => Err(malformed_move(message)),
    }
}

fn malformed_move(message: &str) -> SvdrpError {
    SvdrpError::MalformedResponse(format!("unexpected MOVC reply {:?}", message))
}
