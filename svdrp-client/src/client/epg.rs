//! EPG commands: `LSTE`, `CLRE`, `PUTE`.

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use svdrp_protocol::{
    parse_epg, serialize_epg, status, ChannelKey, Result, Schedules, SvdrpError, END_OF_DATA,
};

use super::connection::Transport;
use super::session::Session;

/// Time restriction for `LSTE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpgFilter {
    /// Events running now.
    Now,
    /// Events following the current ones.
    Next,
    /// Events running at the given time (epoch seconds).
    At(i64),
}

impl fmt::Display for EpgFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpgFilter::Now => f.write_str("now"),
            EpgFilter::Next => f.write_str("next"),
            EpgFilter::At(time) => write!(f, "at {}", time),
        }
    }
}

fn with_channel(verb: &str, channel: Option<&ChannelKey>) -> String {
    match channel {
        Some(key) => format!("{} {}", verb, key),
        None => verb.to_string(),
    }
}

impl<S: Transport> Session<S> {
    /// Fetch EPG data, optionally for one channel and time.
    pub async fn list_epg(
        &mut self,
        channel: Option<ChannelKey>,
        filter: Option<EpgFilter>,
    ) -> Result<Schedules> {
        let mut command = with_channel("LSTE", channel.as_ref());
        if let Some(filter) = filter {
            command = format!("{} {}", command, filter);
        }

        let mut lines = self.command(&command).await?.lines;
        if lines.last().is_some_and(|l| l.starts_with("End of EPG data")) {
            lines.pop();
        }
        let schedules = parse_epg(&lines)?;
        debug!("Parsed {} schedules", schedules.len());
        Ok(schedules)
    }

    /// Clear EPG data of one channel or of all channels.
    pub async fn clear_epg(&mut self, channel: Option<ChannelKey>) -> Result<String> {
        let response = self.command(&with_channel("CLRE", channel.as_ref())).await?;
        Ok(response.lines.join("\n"))
    }

    /// Upload EPG data.
    pub async fn put_epg(&mut self, schedules: &Schedules) -> Result<String> {
        let response = self.command("PUTE").await?;
        if response.code != status::START_DATA {
            return Err(SvdrpError::UnexpectedReply {
                code: response.code,
                message: response.lines.join("\n"),
            });
        }

        let lines = serialize_epg(schedules);
        for line in &lines {
            self.send(line).await?;
        }
        self.send(END_OF_DATA).await?;

        let done = self.receive_list().await?;
        info!("Uploaded {} EPG lines", lines.len());
        Ok(done.lines.join("\n"))
    }
}
