//! Core message types for the SVDRP line protocol.

use chrono::{Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SvdrpError};

/// Default SVDRP port of a VDR instance.
pub const DEFAULT_PORT: u16 = 6419;

/// Line terminating a data body sent after a 354 reply.
pub const END_OF_DATA: &str = ".";

/// Status codes with a fixed meaning.
pub mod status {
    /// Service ready, sent once on connect.
    pub const GREETING: u16 = 220;
    /// Service closing transmission channel.
    pub const CLOSING: u16 = 221;
    /// Requested action okay, completed.
    pub const OK: u16 = 250;
    /// Start data transfer, terminate with a lone ".".
    pub const START_DATA: u16 = 354;
}

/// One decoded reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Three digit status code.
    pub code: u16,
    /// True if more lines of the same reply follow.
    pub is_continuation: bool,
    /// Text after the continuation marker.
    pub message: String,
}

/// A complete reply: every message line and the code of the final line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub code: u16,
    pub lines: Vec<String>,
}

/// Information announced by the server in its 220 greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    /// Host name of the VDR machine.
    pub hostname: String,
    /// Version string, e.g. `2.4.1`.
    pub version: String,
    /// `major * 10000 + minor * 100 + revision`.
    pub version_number: u32,
    /// Server time in seconds since the epoch.
    pub server_time: i64,
    /// Character encoding used for all further lines.
    pub encoding: String,
}

impl Greeting {
    /// Parse the greeting message.
    ///
    /// Format: `<host> SVDRP VideoDiskRecorder <version>; <asctime>; <encoding>`
    pub fn parse(message: &str) -> Result<Self> {
        let mut parts = message.splitn(3, "; ");
        let (host_info, asctime, encoding) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(t), Some(e)) => (h, t, e),
            _ => {
                return Err(SvdrpError::MalformedResponse(format!(
                    "greeting has no time/encoding part: {:?}",
                    message
                )))
            }
        };

        let mut words = host_info.split_whitespace();
        let hostname = words
            .next()
            .ok_or_else(|| SvdrpError::MalformedResponse("greeting has no host name".into()))?;
        let version = words
            .last()
            .ok_or_else(|| SvdrpError::MalformedResponse("greeting has no version".into()))?;

        Ok(Greeting {
            hostname: hostname.to_string(),
            version: version.to_string(),
            version_number: parse_version_number(version)?,
            server_time: parse_asctime(asctime)?,
            encoding: encoding.trim().to_string(),
        })
    }
}

/// Combine `major.minor.revision` into a single comparable number.
pub fn parse_version_number(version: &str) -> Result<u32> {
    let numbers: Vec<u32> = version
        .split('.')
        .map(|part| part.parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| SvdrpError::MalformedResponse(format!("bad version: {:?}", version)))?;

    match numbers.as_slice() {
        [major, minor, revision] => Ok(major * 10000 + minor * 100 + revision),
        _ => Err(SvdrpError::MalformedResponse(format!(
            "bad version: {:?}",
            version
        ))),
    }
}

/// Convert `Sun Dec 27 17:15:23 2020` (server local time) to epoch seconds.
pub fn parse_asctime(asctime: &str) -> Result<i64> {
    // ctime() pads single digit days with a space
    let normalized = asctime.split_whitespace().collect::<Vec<_>>().join(" ");
    let naive = NaiveDateTime::parse_from_str(&normalized, "%a %b %d %H:%M:%S %Y")
        .map_err(|e| SvdrpError::MalformedResponse(format!("bad time {:?}: {}", asctime, e)))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| SvdrpError::MalformedResponse(format!("nonexistent local time {:?}", asctime)))
}
