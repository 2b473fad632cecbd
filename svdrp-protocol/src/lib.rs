//! Protocol definitions for the SVDRP remote-control interface of VDR.
//!
//! This crate contains everything that can be done without a socket:
//! decoding reply lines, collecting multi-line replies, and translating
//! channel descriptors, EPG listings and plugin listings to and from
//! typed values.
//!
//! # Reply Format
//!
//! ```text
//! 250-1 Das Erste HD;ARD:11494:HC23M5O35P0S1:S19.2E:22000:...
//! 250-2 ZDF HD;ZDFvision:11362:HC23M5O35P0S1:S19.2E:22000:...
//! 250 3 3sat HD;ZDFvision:11347:VC23M5O35P0S1:S19.2E:22000:...
//! ```
//!
//! A `-` after the status code marks a continuation line, a space marks
//! the last line of the reply.
//!
//! # Example
//!
//! ```rust
//! use svdrp_protocol::{decode_status_line, Channel, ChannelList, ResponseAggregator};
//!
//! let mut agg = ResponseAggregator::new();
//! let mut response = None;
//! for line in ["250-1 :Public", "250 2 Das Erste HD;ARD:11494:H:S19.2E:22000:0:0:0:0:10301:1:1019:0"] {
//!     response = agg.push(decode_status_line(line).unwrap()).unwrap();
//! }
//! let response = response.unwrap();
//! assert_eq!(response.code, 250);
//!
//! let channels = ChannelList::from_lines(&response.lines).unwrap();
//! assert_eq!(channels[0].channel_id(), "GROUP1");
//! assert_eq!(channels[1].channel_id(), "S19.2E-1-1019-10301");
//!
//! let ch = Channel::parse("Das Erste HD;ARD:11494:H:S19.2E:22000:0:0:0:0:10301:1:1019:0", 2).unwrap();
//! assert_eq!(ch, channels[1]);
//! ```

pub mod channel;
pub mod codec;
pub mod epg;
pub mod error;
pub mod plugin;
pub mod types;

pub use channel::{Channel, ChannelKey, ChannelKind, ChannelList, GroupSeparator, ServiceParams};
pub use codec::{
    check_status, decode_line, decode_status_line, decode_text, encode_command, lookup_encoding,
    ResponseAggregator,
};
pub use epg::{
    derive_event_id, parse_epg, serialize_epg, EpgEvent, EpgSchedule, LineCursor, Schedules,
};
pub use error::{Result, ServerErrorKind, SvdrpError};
pub use plugin::{PluginInfo, Plugins};
pub use types::{status, Greeting, Response, StatusLine, DEFAULT_PORT, END_OF_DATA};
