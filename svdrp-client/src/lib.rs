//! svdrp-client - Async client for the VDR SVDRP remote-control interface.
//!
//! A [`Session`] speaks the line protocol over any tokio byte stream and
//! offers the channel, EPG and plugin commands on top of it. Channel
//! repositioning with group protection lives in [`reorder`].
//!
//! ```no_run
//! use svdrp_client::{ConnectionConfig, Session};
//!
//! # async fn run() -> svdrp_protocol::Result<()> {
//! let mut session = Session::connect(&ConnectionConfig::default()).await?;
//! for channel in &session.list_channels(true).await? {
//!     println!("{} {}", channel.number, channel.name);
//! }
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod logging;
pub mod reorder;

pub use client::{ConnectionConfig, EpgFilter, Session, Transport};
pub use reorder::{reposition, ChannelStore, RepositionRequest};
