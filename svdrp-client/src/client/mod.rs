//! Async SVDRP client.

mod channels;
pub mod connection;
mod epg;
#[cfg(test)]
mod mock;
mod plugins;
pub mod session;

pub use connection::{connect_tcp, Connection, ConnectionConfig, Transport};
pub use epg::EpgFilter;
pub use session::Session;
