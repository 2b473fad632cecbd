use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgGroup, Parser, Subcommand};

use svdrp_protocol::ChannelKey;

#[derive(Debug, Parser)]
#[clap(name = "svdrp")]
#[clap(about = "Remote control for a running VDR over SVDRP", long_about = None)]
#[clap(version)]
pub(crate) struct Cli {
    /// Server host name or address.{n}
    /// Overrides the config file and SVDRP_HOST.
    #[clap(long, global = true)]
    pub host: Option<String>,

    /// Server port.{n}
    /// Overrides the config file and SVDRP_PORT.
    #[clap(short, long, global = true)]
    pub port: Option<u16>,

    /// Configuration file path.{n}
    /// Defaults to `svdrp.toml` in the current directory if present.
    #[clap(short = 'f', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[clap(value_enum, long, global = true, default_value = "table")]
    pub format: OutputFormat,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Show what the server announced in its greeting.
    Info,

    /// List all channels.
    Channels {
        /// Include group separators.
        #[clap(short, long)]
        groups: bool,
    },

    /// Show one channel.
    Channel {
        /// Channel number or channel id.
        #[clap(value_parser = ChannelKey::from_str)]
        key: ChannelKey,
    },

    /// Move a channel to another channel number.{n}
    /// Where exactly it lands depends on the move direction,
    /// see `reposition` for exact placement.
    Move { from: u32, to: u32 },

    /// Delete a channel.
    Delete {
        /// Channel number or channel id.
        #[clap(value_parser = ChannelKey::from_str)]
        key: ChannelKey,
    },

    /// Place a channel directly before or after another one.{n}
    /// The target may be a group id (`GROUP<n>`) as shown by
    /// `channels --groups`.
    Reposition {
        /// Channel id of the channel to move.
        source_id: String,

        /// Channel id of the reference channel.
        target_id: String,

        /// Place the channel behind the target.
        #[clap(short, long)]
        after: bool,

        /// Allow the move to leave a group empty.
        #[clap(long)]
        allow_breaking_groups: bool,
    },

    /// List EPG data.
    #[clap(group(
        ArgGroup::new("when")
            .args(&["now", "next", "at"])
            .multiple(false)
    ))]
    Epg {
        /// Only this channel (number or id).
        #[clap(short, long, value_parser = ChannelKey::from_str)]
        channel: Option<ChannelKey>,

        /// Only events running now.
        #[clap(long)]
        now: bool,

        /// Only the events following the current ones.
        #[clap(long)]
        next: bool,

        /// Only events running at this time (seconds since the epoch).
        #[clap(long, value_name = "TIME")]
        at: Option<i64>,
    },

    /// Clear EPG data of one channel or all channels.
    ClearEpg {
        #[clap(short, long, value_parser = ChannelKey::from_str)]
        channel: Option<ChannelKey>,
    },

    /// Upload EPG data from a file in EPG line format.
    PutEpg { file: PathBuf },

    /// List loaded plugins.
    Plugins,
}
