//! svdrp: command-line remote control for VDR.

use std::error::Error;

use clap::Parser;
use log::{debug, error, info};
use serde_json::json;

use svdrp_client::client::Session;
use svdrp_client::{config, logging, reorder, EpgFilter, RepositionRequest};
use svdrp_protocol::parse_epg;

mod context;
mod output;

use context::{Cli, Commands, OutputFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(host) = cli.host.clone() {
        settings.connection.host = host;
    }
    if let Some(port) = cli.port {
        settings.connection.port = port;
    }

    let _guard = logging::init_logging(&settings.logging, cli.verbose)?;
    if let Some(path) = &settings.source {
        info!("Loaded configuration from {:?}", path);
    }
    debug!("Server: {}", settings.connection.address());

    let mut session = Session::connect(&settings.connection).await?;
    let result = run(&mut session, cli.command, cli.format).await;
    session.close().await;

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

async fn run(
    session: &mut Session,
    command: Commands,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    let json = format == OutputFormat::Json;

    match command {
        Commands::Info => {
            if json {
                output::print_json(session.greeting())?;
            } else {
                output::print_greeting(session.greeting());
            }
        }
        Commands::Channels { groups } => {
            let channels = session.list_channels(groups).await?;
            if json {
                output::print_json(&channels)?;
            } else {
                output::print_channels_table(&channels);
            }
        }
        Commands::Channel { key } => {
            let channel = session.get_channel(key).await?;
            if json {
                output::print_json(&channel)?;
            } else {
                output::print_channels_table([&channel]);
            }
        }
        Commands::Move { from, to } => {
            let (from, to) = session.move_channel(from, to).await?;
            if json {
                output::print_json(&json!({ "from": from, "to": to }))?;
            } else {
                println!("Channel {} moved to {}", from, to);
            }
        }
        Commands::Delete { key } => {
            let message = session.delete_channel(key).await?;
            println!("{}", message);
        }
        Commands::Reposition {
            source_id,
            target_id,
            after,
            allow_breaking_groups,
        } => {
            let request = RepositionRequest {
                source_id,
                target_id,
                place_after: after,
                allow_breaking_groups,
            };
            let moves = reorder::reposition(session, &request).await?;
            if json {
                output::print_json(&json!({ "request": request, "moves": moves }))?;
            } else {
                println!("Repositioned {} with {} move(s)", request.source_id, moves);
            }
        }
        Commands::Epg {
            channel,
            now,
            next,
            at,
        } => {
            let filter = match (now, next, at) {
                (true, _, _) => Some(EpgFilter::Now),
                (_, true, _) => Some(EpgFilter::Next),
                (_, _, Some(time)) => Some(EpgFilter::At(time)),
                _ => None,
            };
            let schedules = session.list_epg(channel, filter).await?;
            if json {
                output::print_json(&schedules)?;
            } else {
                output::print_schedules_table(&schedules);
            }
        }
        Commands::ClearEpg { channel } => {
            println!("{}", session.clear_epg(channel).await?);
        }
        Commands::PutEpg { file } => {
            let contents = std::fs::read_to_string(&file)?;
            let lines: Vec<&str> = contents.lines().filter(|l| !l.is_empty()).collect();
            let schedules = parse_epg(&lines)?;
            println!("{}", session.put_epg(&schedules).await?);
        }
        Commands::Plugins => {
            let plugins = session.list_plugins().await?;
            if json {
                output::print_json(&plugins)?;
            } else {
                output::print_plugins_table(&plugins);
            }
        }
    }

    Ok(())
}
