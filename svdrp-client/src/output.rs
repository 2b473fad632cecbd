//! Table and JSON rendering for the `svdrp` binary.

use chrono::{Local, TimeZone};
use serde::Serialize;

use svdrp_protocol::{Channel, Greeting, Plugins, Schedules};

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn local_time(epoch: i64, format: &str) -> String {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|t| t.format(format).to_string())
        .unwrap_or_else(|| epoch.to_string())
}

fn truncated(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

pub(crate) fn print_greeting(greeting: &Greeting) {
    println!("Host:     {}", greeting.hostname);
    println!("Version:  {} ({})", greeting.version, greeting.version_number);
    println!(
        "Time:     {}",
        local_time(greeting.server_time, "%Y-%m-%d %H:%M:%S")
    );
    println!("Encoding: {}", greeting.encoding);
}

pub(crate) fn print_channels_table<'a, I>(channels: I)
where
    I: IntoIterator<Item = &'a Channel>,
{
    println!(
        "{:>5} {:<28} {:<24} {}",
        "No", "Channel ID", "Name", "Provider"
    );
    println!("{}", "-".repeat(72));

    let mut total = 0;
    for ch in channels {
        if ch.is_group_separator() {
            println!("{:>5} {:<28} :{}", ch.number, ch.channel_id(), ch.name);
            continue;
        }
        total += 1;
        let provider = ch
            .service_params()
            .and_then(|p| p.provider.as_deref())
            .unwrap_or("-");
        println!(
            "{:>5} {:<28} {:<24} {}",
            ch.number,
            ch.channel_id(),
            truncated(&ch.name, 24),
            provider
        );
    }

    println!("\nTotal: {} channels", total);
}

pub(crate) fn print_schedules_table(schedules: &Schedules) {
    if schedules.is_empty() {
        println!("No EPG data found.");
        return;
    }

    for schedule in schedules.iter() {
        println!("{} ({})", schedule.channel_name, schedule.channel_id);
        for event in &schedule.events {
            println!(
                "  {} {:>4} min  {}",
                local_time(event.start_time(), "%m-%d %H:%M"),
                event.duration / 60,
                event.title.as_deref().unwrap_or("-")
            );
            if let Some(short_text) = &event.short_text {
                println!("  {:>20}{}", "", short_text);
            }
        }
    }
}

pub(crate) fn print_plugins_table(plugins: &Plugins) {
    if plugins.is_empty() {
        println!("No plugins loaded.");
        return;
    }

    println!("{:<20} {:<10} {}", "Name", "Version", "Description");
    println!("{}", "-".repeat(60));
    for plugin in plugins.iter() {
        println!(
            "{:<20} {:<10} {}",
            plugin.name, plugin.version, plugin.description
        );
    }
}
