mod cli;
mod demo;

use clap::Parser;
use livemap_feed::Feed;
use livemap_messages::Command;

use log::LevelFilter;
use std::io::Write;

use cli::{Cli, Mode, ViewArgs};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .format(|buf, record| {
            writeln!(
                buf,
                "{:<5} - mod path |{}| - target | {} | args: |{}|",
                record.level(),
                record.module_path().unwrap_or(""),
                record.target(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Warn)
        .filter_module("livemap", LevelFilter::Info)
        .filter_module("livemap_feed", LevelFilter::Info)
        .filter_module("livemap_ui", LevelFilter::Debug)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Mode::Demo(args)) => demo::run(&args),
        Some(Mode::View(args)) => view(&args),
        None => view(&cli.view),
    }
}

fn view(args: &ViewArgs) -> anyhow::Result<()> {
    let config = args.feed_config()?;

    // Create flume channels for bidirectional communication
    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (event_tx, event_rx) = flume::unbounded();

    // Spawn the one feed thread for the life of the app
    let feed_handle = std::thread::spawn(move || Feed::new(cmd_rx, event_tx, config).run());

    // Run UI on main thread (blocking)
    livemap_ui::run(event_rx)?;

    // UI has exited - send stop command to the feed
    let _ = cmd_tx.send(Command::Stop);

    // Wait for feed thread to finish
    feed_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Feed thread panicked"))?
}
