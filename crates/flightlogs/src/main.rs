//! `flogs` - CLI for flightlogs
//!
//! This binary runs the interactive download screen and provides one-shot
//! commands for listing, downloading and managing saved state.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::Value;
use tokio::sync::mpsc;

use flightlogs::cli::{
    parse_command, Cli, Command, ConfigCommand, ConsoleView, DownloadCommand, FilterCommand,
    HistoryCommand, ListCommand, SettingsCommand, WatchCommand, HELP,
};
use flightlogs::coordinator::{log_source_dir, save_filter, saved_filter};
use flightlogs::{
    catalog, init_logging, transfer, Config, DownloadCoordinator, DownloadFilter, DownloadHistory,
    Error, FilterField, JsonSettings, SettingsStore, UserCommand,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let mut config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Watch(cmd) => handle_watch(&mut config, cmd).await,
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Download(cmd) => handle_download(&config, &cmd),
        Command::Filter(cmd) => handle_filter(&config, cmd),
        Command::History(cmd) => handle_history(&config, cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Settings(cmd) => handle_settings(&config, cmd),
    }
}

fn open_settings(config: &Config) -> anyhow::Result<JsonSettings> {
    let path = config.settings_path();
    JsonSettings::load(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))
}

fn open_history(config: &Config) -> anyhow::Result<DownloadHistory> {
    let path = config.history_path();
    DownloadHistory::open(&path)
        .with_context(|| format!("Failed to open download history at {}", path.display()))
}

async fn handle_watch(config: &mut Config, cmd: WatchCommand) -> anyhow::Result<()> {
    if let Some(mount_point) = cmd.mount_point {
        config.paths.mount_point = mount_point;
    }
    let config: &Config = config;

    let mut coordinator = DownloadCoordinator::new(
        config,
        open_settings(config)?,
        open_history(config)?,
        ConsoleView::stdout(),
    )?;
    let (handle, events) = coordinator.activate();

    // Stdin reads block; keep them off the runtime.
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            let Some(command) = parse_command(&line) else {
                println!("{HELP}");
                continue;
            };
            let quit = command == UserCommand::Quit;
            if tx.blocking_send(command).is_err() || quit {
                break;
            }
        }
    });

    coordinator.run(events, rx).await;
    handle.shutdown().await;
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let settings = open_settings(config)?;
    let history = open_history(config)?;
    let source_dir = log_source_dir(config, &settings)?;

    let mut filter = saved_filter(&settings);
    if cmd.all {
        filter.set(FilterField::New, false);
    }
    let files = catalog::list_logs_with(&source_dir, &filter, &history);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("No flight logs selected.");
        return Ok(());
    }
    for file in &files {
        println!(
            "{:<32} {:>10}  {}{}",
            file.name,
            catalog::format_size(file.size),
            file.modified.format("%Y-%m-%d %H:%M"),
            if file.downloaded { "  (downloaded)" } else { "" }
        );
    }
    Ok(())
}

fn handle_download(config: &Config, cmd: &DownloadCommand) -> anyhow::Result<()> {
    let settings = open_settings(config)?;
    let history = open_history(config)?;
    let source_dir = log_source_dir(config, &settings)?;
    let mount_dir = config.mount_point();

    let everything = DownloadFilter {
        new: false,
        igc: true,
        nmea: true,
    };
    let files = catalog::list_logs_with(&source_dir, &everything, &history);

    let mut failed = 0usize;
    for name in &cmd.names {
        let Some(file) = files.iter().find(|f| &f.name == name) else {
            eprintln!("{}", Error::UnknownFile(name.clone()));
            failed += 1;
            continue;
        };
        match transfer::download(file, &source_dir, &mount_dir) {
            Ok(dest) => {
                println!("{name}: Done ({})", dest.display());
                if let Err(e) = history.record(file) {
                    tracing::warn!(file = %name, error = %e, "Could not record download");
                }
            }
            Err(e) => {
                eprintln!("{name}: Failed: {e}");
                failed += 1;
            }
        }
    }
    transfer::flush();

    if failed > 0 {
        bail!("{failed} of {} downloads failed", cmd.names.len());
    }
    Ok(())
}

fn handle_filter(config: &Config, cmd: FilterCommand) -> anyhow::Result<()> {
    let mut settings = open_settings(config)?;
    match cmd {
        FilterCommand::Show { json } => {
            let filter = saved_filter(&settings);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&Value::Object(filter.to_mapping()))?
                );
            } else {
                for field in FilterField::ALL {
                    let mark = if filter.get(field) { 'x' } else { ' ' };
                    println!("[{mark}] {:<10} ({field})", field.label());
                }
            }
        }
        FilterCommand::Set { field, value } => {
            let mut filter = saved_filter(&settings);
            filter.set(field, value.into());
            save_filter(&mut settings, &filter)?;
            println!("{field} = {}", filter.get(field));
        }
    }
    Ok(())
}

fn handle_history(config: &Config, cmd: HistoryCommand) -> anyhow::Result<()> {
    let history = open_history(config)?;
    match cmd {
        HistoryCommand::Show { limit, json } => {
            let records = history.recent(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No downloads recorded.");
            } else {
                for record in &records {
                    println!(
                        "{}  {:<32} {:>10}",
                        record.downloaded_at.format("%Y-%m-%d %H:%M:%S"),
                        record.name,
                        catalog::format_size(record.size)
                    );
                }
            }
        }
        HistoryCommand::Forget { name } => {
            let removed = history.forget(&name)?;
            println!("Forgot {removed} download(s) of {name}");
        }
        HistoryCommand::Clear { yes } => {
            if yes {
                let removed = history.clear()?;
                println!("Cleared {removed} download(s)");
            } else {
                println!("This will forget every recorded download.");
                println!("Use --yes to confirm.");
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Paths]");
                println!("  Root:               {}", config.paths.root.display());
                println!("  Mount point:        {}", config.mount_point().display());
                println!("  Settings file:      {}", config.settings_path().display());
                println!("  History database:   {}", config.history_path().display());
                println!();
                println!("[Watcher]");
                println!("  Poll interval (ms): {}", config.watcher.poll_interval_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn handle_settings(config: &Config, cmd: SettingsCommand) -> anyhow::Result<()> {
    let mut settings = open_settings(config)?;
    match cmd {
        SettingsCommand::Get { key } => {
            let value = settings.get_strict(&key)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        SettingsCommand::Set { key, value } => {
            let parsed = serde_json::from_str(&value).unwrap_or(Value::String(value));
            settings.set(&key, parsed);
            settings.save()?;
        }
    }
    Ok(())
}
