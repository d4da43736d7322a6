use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = Config::load_or_default();

    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("{}", "(not created yet, showing defaults)".dimmed());
    }
    println!();

    println!("{}", "defaults".bold());
    println!("  source:      {}", config.source().unwrap_or("(none)"));
    println!("  notify_url:  {}", config.notify_url().unwrap_or("(none)"));
    println!("  windowed:    {}", config.windowed());
    println!("  supervised:  {}", config.supervised());
    println!("  theme:       {}", config.theme());
    println!();
    println!("{}", "network".bold());
    println!(
        "  fetch_timeout_secs:      {}",
        config.fetch_timeout().as_secs()
    );
    println!(
        "  reconnect_backoff_secs:  {}",
        config.reconnect_backoff().as_secs()
    );
    println!(
        "  bootstrap_refresh_secs:  {}",
        config.bootstrap_interval().as_secs()
    );
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!(
        "{} {key} = {value} ({})",
        "Saved".green(),
        path.display().to_string().dimmed()
    );
    Ok(())
}
