use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::shell::LaunchOptions;
use crate::sync::SyncOptions;
use crate::sync::resilient::clamp_fetch_timeout;

#[derive(Parser)]
#[command(name = "tvdeck")]
#[command(author, version, about)]
#[command(long_about = "Unattended slide presentation for the reconciliation operations TV screens.\n\n\
    Fetches a slide deck from the dashboard API (or a local JSON file), rotates through it\n\
    on its own and keeps it fresh in the background.\n\n\
    Examples:\n  \
    tvdeck https://recon.example/api/tv/deck     Present fullscreen\n  \
    tvdeck deck.json --windowed --supervised     Rehearse a local deck by hand\n  \
    tvdeck check deck.json                       Print the rotation plan")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Deck URL or local JSON file (defaults to `defaults.source` from the config)
    pub source: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch in a window instead of fullscreen
    #[arg(long, global = false)]
    pub windowed: bool,

    /// Only change slides from the keyboard
    #[arg(long, global = false)]
    pub supervised: bool,

    /// WebSocket endpoint for live task notifications (ws:// only)
    #[arg(long, global = false, value_name = "URL")]
    pub notify: Option<String>,

    /// Color theme
    #[arg(long, global = false, value_enum)]
    pub theme: Option<ThemeArg>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a deck once and print how it would rotate
    Check {
        /// Deck URL or local JSON file
        source: String,

        /// Screen width in pixels
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Screen height in pixels
        #[arg(long, default_value = "1080")]
        height: u32,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.source, defaults.theme, network.fetch_timeout_secs)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Dark,
    Light,
}

impl ThemeArg {
    fn name(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Check {
                source,
                width,
                height,
            }) => crate::commands::check::run(&source, width, height),
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!("tvdeck {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            None => {
                let config = Config::load_or_default();
                let Some(source) = self
                    .source
                    .clone()
                    .or_else(|| config.source().map(str::to_string))
                else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    return Ok(());
                };
                crate::shell::run(self.launch_options(source, &config)?)
            }
        }
    }

    /// Merge flags over the saved configuration. Flags win.
    fn launch_options(&self, source: String, config: &Config) -> anyhow::Result<LaunchOptions> {
        let notify_url = self
            .notify
            .clone()
            .or_else(|| config.notify_url().map(str::to_string));
        if let Some(url) = &notify_url {
            if !url.starts_with("ws://") {
                anyhow::bail!("Unsupported notification URL: {url}. Only ws:// is supported.");
            }
        }
        Ok(LaunchOptions {
            sync: SyncOptions {
                source,
                notify_url,
                fetch_timeout: clamp_fetch_timeout(config.fetch_timeout()),
                reconnect_backoff: config.reconnect_backoff(),
                bootstrap_interval: config.bootstrap_interval(),
            },
            windowed: self.windowed || config.windowed(),
            supervised: self.supervised || config.supervised(),
            theme: self
                .theme
                .map_or_else(|| config.theme().to_string(), |t| t.name().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.set("defaults.theme", "light").unwrap();
        config
            .set("defaults.notify_url", "ws://recon.example/ws")
            .unwrap();
        config.set("network.reconnect_backoff_secs", "9").unwrap();

        let cli = Cli::parse_from(["tvdeck", "deck.json", "--theme", "dark", "--supervised"]);
        let options = cli.launch_options("deck.json".into(), &config).unwrap();
        assert_eq!(options.theme, "dark");
        assert!(options.supervised);
        assert!(!options.windowed);
        assert_eq!(
            options.sync.notify_url.as_deref(),
            Some("ws://recon.example/ws")
        );
        assert_eq!(options.sync.reconnect_backoff.as_secs(), 9);
        assert_eq!(options.sync.fetch_timeout.as_secs(), 30);
    }

    #[test]
    fn test_secure_websocket_is_rejected() {
        let cli = Cli::parse_from(["tvdeck", "deck.json", "--notify", "wss://recon.example/ws"]);
        assert!(cli
            .launch_options("deck.json".into(), &Config::default())
            .is_err());
    }

    #[test]
    fn test_check_subcommand_parses() {
        let cli = Cli::parse_from(["tvdeck", "check", "deck.json", "--width", "1280"]);
        match cli.command {
            Some(Commands::Check { source, width, height }) => {
                assert_eq!(source, "deck.json");
                assert_eq!(width, 1280);
                assert_eq!(height, 1080);
            }
            _ => panic!("expected check"),
        }
    }
}
