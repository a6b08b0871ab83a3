use std::io::IsTerminal;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::time::Duration;
use tracing::info_span;

use crate::config;
use crate::constants;
use crate::devices;
use crate::discovery::ports::SystemPorts;
use crate::shell::{self, ShellArgs, repl::ReplHost};
use crate::util::{logging, shutdown::SHUTDOWN};

#[derive(Parser)]
#[command(name = "odrivetool")]
#[command(version, about = "Interactive shell and utilities for ODrive motor controllers", long_about = None)]
struct Cli {
    /// Print debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive shell (default)
    Shell(DeviceOpts),

    /// List connected devices and exit
    Devices(DeviceOpts),

    /// Print the firmware enum constants
    Enums {
        /// Only print one group, e.g. AxisState
        #[arg(short, long)]
        group: Option<String>,

        /// Decode an error bit mask of the given group, e.g. 0x140
        #[arg(short, long, requires = "group")]
        decode: Option<String>,
    },

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the active configuration
    Show,
    /// Clear all config and shell history from the system
    Clear,
}

#[derive(Args, Default)]
struct DeviceOpts {
    /// Where to look for devices: usb, usb:idVendor=..,idProduct=.., serial or serial:<port>.
    /// Several entries may be given separated by commas
    #[arg(short, long)]
    path: Option<String>,

    /// Only connect to the device with this serial number
    #[arg(short, long)]
    serial_number: Option<String>,
}

impl DeviceOpts {
    fn resolve(self, config: &config::Config) -> ShellArgs {
        ShellArgs {
            path: self.path.unwrap_or_else(|| config.default_path.clone()),
            serial_number: self.serial_number,
        }
    }
}

pub async fn cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    logging::init_tracing(&config.log_level, cli.verbose);

    match cli.command.unwrap_or(Commands::Shell(DeviceOpts::default())) {
        Commands::Shell(opts) => {
            let args = opts.resolve(&config);
            let logger = info_span!("shell", path = %args.path);
            let host = ReplHost::new(
                Arc::new(SystemPorts),
                Duration::from_millis(config.discovery_interval_ms),
            )
            .with_history(config.history_path())
            .with_ansi(std::io::stdout().is_terminal());

            shell::launch_shell(&host, args, logger, SHUTDOWN.clone()).await?
        }
        Commands::Devices(opts) => {
            let args = opts.resolve(&config);
            let found = devices::list_devices(Arc::new(SystemPorts), &args).await?;
            devices::print_devices_table(&found);
        }
        Commands::Enums {
            group: Some(group),
            decode: Some(mask),
        } => {
            for name in constants::decode_mask(&group, &mask)? {
                println!("{name}");
            }
        }
        Commands::Enums { group, .. } => constants::print_constants(group.as_deref())?,
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => println!("{}", serde_json::to_string_pretty(&config)?),
            ConfigCommands::Clear => config::Config::clear()?,
        },
        Commands::Version => {
            println!("odrivetool version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_shell() {
        let cli = Cli::try_parse_from(["odrivetool"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_shell_options_override_config() {
        let cli = Cli::try_parse_from([
            "odrivetool",
            "shell",
            "--path",
            "serial:/dev/ttyUSB0",
            "--serial-number",
            "2061377C3548",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Some(Commands::Shell(opts)) = cli.command else {
            panic!("expected shell command");
        };
        let args = opts.resolve(&config::Config::default());
        assert_eq!(args.path, "serial:/dev/ttyUSB0");
        assert_eq!(args.serial_number.as_deref(), Some("2061377C3548"));
    }

    #[test]
    fn test_decode_requires_group() {
        assert!(Cli::try_parse_from(["odrivetool", "enums", "--decode", "0x40"]).is_err());
        let cli =
            Cli::try_parse_from(["odrivetool", "enums", "-g", "AxisError", "-d", "0x40"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Enums { decode: Some(_), .. })
        ));
    }

    #[test]
    fn test_path_defaults_from_config() {
        let config = config::Config {
            default_path: "serial".to_string(),
            ..Default::default()
        };
        let args = DeviceOpts::default().resolve(&config);
        assert_eq!(args, ShellArgs::new("serial"));
    }
}
