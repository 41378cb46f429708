//! stremio-remote - control Stremio on Android TV over ADB
//!
//! # Usage
//!
//! ```bash
//! stremio-remote --host 192.168.1.50 connect
//! stremio-remote play tt0111161
//! stremio-remote watch "breaking bad" -t tv -s 1 -e 1
//! stremio-remote status --json
//! ```

use clap::Parser;

use stremio_remote::cli::{Cli, Command, ExitCode, Output};
use stremio_remote::commands::{self, Context};
use stremio_remote::logging::{self, LoggingMode};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(LoggingMode::from_verbosity(cli.verbose)) {
        eprintln!("Warning: {}", e);
    }

    run_cli(cli).await.into()
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);

    let config = match commands::load_config(&cli) {
        Ok(config) => config,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };
    let ctx = Context::new(config);

    match cli.command {
        Command::Connect(cmd) => commands::connect_cmd(cmd, &ctx, &output).await,

        Command::Disconnect(cmd) => commands::disconnect_cmd(cmd, &ctx, &output).await,

        Command::Key(cmd) => commands::key_cmd(cmd, &ctx, &output).await,

        Command::Keys(cmd) => commands::keys_cmd(cmd, &output).await,

        Command::Launch(cmd) => commands::launch_cmd(cmd, &ctx, &output).await,

        Command::Play(cmd) => commands::play_cmd(cmd, &ctx, &output).await,

        Command::Watch(cmd) => commands::watch_cmd(cmd, &ctx, &output).await,

        Command::Search(cmd) => commands::search_cmd(cmd, &ctx, &output).await,

        Command::Status(cmd) => commands::status_cmd(cmd, &ctx, &output).await,

        Command::Volume(cmd) => commands::volume_cmd(cmd, &ctx, &output).await,

        Command::Power(cmd) => commands::power_cmd(cmd, &ctx, &output).await,
    }
}
