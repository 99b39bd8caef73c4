use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use simmer::config::{Config, ConfigLoader};
use simmer::server::{self, ServerOptions};
use simmer::{client, logging};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Bridges a serial-attached thermal controller to HTTP.",
    long_about = "Streams the device's output to stdout, reconnecting whenever it drops, and accepts set-point commands over HTTP. Run without a subcommand to start the server."
)]
struct Cli {
    /// Configuration file (defaults to SIMMER_CONFIG, ./simmer.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the bridge (default).
    Server(ServerArgs),
    /// Send a new set-point (0-1023) to a running server.
    SetTemp(SetTempArgs),
}

#[derive(Args, Debug, Default)]
struct ServerArgs {
    /// Device name under /dev, or a full path. Discovered when omitted.
    #[arg(long)]
    device: Option<String>,

    /// Listen address, e.g. :6077 or 127.0.0.1:6077.
    #[arg(long)]
    addr: Option<String>,
}

#[derive(Args, Debug)]
struct SetTempArgs {
    /// Server address, e.g. localhost:6077.
    #[arg(long)]
    addr: Option<String>,

    /// Target value, a decimal integer in 0..=1023.
    value: String,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    let loader = match path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(loader.into_config())
}

/// Flags win over config values.
fn server_options(config: &Config, args: ServerArgs) -> ServerOptions {
    ServerOptions {
        device: args.device.or_else(|| config.serial.device.clone()),
        pattern: config.serial.pattern.clone(),
        addr: args.addr.unwrap_or_else(|| config.server.addr.clone()),
        read_timeout: config.serial.read_timeout(),
    }
}

fn client_addr(config: &Config, args: &SetTempArgs) -> String {
    args.addr.clone().unwrap_or_else(|| config.client.addr.clone())
}

fn run_server(config: Config, args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let opts = server_options(&config, args);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::run(opts))?;
    Ok(())
}

fn run_set_temp(config: Config, args: SetTempArgs) -> Result<(), Box<dyn std::error::Error>> {
    let addr = client_addr(&config, &args);
    client::send_set_temp(&addr, &args.value, config.client.timeout())?;
    println!("ok");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("simmer: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("simmer: failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        None => run_server(config, ServerArgs::default()),
        Some(Command::Server(args)) => run_server(config, args),
        Some(Command::SetTemp(args)) => run_set_temp(config, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("simmer: {e}");
            ExitCode::FAILURE
        }
    }
}
