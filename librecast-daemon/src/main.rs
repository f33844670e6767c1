//! librecastd: IPv6 multicast daemon.
//!
//! ```text
//! librecastd [-c FILE] [-l LEVEL] [-d] [--log-json]
//! librecastd --print-config [--json]
//! librecastd --send MESSAGE
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use librecast_daemon::{print_config, send_once, start_blocking, DaemonOptions};

#[derive(Parser, Debug)]
#[command(
    name = "librecastd",
    version,
    about = "Receive and print datagrams from an IPv6 multicast group",
    long_about = None,
)]
struct Cli {
    /// Config file to read instead of the default location.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level bitmask (1 error, 2 warn, 4 info, 8 debug, 16 trace).
    #[arg(short = 'l', long = "loglevel", value_name = "LEVEL")]
    loglevel: Option<i64>,

    /// Enable debug logging.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long = "log-json")]
    log_json: bool,

    /// Print the effective configuration and exit.
    #[arg(long = "print-config", conflicts_with = "send")]
    print_config: bool,

    /// With --print-config, print JSON instead of key/value lines.
    #[arg(long, requires = "print_config")]
    json: bool,

    /// Send one message to the configured group and exit.
    #[arg(long, value_name = "MESSAGE")]
    send: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = DaemonOptions {
        config_path: cli.config,
        lock_path: None,
        loglevel: cli.loglevel,
        debug: cli.debug,
        log_json: cli.log_json,
    };

    let result = if cli.print_config {
        print_config(&options, cli.json)
    } else if let Some(message) = cli.send.as_deref() {
        send_once(&options, message)
    } else {
        start_blocking(&options)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("librecastd: {}", err.report());
            ExitCode::from(err.exit_code())
        }
    }
}
