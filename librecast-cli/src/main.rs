//! librecast: control client for librecastd.
//!
//! # Usage
//!
//! ```text
//! librecast stop      # shut the daemon down
//! librecast reload    # re-read the daemon's config file
//! ```
//!
//! The exit status is always 0; the outcome is the printed message.

mod commands;

use clap::error::ErrorKind;
use clap::Parser;

use librecast_core::{describe, ErrorCode};

#[derive(Parser, Debug)]
#[command(
    name = "librecast",
    version,
    about = "Send stop or reload to a running librecastd",
    long_about = None,
)]
struct Cli {
    /// `stop` or `reload`.
    #[arg(value_name = "COMMAND")]
    args: Vec<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return;
        }
        Err(_) => {
            println!("{}", describe(ErrorCode::InvalidArgs, None));
            return;
        }
    };

    let [verb] = cli.args.as_slice() else {
        println!("{}", describe(ErrorCode::InvalidArgs, None));
        return;
    };

    commands::control::run(verb);
}
