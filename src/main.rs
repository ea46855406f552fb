//! gocart - a Cargo-flavoured front end for the Go toolchain
//!
//! Commands map onto `go build`, `go test`, `go get` and `go mod`. The test
//! command parses `go test -json` output and prints cargo-style progress and
//! a per-package summary.
//!
//! ## Architecture
//!
//! ```text
//! go test -json → exec::subprocess pump → testing::driver → analyzer → reporter
//! ```

mod cli;
mod commands;
mod config;
mod error;
mod exec;
mod logging;
mod testing;
mod utils;

use clap::Parser;

use cli::Cli;
use error::GocartError;
use utils::terminal::print_error;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.execute() {
        match err.downcast_ref::<GocartError>() {
            Some(gocart_err) => gocart_err.display_with_hints(),
            None => print_error(&format!("{:#}", err)),
        }
        std::process::exit(1);
    }
}
