//! NanoPivot CLI entry point
//!
//! Parses arguments, dispatches through `cli::run`, prints errors to
//! stderr and exits non-zero on failure. No logic lives here.

use nanopivot::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
