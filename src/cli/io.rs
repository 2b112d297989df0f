//! JSON output for the CLI
//!
//! Every successful command writes a single JSON object to stdout:
//! `{"status": "ok", "data": ...}`. Errors go to stderr from `main`.

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
