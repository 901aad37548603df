use serde_json::Value;
use std::io::{self, Write};

/// Write the result as indented JSON: the full envelope with methodology,
/// assumptions and warnings for the analytics commands, the bare value for
/// curve and day-count utilities.
pub fn print_json(value: &Value) {
    let mut out = io::stdout().lock();
    let written = serde_json::to_writer_pretty(&mut out, value)
        .map_err(io::Error::from)
        .and_then(|()| writeln!(out));
    if let Err(e) = written {
        eprintln!("Failed to write JSON output: {e}");
    }
}
