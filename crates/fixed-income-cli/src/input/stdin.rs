use serde_json::Value;
use std::io::{self, Read};

/// Request body piped into `fia`, as in `cat bond.json | fia price-bond`.
/// `None` when stdin is a terminal or nothing was piped.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut body = String::new();
    io::stdin().lock().read_to_string(&mut body)?;
    let body = body.trim();
    if body.is_empty() {
        return Ok(None);
    }

    tracing::debug!(bytes = body.len(), "parsing piped request");
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| format!("Piped input is not valid JSON: {e}").into())
}
