pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a command's input from `--input <file>` or, failing that, from JSON
/// piped on stdin.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    command: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        tracing::debug!(command, path, "reading input file");
        return file::read_file(path);
    }
    match stdin::read_stdin()? {
        Some(value) => {
            tracing::debug!(command, "reading input from stdin");
            Ok(serde_json::from_value(value)?)
        }
        None => Err(format!("--input <file.json|file.yaml> or stdin required for {command}").into()),
    }
}
