//! JSON I/O handling for the `query` command
//!
//! - Input: single JSON object via stdin
//! - Output: single JSON object via stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read one JSON request line from `input`
pub fn read_request<T: DeserializeOwned, R: BufRead>(input: &mut R) -> CliResult<T> {
    let mut line = String::new();
    input.read_line(&mut line)?;

    if line.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    Ok(serde_json::from_str(&line)?)
}

/// Success envelope
pub fn ok_envelope(data: Value) -> Value {
    serde_json::json!({
        "status": "ok",
        "data": data
    })
}

/// Error envelope
pub fn error_envelope(code: &str, message: &str) -> Value {
    serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write one envelope line to `out`
pub fn write_envelope<W: Write>(out: &mut W, envelope: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, envelope)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_envelope(&mut io::stdout(), &ok_envelope(data))
}
