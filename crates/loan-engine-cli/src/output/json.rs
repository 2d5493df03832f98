use std::io::{self, Write};

use serde_json::Value;

/// Write the full computation envelope as indented JSON to stdout.
pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    if let Err(e) = write_json(&mut stdout.lock(), value) {
        eprintln!("Failed to write JSON output: {}", e);
    }
}

/// Indented JSON followed by a newline. Decimal amounts are already strings
/// in the envelope, so no precision is lost.
pub(crate) fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()
}
