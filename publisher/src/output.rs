//! User-facing status lines.

use std::fmt::Display;
use std::io::Write;

/// Write `message` and a newline to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Write a `Step N: ...` progress line.
pub fn write_step(stderr: &mut dyn Write, step: usize, message: impl Display) {
    write_stderr_line(stderr, format!("Step {step}: {message}"));
}
