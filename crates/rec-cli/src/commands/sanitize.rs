//! Sanitize command: show the folder a window title sorts into.

use std::io::Write;

use anyhow::Result;
use rec_core::sanitize;

use crate::Config;

/// Prints the sanitized, shorthand-mapped folder name for `title`.
pub fn run<W: Write>(writer: &mut W, title: &str, config: &Config) -> Result<()> {
    writeln!(writer, "{}", sanitize(title, &config.shorthand))?;
    Ok(())
}
