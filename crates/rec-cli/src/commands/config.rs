//! Config command: show the effective configuration.

use std::io::Write;

use anyhow::{Context, Result};

use crate::Config;

/// Prints the configuration as TOML with the password redacted.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let rendered =
        toml::to_string_pretty(&config.redacted()).context("failed to serialize config")?;
    write!(writer, "{rendered}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_command_hides_the_password() {
        let config = Config {
            password: "hunter2".to_string(),
            ..Config::default()
        };
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(!output.contains("hunter2"));
        assert!(output.contains("password = \"[REDACTED]\""));
        assert!(output.contains("host = \"localhost\""));
        assert!(output.contains("port = 4455"));
    }
}
