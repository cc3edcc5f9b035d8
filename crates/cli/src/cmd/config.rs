//! Configuration commands

use crate::config::{self, Config};
use anyhow::{Context, Result};
use std::path::Path;

/// Print the effective configuration as TOML
///
/// Output stays plain so it can be redirected into a config file.
pub fn run_show(config: &Config, source: Option<&Path>) -> Result<()> {
    let rendered = config.to_toml().context("Failed to render configuration")?;
    match source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file; built-in defaults"),
    }
    println!("# Environment variables and flags are applied\n");
    print!("{}", rendered);
    Ok(())
}

/// Print the annotated example configuration
pub fn run_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}
