//! `shimgen config`: print the effective configuration.

use anyhow::{Context, Result};
use shimgen_core::GeneratorConfig;

pub fn run(config: &GeneratorConfig) -> Result<()> {
    let text = config.to_toml().context("serializing configuration")?;
    print!("{text}");
    Ok(())
}
