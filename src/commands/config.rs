use super::RunOptions;
use anyhow::{Context, Result};

pub fn run(options: &RunOptions, save: bool) -> Result<()> {
    let config = options.load_config()?;
    print!("{}", toml::to_string_pretty(&config).context("Failed to encode configuration")?);

    if save {
        let path = config.save()?;
        eprintln!("Configuration saved to {}", path.display());
    }
    Ok(())
}
