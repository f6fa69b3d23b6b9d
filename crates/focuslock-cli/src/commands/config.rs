/// Configuration display
use anyhow::Result;
use focuslock_core::{config::default_config_path, Config};
use std::path::Path;

pub fn show_config(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    let config = Config::load(Some(&path))?;

    let origin = if path.exists() { "" } else { " (not found, defaults)" };
    println!("# {}{origin}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}
