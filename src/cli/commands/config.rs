//! Effective configuration dump.

use std::path::Path;

use crate::config::{self, Config, config_path};
use crate::error::ResultExt;

/// Print where the config is read from and the values in effect.
///
/// With `save`, the values are written back first: to `path` when given,
/// otherwise to the default config file.
pub fn cmd_config(config: &Config, path: Option<&Path>, save: bool) -> anyhow::Result<()> {
    if save {
        match path {
            Some(p) => config::save_to(config, p),
            None => config::save(config),
        }
        .with_context("saving configuration")?;
    }

    let source = path.map(Path::to_path_buf).or_else(config_path);
    match source {
        Some(p) if p.exists() => println!("# Loaded from {}", p.display()),
        Some(p) => println!("# {} not found, showing defaults", p.display()),
        None => println!("# No config directory, showing defaults"),
    }
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
