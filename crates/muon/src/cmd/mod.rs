//! CLI commands

pub mod check;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use muon_config::Config;

use serve::ServeArgs;

/// Paths tried when no `--config` is given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/muon.toml", "muon.toml"];

/// Resolve and load the configuration, then apply command-line overrides
///
/// An explicit path must exist. Without one, the default paths are tried
/// and built-in defaults are used if none exists.
pub fn load_config(path: Option<&Path>, args: &ServeArgs) -> Result<Config> {
    let path = match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists()),
    };

    Config::load(path.as_deref(), |config| args.apply(config))
        .context("failed to load configuration")
}
