//! Configuration file and environment loading.

use anyhow::{Context, Result};
use core_runtime::AgentConfig;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "music2db";
const ENV_PREFIX: &str = "MUSIC2DB";

/// `$XDG_CONFIG_HOME/music2db/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// `$XDG_STATE_HOME/music2db/snapshot.json`, falling back to the local data
/// directory on platforms without a state directory.
pub fn default_state_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join(APP_DIR).join("snapshot.json"))
}

/// Load the agent configuration.
///
/// Sources, lowest precedence first: built-in defaults, the TOML file
/// (`path`, or the default location if it exists), then `MUSIC2DB__*`
/// environment variables with `__` separating nested keys
/// (`MUSIC2DB__REMOTE__URL`).
pub fn load(path: Option<&Path>) -> Result<AgentConfig> {
    let mut builder = config::Config::builder();

    if let Some(state_path) = default_state_path() {
        builder = builder.set_default("state_path", state_path.to_string_lossy().into_owned())?;
    }

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(default) = default_config_path() {
                builder = builder.add_source(config::File::from(default).required(false));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("extensions")
            .try_parsing(true),
    );

    let config: AgentConfig = builder
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("invalid configuration")?;

    Ok(config)
}
