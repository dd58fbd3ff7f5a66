//! Layered settings
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. `craft-tree.toml` in the working directory, or an explicit `--config` file
//! 3. Environment variables: `CRAFT_TREE_*` prefix
//!
//! Command line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::tree::DEFAULT_MAX_DEPTH;

pub const DEFAULT_CONFIG_FILE: &str = "craft-tree";
pub const DEFAULT_DATABASE: &str = "craft_tree.db";
const ENV_PREFIX: &str = "CRAFT_TREE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// SQLite database holding games, items and recipes
    pub database: PathBuf,
    /// Deepest level a recipe tree is expanded to
    pub max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Settings {
    /// Load settings. An explicit `file` must exist; the default file is optional.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("database", defaults.database.to_string_lossy().into_owned())?
            .set_default("max_depth", defaults.max_depth as i64)?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
