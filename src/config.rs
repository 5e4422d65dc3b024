//! Environment-driven resolution of the data home and per-module directories.
//!
//! Resolution order for the data home:
//!
//! 1. `GRAPHSTOW_HOME`, when set
//! 2. the platform user data directory, when `GRAPHSTOW_USE_APPDIRS` is `true`
//! 3. `$HOME/<GRAPHSTOW_NAME>`, where the name defaults to `.data`
//!
//! A module directory is `<KEY>_HOME` when that variable is set, otherwise the
//! module key joined onto the home (or onto the user data directory in appdirs
//! mode).
//!
//! # Examples
//!
//! ```rust
//! use graphstow::config::StowConfig;
//!
//! let cfg = StowConfig::default().with_home("/tmp/graphstow-doc");
//! let base = cfg.base("pykeen", false).unwrap();
//! assert_eq!(base, std::path::PathBuf::from("/tmp/graphstow-doc/pykeen"));
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tracing::debug;

use crate::errors::{StowError, StowResult};

/// Overrides the data home entirely.
pub const HOME_ENVVAR: &str = "GRAPHSTOW_HOME";

/// Folder name created under the user home when no override is present.
pub const NAME_ENVVAR: &str = "GRAPHSTOW_NAME";

/// Set to `true` to use the platform user data directory.
pub const USE_APPDIRS_ENVVAR: &str = "GRAPHSTOW_USE_APPDIRS";

pub const NAME_DEFAULT: &str = ".data";

const MODULE_ENVVAR_SUFFIX: &str = "_HOME";

const README_NAME: &str = "README.md";

const README_TEXT: &str = "# graphstow data directory

This directory is used by `graphstow` as a reproducible location to store and
access data. Each module gets its own subdirectory.

Set `GRAPHSTOW_NAME` to change the folder name under your home directory, or
`GRAPHSTOW_HOME` to move the whole data home elsewhere. A single module can be
relocated with `<MODULE>_HOME`. When `GRAPHSTOW_HOME` is set, `GRAPHSTOW_NAME`
is disregarded.
";

/// Resolved directory configuration.
///
/// [`StowConfig::from_env`] snapshots the process environment; the builder
/// methods allow constructing a configuration without touching it.
#[derive(Clone, Debug)]
pub struct StowConfig {
    /// Explicit data home (`GRAPHSTOW_HOME`)
    pub home: Option<PathBuf>,
    /// Folder name under the user home (`GRAPHSTOW_NAME`)
    pub name: String,
    /// Use the platform data directory (`GRAPHSTOW_USE_APPDIRS`)
    pub use_appdirs: bool,
    /// Per-module overrides keyed by upper-cased module key (`<KEY>_HOME`)
    pub module_homes: AHashMap<String, PathBuf>,
}

impl Default for StowConfig {
    fn default() -> Self {
        Self {
            home: None,
            name: NAME_DEFAULT.to_string(),
            use_appdirs: false,
            module_homes: AHashMap::new(),
        }
    }
}

impl StowConfig {
    pub fn from_env() -> Self {
        let mut module_homes = AHashMap::new();
        for (var, value) in env::vars_os() {
            let (Some(var), Some(value)) = (var.to_str(), value.to_str()) else {
                continue;
            };
            if var == HOME_ENVVAR || value.is_empty() {
                continue;
            }
            if let Some(key) = var.strip_suffix(MODULE_ENVVAR_SUFFIX) {
                if !key.is_empty() {
                    module_homes.insert(key.to_string(), PathBuf::from(value));
                }
            }
        }

        Self {
            home: env::var_os(HOME_ENVVAR)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            name: get_name(),
            use_appdirs: use_appdirs(),
            module_homes,
        }
    }

    pub fn with_home<P: Into<PathBuf>>(mut self, home: P) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_name<T: Into<String>>(mut self, name: T) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_module_home<P: Into<PathBuf>>(mut self, key: &str, path: P) -> Self {
        self.module_homes.insert(key.to_uppercase(), path.into());
        self
    }

    /// The data home directory.
    pub fn home(&self, ensure_exists: bool) -> StowResult<PathBuf> {
        let home = match &self.home {
            Some(path) => expand_user(path)?,
            None if self.use_appdirs => user_data_dir()?,
            None => user_home()?.join(&self.name),
        };
        debug!(home = %home.display(), "resolved data home");
        mkdir(&home, ensure_exists)?;
        Ok(home)
    }

    /// The base directory for the module named `key`.
    ///
    /// Keys must be non-empty and may not contain a dot.
    pub fn base(&self, key: &str, ensure_exists: bool) -> StowResult<PathBuf> {
        validate_key(key)?;
        let base = match self.module_homes.get(&key.to_uppercase()) {
            Some(path) => expand_user(path)?,
            None if self.use_appdirs && self.home.is_none() => user_data_dir()?.join(key),
            None => self.home(false)?.join(key),
        };
        debug!(key, base = %base.display(), "resolved module directory");
        mkdir(&base, ensure_exists)?;
        Ok(base)
    }

    /// Write a README into the data home unless one is already present.
    pub fn ensure_readme(&self) -> StowResult<PathBuf> {
        let path = self.home(true)?.join(README_NAME);
        if !path.is_file() {
            fs::write(&path, README_TEXT)?;
        }
        Ok(path)
    }
}

pub fn get_home(ensure_exists: bool) -> StowResult<PathBuf> {
    StowConfig::from_env().home(ensure_exists)
}

pub fn get_base(key: &str, ensure_exists: bool) -> StowResult<PathBuf> {
    StowConfig::from_env().base(key, ensure_exists)
}

pub fn get_name() -> String {
    env::var(NAME_ENVVAR)
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| NAME_DEFAULT.to_string())
}

pub fn use_appdirs() -> bool {
    matches!(env::var(USE_APPDIRS_ENVVAR).as_deref(), Ok("true" | "True"))
}

pub fn validate_key(key: &str) -> StowResult<()> {
    if key.is_empty() {
        return Err(StowError::invalid_input("module key must not be empty"));
    }
    if key.contains('.') {
        return Err(StowError::invalid_input(format!(
            "module key must not contain a dot: {key}"
        )));
    }
    Ok(())
}

/// Versions become path components, so separators are rejected.
pub fn validate_version(version: &str) -> StowResult<()> {
    if version.is_empty() {
        return Err(StowError::invalid_input("version must not be empty"));
    }
    if version.contains('/') || version.contains(std::path::MAIN_SEPARATOR) {
        return Err(StowError::invalid_input(format!(
            "slashes and `{}` are not allowed in versions: {version}",
            std::path::MAIN_SEPARATOR
        )));
    }
    Ok(())
}

/// Replace a leading `~` with the user home directory.
pub fn expand_user(path: &Path) -> StowResult<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(user_home()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}

pub fn mkdir(path: &Path, ensure_exists: bool) -> StowResult<()> {
    if ensure_exists {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn user_home() -> StowResult<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| StowError::invalid_input("could not determine the user home directory"))
}

fn user_data_dir() -> StowResult<PathBuf> {
    dirs::data_dir()
        .ok_or_else(|| StowError::invalid_input("could not determine the user data directory"))
}
