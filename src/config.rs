//! Library update configuration.
//!
//! Configuration can be built in code through [`UpdaterConfigBuilder`] or read
//! from a JSON file. Missing fields take their defaults.
//!
//! ```json
//! {
//!     "concurrency": 8,
//!     "delete_removed_downloads": true,
//!     "download_dir": "/srv/manga/downloads"
//! }
//! ```

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Settings of the [`LibraryUpdater`](crate::updater::LibraryUpdater).
///
/// # Builder Usage
///
/// ```rust
/// use hondana::config::UpdaterConfigBuilder;
///
/// let config = UpdaterConfigBuilder::default()
///     .concurrency(2usize)
///     .delete_removed_downloads(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct UpdaterConfig {
    /// Maximum number of manga updated at the same time
    #[builder(default = "default_concurrency()")]
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Remove downloads of chapters the source no longer lists
    #[builder(default)]
    #[serde(default)]
    pub delete_removed_downloads: bool,

    /// Root directory of downloaded chapters
    #[builder(default = "default_download_dir()")]
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

fn default_concurrency() -> usize {
    5
}

fn default_download_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hondana")
        .join("downloads")
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            delete_removed_downloads: false,
            download_dir: default_download_dir(),
        }
    }
}

impl UpdaterConfig {
    /// Reads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// * [`Error::Io`] - The file cannot be read
    /// * [`Error::Json`] - The file is not valid JSON
    /// * [`Error::Config`] - A value is out of range
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: UpdaterConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration from `path`, or returns the defaults if the
    /// file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_json_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Checks that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}
