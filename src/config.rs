//! Configuration for vdir
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, VdirError};

/// Container file name used for every virtual directory
pub const DEFAULT_FILE_NAME: &str = "00000000.dir";

/// Configuration for opening a virtual directory
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Location
    // -------------------------------------------------------------------------
    /// Virtual directory path. The container lives at:
    ///   {dir}/
    ///     └── 00000000.dir
    pub dir: PathBuf,

    /// Name of the container file inside `dir`
    pub file_name: String,

    /// Create missing directories leading up to `dir`
    pub create_dirs: bool,

    // -------------------------------------------------------------------------
    // Durability
    // -------------------------------------------------------------------------
    /// fsync the container after the index is written on close
    pub sync_on_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            file_name: DEFAULT_FILE_NAME.to_string(),
            create_dirs: true,
            sync_on_close: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the container file
    pub fn container_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Reject file names that would escape `dir`
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(VdirError::Config("container file name is empty".to_string()));
        }
        if self.file_name.contains(['/', '\\']) {
            return Err(VdirError::Config(format!(
                "container file name {:?} contains a path separator",
                self.file_name
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the virtual directory path
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dir = path.into();
        self
    }

    /// Override the container file name
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    /// Enable or disable creation of missing directories
    pub fn create_dirs(mut self, enabled: bool) -> Self {
        self.config.create_dirs = enabled;
        self
    }

    /// Enable or disable fsync on close
    pub fn sync_on_close(mut self, enabled: bool) -> Self {
        self.config.sync_on_close = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
