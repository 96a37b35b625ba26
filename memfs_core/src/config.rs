//! Engine configuration.

use crate::error::{Error, Result};
use crate::node::{FileMode, file_modes};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parameters fixed when an engine instance is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Owner uid recorded on every object the engine creates.
    pub owner: u32,
    /// Permission bits of the root directory.
    pub root_mode: FileMode,
    /// Upper bound on the logical size of any regular file.
    pub max_file_size: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            owner: 0,
            root_mode: file_modes::DIRECTORY,
            max_file_size: u64::MAX,
        }
    }
}

impl FsConfig {
    /// Parse a `key=value` config document.
    ///
    /// Blank lines and `#` comments are skipped, `version=1` is required,
    /// and unknown keys are ignored. Missing keys keep their defaults.
    ///
    /// ```
    /// use memfs_core::FsConfig;
    ///
    /// let config = FsConfig::parse("version=1\nowner=1000\nroot_mode=0700\n").unwrap();
    /// assert_eq!(config.owner, 1000);
    /// assert_eq!(config.root_mode, 0o700);
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let mut version = None;
        let mut config = FsConfig::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::invalid_config(format!("Malformed line: {}", line)));
            };
            let value = value.trim();

            match key.trim() {
                "version" => version = Some(value.to_string()),
                "owner" => config.owner = parse_number(key, value, 10)?,
                "root_mode" => config.root_mode = parse_mode(value)?,
                "max_file_size" => config.max_file_size = parse_number(key, value, 10)?,
                _ => {}
            }
        }

        if version.as_deref() != Some("1") {
            return Err(Error::invalid_config(format!(
                "Unsupported config version: {:?}",
                version
            )));
        }

        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Render in the format accepted by [`FsConfig::parse`].
    pub fn to_config_string(&self) -> String {
        format!(
            "version=1\nowner={}\nroot_mode=0{:o}\nmax_file_size={}\n",
            self.owner, self.root_mode, self.max_file_size
        )
    }
}

fn parse_number<T>(key: &str, value: &str, radix: u32) -> Result<T>
where
    T: TryFrom<u64>,
{
    u64::from_str_radix(value, radix)
        .ok()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| Error::invalid_config(format!("Invalid {}: {}", key.trim(), value)))
}

fn parse_mode(value: &str) -> Result<FileMode> {
    let digits = value
        .strip_prefix("0o")
        .or_else(|| value.strip_prefix('0'))
        .unwrap_or(value);
    // "0" alone strips down to nothing.
    let digits = if digits.is_empty() { "0" } else { digits };

    let mode: FileMode = parse_number("root_mode", digits, 8)?;
    if mode & !file_modes::PERMISSION_MASK != 0 {
        return Err(Error::invalid_config(format!(
            "root_mode has non-permission bits: {}",
            value
        )));
    }
    Ok(mode)
}
