//! Mount configuration.
//!
//! Files and mount options can come from the command line, from a YAML file, or from both.
//! A config file looks like:
//!
//! ```yaml
//! fs_name: seedfs
//! allow_other: false
//! files:
//!   - name: testfile_1M
//!     size: 1M
//!     seed: 1
//!   - name: testfile_1G
//!     size: 1073741824
//!     seed: "0x02"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::content::BlockLayout;
use crate::error::ConfigError;
use crate::registry::{FileSpec, Registry};
use crate::spec::{parse_seed, parse_size};

pub const DEFAULT_FS_NAME: &str = "seedfs";

/// A number given either as a YAML integer or as text in file-list syntax.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileEntry {
    pub name: String,
    pub size: NumberOrText,
    pub seed: NumberOrText,
}

impl FileEntry {
    pub fn to_file_spec(&self) -> Result<FileSpec, ConfigError> {
        let size = match &self.size {
            NumberOrText::Number(n) => *n,
            NumberOrText::Text(t) => parse_size(t)?,
        };
        let seed = match &self.seed {
            NumberOrText::Number(n) => parse_seed(&n.to_string())?,
            NumberOrText::Text(t) => parse_seed(t)?,
        };
        Ok(FileSpec::new(self.name.clone(), size, seed)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedFsConfig {
    pub fs_name: Option<String>,
    pub allow_other: bool,
    pub privileged: bool,
    pub files: Vec<FileEntry>,
}

impl SeedFsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn file_specs(&self) -> Result<Vec<FileSpec>, ConfigError> {
        self.files.iter().map(FileEntry::to_file_spec).collect()
    }
}

/// Options handed to the FUSE session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSettings {
    pub fs_name: String,
    pub allow_other: bool,
    pub privileged: bool,
}

impl Default for MountSettings {
    fn default() -> Self {
        Self {
            fs_name: DEFAULT_FS_NAME.to_string(),
            allow_other: false,
            privileged: false,
        }
    }
}

impl MountSettings {
    /// Command-line switches can only turn options on; the config file fills in the rest.
    pub fn merge(config: &SeedFsConfig, allow_other: bool, privileged: bool) -> Self {
        Self {
            fs_name: config
                .fs_name
                .clone()
                .unwrap_or_else(|| DEFAULT_FS_NAME.to_string()),
            allow_other: allow_other || config.allow_other,
            privileged: privileged || config.privileged,
        }
    }
}

/// Build the registry from command-line files followed by config-file files.
pub fn build_registry(
    cli_files: Vec<FileSpec>,
    config: &SeedFsConfig,
) -> Result<Registry, ConfigError> {
    let mut builder = Registry::builder().layout(BlockLayout::default());
    builder.extend(cli_files)?;
    builder.extend(config.file_specs()?)?;
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::{RegistryError, SpecError};

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tmp config");
        file.write_all(text.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_load_config() {
        let file = write_config(
            "fs_name: testfuse\nallow_other: true\nfiles:\n  - name: a\n    size: 1M\n    seed: 1\n  - name: b\n    size: 100\n    seed: \"0x02\"\n",
        );
        let config = SeedFsConfig::load(file.path()).unwrap();
        assert_eq!(config.fs_name.as_deref(), Some("testfuse"));
        assert!(config.allow_other);
        assert!(!config.privileged);
        let specs = config.file_specs().unwrap();
        assert_eq!(specs[0], FileSpec::new("a", 1 << 20, 1).unwrap());
        assert_eq!(specs[1], FileSpec::new("b", 100, 2).unwrap());
    }

    #[test]
    fn test_empty_config_is_default() {
        let file = write_config("{}\n");
        let config = SeedFsConfig::load(file.path()).unwrap();
        assert!(config.files.is_empty());
        assert_eq!(MountSettings::merge(&config, false, false), MountSettings::default());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let file = write_config("mountpoint: /mnt\n");
        assert!(matches!(
            SeedFsConfig::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SeedFsConfig::load(dir.path().join("nope.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_bad_entries() {
        let entry = FileEntry {
            name: "a".into(),
            size: NumberOrText::Text("1q".into()),
            seed: NumberOrText::Number(1),
        };
        assert!(matches!(
            entry.to_file_spec(),
            Err(ConfigError::Spec(SpecError::InvalidSize(_)))
        ));
        let entry = FileEntry {
            name: "a".into(),
            size: NumberOrText::Number(0),
            seed: NumberOrText::Number(1),
        };
        assert!(matches!(
            entry.to_file_spec(),
            Err(ConfigError::Registry(RegistryError::ZeroSize(_)))
        ));
    }

    #[test]
    fn test_cli_and_config_files_merge() {
        let config = SeedFsConfig {
            files: vec![FileEntry {
                name: "b".into(),
                size: NumberOrText::Number(10),
                seed: NumberOrText::Number(2),
            }],
            ..Default::default()
        };
        let registry =
            build_registry(vec![FileSpec::new("a", 5, 1).unwrap()], &config).unwrap();
        let names: Vec<&str> = registry.iter().map(FileSpec::name).collect();
        assert_eq!(names, vec!["a", "b"]);

        let clash = build_registry(vec![FileSpec::new("b", 5, 1).unwrap()], &config);
        assert!(matches!(
            clash,
            Err(ConfigError::Registry(RegistryError::Duplicate(_)))
        ));
    }
}
