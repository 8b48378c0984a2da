use std::path::PathBuf;

use thiserror::Error;

/// Malformed `name,size,seed` input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("no files specified")]
    Empty,

    #[error("expected name,size,seed but got {0:?}")]
    MissingField(String),

    #[error("too many fields in {0:?}")]
    TooManyFields(String),

    #[error("invalid name {0:?}")]
    InvalidName(String),

    #[error("invalid size {0:?}")]
    InvalidSize(String),

    #[error("invalid seed {0:?}")]
    InvalidSeed(String),
}

/// A file that cannot be served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid name {0:?}")]
    InvalidName(String),

    #[error("file {0:?} has zero size")]
    ZeroSize(String),

    #[error("file {0:?} has zero seed")]
    ZeroSeed(String),

    #[error("file {name:?} of {size} bytes exceeds the {max} byte limit")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("duplicate file name {0:?}")]
    Duplicate(String),

    #[error("no files registered")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
