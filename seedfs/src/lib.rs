//! SeedFS: a read-only FUSE filesystem whose files hold deterministic pseudo-random data.
//!
//! File content is never stored. Each file is cut into fixed-size blocks and every block is
//! regenerated from `(file seed, block index)` whenever a read touches it, so two mounts with
//! the same file list serve identical bytes on any machine.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod fuse;
pub mod read;
pub mod registry;
pub mod spec;

pub use content::{Block, BlockLayout, generate_block};
pub use error::{ConfigError, RegistryError, SpecError};
pub use read::{read, read_into};
pub use registry::{FileSpec, Registry};
