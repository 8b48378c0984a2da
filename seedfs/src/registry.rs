//! File registry
//!
//! The set of served files is fixed before the mount starts. [`RegistryBuilder`] validates
//! each [`FileSpec`] once; the resulting [`Registry`] is immutable and is shared by `Arc`
//! between the filesystem and anything else that needs to resolve names.

use std::collections::HashMap;

use crate::content::BlockLayout;
use crate::error::RegistryError;
use crate::read;

/// A virtual file: its name, its size in bytes, and the seed its content derives from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSpec {
    name: String,
    size: u64,
    seed: u32,
}

impl FileSpec {
    pub fn new(name: impl Into<String>, size: u64, seed: u32) -> Result<Self, RegistryError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if size == 0 {
            return Err(RegistryError::ZeroSize(name));
        }
        if seed == 0 {
            return Err(RegistryError::ZeroSeed(name));
        }
        Ok(Self { name, size, seed })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

/// Names live directly under the mount root, so they are single path components.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\0'])
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    layout: BlockLayout,
    files: Vec<FileSpec>,
    by_name: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn layout(mut self, layout: BlockLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn add(&mut self, spec: FileSpec) -> Result<&mut Self, RegistryError> {
        let max = self.layout.max_file_size();
        if spec.size > max {
            return Err(RegistryError::TooLarge {
                name: spec.name,
                size: spec.size,
                max,
            });
        }
        if self.by_name.contains_key(&spec.name) {
            return Err(RegistryError::Duplicate(spec.name));
        }
        self.by_name.insert(spec.name.clone(), self.files.len());
        self.files.push(spec);
        Ok(self)
    }

    pub fn extend<I>(&mut self, specs: I) -> Result<&mut Self, RegistryError>
    where
        I: IntoIterator<Item = FileSpec>,
    {
        for spec in specs {
            self.add(spec)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        if self.files.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Registry {
            layout: self.layout,
            files: self.files,
            by_name: self.by_name,
        })
    }
}

/// Immutable, name-indexed set of files, kept in registration order.
#[derive(Debug)]
pub struct Registry {
    layout: BlockLayout,
    files: Vec<FileSpec>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build a registry over the default layout in one go.
    pub fn from_specs<I>(specs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = FileSpec>,
    {
        let mut builder = Self::builder();
        builder.extend(specs)?;
        builder.build()
    }

    pub fn layout(&self) -> BlockLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FileSpec> {
        self.position(name).map(|i| &self.files[i])
    }

    /// Registration-order index of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get_index(&self, index: usize) -> Option<&FileSpec> {
        self.files.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileSpec> {
        self.files.iter()
    }

    /// Read from `spec` using this registry's layout.
    pub fn read(&self, spec: &FileSpec, offset: u64, len: usize) -> Vec<u8> {
        read::read_with(self.layout, spec, offset, len)
    }

    pub fn read_into(&self, spec: &FileSpec, offset: u64, buf: &mut [u8]) -> usize {
        read::read_into_with(self.layout, spec, offset, buf)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a FileSpec;
    type IntoIter = std::slice::Iter<'a, FileSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
