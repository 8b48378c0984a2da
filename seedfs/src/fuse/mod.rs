//! FUSE adapter
//!
//! Exposes a [`Registry`] as a flat, read-only directory through rfuse3's raw `Filesystem`
//! trait.
//! - The root directory is inode 1. The file at registration index `i` is inode `i + 2`.
//! - Attributes never change after mount, so every reply carries a long TTL.
//! - `read` is the only operation that touches the content engine. It is stateless:
//!   `open` hands out `fh = 0` and the kernel's offset/size go straight to the registry.
//!
//! `mount` holds the session helpers.
pub mod mount;

use std::ffi::{OsStr, OsString};
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use rfuse3::Result as FuseResult;
use rfuse3::raw::Filesystem;
use rfuse3::raw::Request;
use rfuse3::raw::reply::{
    DirectoryEntry, DirectoryEntryPlus, FileAttr, ReplyAttr, ReplyData, ReplyDirectory,
    ReplyDirectoryPlus, ReplyEntry, ReplyInit, ReplyOpen, ReplyStatFs,
};
use rfuse3::{FileType, Timestamp};
use tracing::{debug, warn};

use crate::registry::{FileSpec, Registry};

pub const ROOT_INODE: u64 = 1;
const FIRST_FILE_INODE: u64 = 2;

const TTL: Duration = Duration::from_secs(60);
const DIR_PERM: u16 = 0o755;
const FILE_PERM: u16 = 0o444;
const NAME_MAX: u32 = 255;
// nothing is ever written, the value only has to be valid
const MAX_WRITE: NonZeroU32 = NonZeroU32::new(128 * 1024).unwrap();

/// Read-only filesystem serving the files of a registry.
pub struct SeedFs {
    registry: Arc<Registry>,
    uid: u32,
    gid: u32,
    mounted_at: SystemTime,
}

impl SeedFs {
    /// Files are owned by the user running the daemon.
    pub fn new(registry: Arc<Registry>) -> Self {
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        Self::with_owner(registry, uid, gid)
    }

    pub fn with_owner(registry: Arc<Registry>, uid: u32, gid: u32) -> Self {
        Self {
            registry,
            uid,
            gid,
            mounted_at: SystemTime::now(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn inode_of(&self, name: &OsStr) -> Option<u64> {
        let index = self.registry.position(name.to_str()?)?;
        Some(index as u64 + FIRST_FILE_INODE)
    }

    pub fn file_of(&self, ino: u64) -> Option<&FileSpec> {
        let index = ino.checked_sub(FIRST_FILE_INODE)?;
        self.registry.get_index(usize::try_from(index).ok()?)
    }

    /// Attributes of the root or of a file; `None` for unknown inodes.
    pub fn attr_of(&self, ino: u64) -> Option<FileAttr> {
        if ino == ROOT_INODE {
            return Some(self.make_attr(ROOT_INODE, FileType::Directory, 0));
        }
        let spec = self.file_of(ino)?;
        Some(self.make_attr(ino, FileType::RegularFile, spec.size()))
    }

    fn make_attr(&self, ino: u64, kind: FileType, size: u64) -> FileAttr {
        let ts = Timestamp::from(self.mounted_at);
        let (perm, nlink) = match kind {
            FileType::Directory => (DIR_PERM, 2),
            _ => (FILE_PERM, 1),
        };
        FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: ts,
            mtime: ts,
            ctime: ts,
            #[cfg(target_os = "macos")]
            crtime: ts,
            kind,
            perm,
            nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            #[cfg(target_os = "macos")]
            flags: 0,
            blksize: self.registry.layout().block_size() as u32,
        }
    }

    /// Root listing with `.` and `..`; an entry's offset is the position of the next one.
    pub fn dir_entries(&self) -> Vec<(u64, FileType, OsString)> {
        let mut all = Vec::with_capacity(self.registry.len() + 2);
        all.push((ROOT_INODE, FileType::Directory, OsString::from(".")));
        all.push((ROOT_INODE, FileType::Directory, OsString::from("..")));
        for (i, spec) in self.registry.iter().enumerate() {
            all.push((
                i as u64 + FIRST_FILE_INODE,
                FileType::RegularFile,
                OsString::from(spec.name()),
            ));
        }
        all
    }

    fn not_a_dir(&self, ino: u64) -> i32 {
        if self.file_of(ino).is_some() {
            libc::ENOTDIR
        } else {
            libc::ENOENT
        }
    }

    fn entry_reply(&self, ino: u64) -> FuseResult<ReplyEntry> {
        let Some(attr) = self.attr_of(ino) else {
            return Err(libc::ENOENT.into());
        };
        Ok(ReplyEntry {
            ttl: TTL,
            attr,
            generation: 0,
        })
    }
}

/// Only read-only opens are allowed.
pub fn check_open_flags(flags: u32) -> FuseResult<()> {
    if (flags as i32) & libc::O_ACCMODE != libc::O_RDONLY {
        return Err(libc::EACCES.into());
    }
    Ok(())
}

/// Deny any access mask that asks for write permission.
pub fn check_access_mask(mask: u32) -> FuseResult<()> {
    if (mask as i32) & libc::W_OK != 0 {
        return Err(libc::EACCES.into());
    }
    Ok(())
}

fn skip_to(offset: u64, len: usize) -> usize {
    usize::try_from(offset).map_or(len, |o| o.min(len))
}

impl Filesystem for SeedFs {
    type DirEntryStream<'a>
        = Pin<Box<dyn Stream<Item = FuseResult<DirectoryEntry>> + Send + 'a>>
    where
        Self: 'a;

    type DirEntryPlusStream<'a>
        = Pin<Box<dyn Stream<Item = FuseResult<DirectoryEntryPlus>> + Send + 'a>>
    where
        Self: 'a;

    async fn init(&self, _req: Request) -> FuseResult<ReplyInit> {
        debug!(files = self.registry.len(), "fuse init");
        Ok(ReplyInit {
            max_write: MAX_WRITE,
        })
    }

    async fn destroy(&self, _req: Request) {
        debug!("fuse destroy");
    }

    async fn lookup(&self, _req: Request, parent: u64, name: &OsStr) -> FuseResult<ReplyEntry> {
        if parent != ROOT_INODE {
            return Err(libc::ENOENT.into());
        }
        let Some(ino) = self.inode_of(name) else {
            return Err(libc::ENOENT.into());
        };
        self.entry_reply(ino)
    }

    async fn getattr(
        &self,
        _req: Request,
        ino: u64,
        _fh: Option<u64>,
        _flags: u32,
    ) -> FuseResult<ReplyAttr> {
        let Some(attr) = self.attr_of(ino) else {
            return Err(libc::ENOENT.into());
        };
        Ok(ReplyAttr { ttl: TTL, attr })
    }

    async fn open(&self, _req: Request, ino: u64, flags: u32) -> FuseResult<ReplyOpen> {
        if ino == ROOT_INODE {
            return Err(libc::EISDIR.into());
        }
        let Some(spec) = self.file_of(ino) else {
            return Err(libc::ENOENT.into());
        };
        if let Err(e) = check_open_flags(flags) {
            warn!(file = spec.name(), flags, "rejecting non read-only open");
            return Err(e);
        }
        Ok(ReplyOpen { fh: 0, flags: 0 })
    }

    async fn opendir(&self, _req: Request, ino: u64, _flags: u32) -> FuseResult<ReplyOpen> {
        if ino == ROOT_INODE {
            return Ok(ReplyOpen { fh: 0, flags: 0 });
        }
        if self.file_of(ino).is_some() {
            return Err(libc::ENOTDIR.into());
        }
        Err(libc::ENOENT.into())
    }

    async fn access(&self, _req: Request, ino: u64, mask: u32) -> FuseResult<()> {
        if self.attr_of(ino).is_none() {
            return Err(libc::ENOENT.into());
        }
        check_access_mask(mask)
    }

    async fn read(
        &self,
        _req: Request,
        ino: u64,
        _fh: u64,
        offset: u64,
        size: u32,
    ) -> FuseResult<ReplyData> {
        if ino == ROOT_INODE {
            return Err(libc::EISDIR.into());
        }
        let Some(spec) = self.file_of(ino) else {
            return Err(libc::ENOENT.into());
        };
        let data = self.registry.read(spec, offset, size as usize);
        debug!(file = spec.name(), offset, size, returned = data.len(), "read");
        Ok(ReplyData {
            data: Bytes::from(data),
        })
    }

    async fn readdir<'a>(
        &'a self,
        _req: Request,
        ino: u64,
        _fh: u64,
        offset: i64,
    ) -> FuseResult<ReplyDirectory<Self::DirEntryStream<'a>>> {
        if ino != ROOT_INODE {
            return Err(self.not_a_dir(ino).into());
        }
        let all = self.dir_entries();
        let start = skip_to(offset.max(0) as u64, all.len());
        let entries: Vec<_> = all
            .into_iter()
            .enumerate()
            .skip(start)
            .map(|(i, (inode, kind, name))| {
                Ok(DirectoryEntry {
                    inode,
                    kind,
                    name,
                    offset: i as i64 + 1,
                })
            })
            .collect();
        let boxed: Self::DirEntryStream<'a> = Box::pin(stream::iter(entries));
        Ok(ReplyDirectory { entries: boxed })
    }

    async fn readdirplus<'a>(
        &'a self,
        _req: Request,
        ino: u64,
        _fh: u64,
        offset: u64,
        _lock_owner: u64,
    ) -> FuseResult<ReplyDirectoryPlus<Self::DirEntryPlusStream<'a>>> {
        if ino != ROOT_INODE {
            return Err(self.not_a_dir(ino).into());
        }
        let all = self.dir_entries();
        let start = skip_to(offset, all.len());
        let mut entries = Vec::with_capacity(all.len() - start);
        for (i, (inode, kind, name)) in all.into_iter().enumerate().skip(start) {
            let Some(attr) = self.attr_of(inode) else {
                continue;
            };
            entries.push(Ok(DirectoryEntryPlus {
                inode,
                generation: 0,
                kind,
                name,
                offset: i as i64 + 1,
                attr,
                entry_ttl: TTL,
                attr_ttl: TTL,
            }));
        }
        let boxed: Self::DirEntryPlusStream<'a> = Box::pin(stream::iter(entries));
        Ok(ReplyDirectoryPlus { entries: boxed })
    }

    async fn statfs(&self, _req: Request, _ino: u64) -> FuseResult<ReplyStatFs> {
        let bsize = self.registry.layout().block_size() as u32;
        let total: u64 = self.registry.iter().map(FileSpec::size).sum();
        Ok(ReplyStatFs {
            blocks: total.div_ceil(u64::from(bsize)),
            bfree: 0,
            bavail: 0,
            files: self.registry.len() as u64 + 1,
            ffree: 0,
            bsize,
            namelen: NAME_MAX,
            frsize: bsize,
        })
    }

    // no per-handle state: everything below just acknowledges
    async fn release(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _flags: u32,
        _lock_owner: u64,
        _flush: bool,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn releasedir(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _flags: u32,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn flush(
        &self,
        _req: Request,
        _inode: u64,
        _fh: u64,
        _lock_owner: u64,
    ) -> FuseResult<()> {
        Ok(())
    }

    async fn forget(&self, _req: Request, _inode: u64, _nlookup: u64) {}

    async fn batch_forget(&self, _req: Request, _inodes: &[(u64, u64)]) {}

    async fn interrupt(&self, _req: Request, _unique: u64) -> FuseResult<()> {
        Ok(())
    }
}


#[cfg(all(test, target_os = "linux"))]
mod mount_tests {
    use super::*;
    use crate::config::MountSettings;
    use crate::fuse::mount::mount_seedfs;
    use std::fs;
    use std::time::Duration as StdDuration;

    // Basic mount smoke test on Linux, enabled with SEEDFS_FUSE_TEST=1
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn smoke_mount_and_read() {
        if std::env::var("SEEDFS_FUSE_TEST").ok().as_deref() != Some("1") {
            eprintln!("skip fuse mount test: set SEEDFS_FUSE_TEST=1 to enable");
            return;
        }

        let registry = Arc::new(
            Registry::from_specs([
                FileSpec::new("a", 200_000, 1).unwrap(),
                FileSpec::new("b", 100, 2).unwrap(),
            ])
            .unwrap(),
        );
        let fs = SeedFs::new(registry.clone());

        let mnt = tempfile::tempdir().expect("tmp mount");
        let mnt_path = mnt.path().to_path_buf();

        let handle = match mount_seedfs(fs, &mnt_path, &MountSettings::default()).await {
            Ok(h) => h,
            Err(e) => {
                eprintln!("skip fuse test: mount failed: {}", e);
                return;
            }
        };

        // give the kernel time to finish INIT
        tokio::time::sleep(StdDuration::from_millis(2000)).await;

        let path = mnt_path.clone();
        let (listing, content, write_open) = tokio::task::spawn_blocking(move || {
            let mut listing = fs::read_dir(&path)
                .expect("readdir")
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect::<Vec<_>>();
            listing.sort();
            let content = fs::read(path.join("a")).expect("read a");
            let write_open = fs::OpenOptions::new().write(true).open(path.join("b"));
            (listing, content, write_open)
        })
        .await
        .expect("blocking task");

        assert_eq!(listing, vec!["a", "b"]);
        let spec = registry.get("a").unwrap();
        assert_eq!(content, registry.read(spec, 0, 200_000));
        assert!(write_open.is_err());

        if let Err(e) = handle.unmount().await {
            eprintln!("unmount error: {}", e);
        }
    }
}
