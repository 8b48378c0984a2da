//! Mount helpers for starting/stopping FUSE
//!
//! Notes:
//! - Only supported on Linux. Unprivileged mounts go through fusermount3, privileged ones
//!   need root.
//! - These helpers are thin wrappers over rfuse3 raw Session APIs.

use std::path::Path;

use rfuse3::MountOptions;
use tracing::info;

use super::SeedFs;
use crate::config::MountSettings;

/// Mount options for a read-only SeedFS session owned by `uid`/`gid`.
pub fn mount_options(settings: &MountSettings, uid: u32, gid: u32) -> MountOptions {
    let mut mo = MountOptions::default();
    mo.fs_name(settings.fs_name.as_str())
        .read_only(true)
        .force_readdir_plus(true)
        .allow_other(settings.allow_other)
        .uid(uid)
        .gid(gid);
    mo
}

/// Mount `fs` on an existing directory. Privileged mode is used only when requested.
#[cfg(target_os = "linux")]
pub async fn mount_seedfs(
    fs: SeedFs,
    mount_point: impl AsRef<Path>,
    settings: &MountSettings,
) -> std::io::Result<rfuse3::raw::MountHandle> {
    let mount_point = mount_point.as_ref();
    let opts = mount_options(settings, fs.uid(), fs.gid());
    let session = rfuse3::raw::Session::new(opts);
    info!(
        mount_point = %mount_point.display(),
        files = fs.registry().len(),
        privileged = settings.privileged,
        "mounting"
    );
    if settings.privileged {
        session.mount(fs, mount_point).await
    } else {
        session.mount_with_unprivileged(fs, mount_point).await
    }
}

/// Fallback stub for non-Linux targets.
#[cfg(not(target_os = "linux"))]
pub async fn mount_seedfs(
    _fs: SeedFs,
    _mount_point: impl AsRef<Path>,
    _settings: &MountSettings,
) -> std::io::Result<rfuse3::raw::MountHandle> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "FUSE mount is only supported on Linux in this build",
    ))
}
