//! Subcommand implementations behind the `seedfs` binary.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tracing::info;

use crate::config::{MountSettings, SeedFsConfig, build_registry};
use crate::fuse::SeedFs;
use crate::fuse::mount::mount_seedfs;
use crate::registry::Registry;
use crate::spec::FileSpecList;

/// Bytes generated per write when streaming a file out.
const CAT_CHUNK: usize = 1 << 20;

#[derive(Args, Debug)]
pub struct MountArgs {
    /// Empty directory to mount on (created if missing)
    #[arg(value_name = "MOUNTPOINT")]
    pub mountpoint: PathBuf,

    /// Files as name,size,seed[/name,size,seed...]
    #[arg(short, long, value_name = "FILES")]
    pub files: Option<FileSpecList>,

    /// YAML config file with files and mount options
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Let other users access the mount (needs user_allow_other in /etc/fuse.conf)
    #[arg(long)]
    pub allow_other: bool,

    /// Mount directly instead of through fusermount3 (needs root)
    #[arg(long)]
    pub privileged: bool,
}

#[derive(Args, Debug)]
pub struct CatArgs {
    /// Files as name,size,seed[/name,size,seed...]
    #[arg(value_name = "FILES")]
    pub files: FileSpecList,

    /// Name of the file to print
    #[arg(value_name = "NAME")]
    pub name: String,

    /// First byte to print
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Number of bytes to print (default: up to end of file)
    #[arg(long)]
    pub length: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Files as name,size,seed[/name,size,seed...]
    #[arg(value_name = "FILES")]
    pub files: FileSpecList,
}

pub async fn mount(args: MountArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => SeedFsConfig::load(path)?,
        None => SeedFsConfig::default(),
    };
    let cli_files = args.files.map(|list| list.0).unwrap_or_default();
    let registry =
        Arc::new(build_registry(cli_files, &config).context("Failed to build file registry")?);
    let settings = MountSettings::merge(&config, args.allow_other, args.privileged);

    std::fs::create_dir_all(&args.mountpoint).with_context(|| {
        format!(
            "Failed to create mount point {}",
            args.mountpoint.display()
        )
    })?;

    let fs = SeedFs::new(registry);
    let mut mount_handle = mount_seedfs(fs, &args.mountpoint, &settings)
        .await
        .with_context(|| format!("Failed to mount at {}", args.mountpoint.display()))?;
    info!("mounted, press Ctrl+C to unmount");

    let handle = &mut mount_handle;
    tokio::select! {
        res = handle => res.context("FUSE session failed")?,
        _ = signal::ctrl_c() => {
            info!("unmounting");
            mount_handle.unmount().await.context("Failed to unmount")?;
        }
    }
    Ok(())
}

pub fn cat(args: CatArgs) -> Result<()> {
    let registry = Registry::from_specs(args.files.0)?;
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    write_file(&registry, &args.name, args.offset, args.length, &mut out)?;
    Ok(())
}

/// Stream `[offset, offset + length)` of `name` into `out`, clamped to the file size.
/// Returns the number of bytes written.
pub fn write_file<W: Write>(
    registry: &Registry,
    name: &str,
    offset: u64,
    length: Option<u64>,
    out: &mut W,
) -> Result<u64> {
    let spec = registry
        .get(name)
        .with_context(|| format!("No file named {name}"))?;
    let end = match length {
        Some(len) => offset.saturating_add(len).min(spec.size()),
        None => spec.size(),
    };

    let mut buf = vec![0u8; CAT_CHUNK];
    let mut pos = offset;
    while pos < end {
        let want = (end - pos).min(CAT_CHUNK as u64) as usize;
        let n = registry.read_into(spec, pos, &mut buf[..want]);
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])
            .context("Failed to write file content")?;
        pos += n as u64;
    }
    out.flush().context("Failed to flush output")?;
    Ok(pos.saturating_sub(offset))
}

pub fn list(args: ListArgs) -> Result<()> {
    let registry = Registry::from_specs(args.files.0)?;
    let stdout = std::io::stdout();
    write_listing(&registry, &mut stdout.lock())
}

pub fn write_listing<W: Write>(registry: &Registry, out: &mut W) -> Result<()> {
    for spec in registry {
        writeln!(out, "{}\t{}\t{:#010x}", spec.name(), spec.size(), spec.seed())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FileSpec;

    fn registry() -> Registry {
        Registry::from_specs([
            FileSpec::new("a", 3 * CAT_CHUNK as u64 + 10, 1).unwrap(),
            FileSpec::new("b", 100, 0x2).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_write_whole_file() {
        let registry = registry();
        let mut out = Vec::new();
        let n = write_file(&registry, "a", 0, None, &mut out).unwrap();
        assert_eq!(n, 3 * CAT_CHUNK as u64 + 10);
        let spec = registry.get("a").unwrap();
        assert_eq!(out, registry.read(spec, 0, out.len()));
    }

    #[test]
    fn test_write_range_is_clamped() {
        let registry = registry();
        let mut out = Vec::new();
        let n = write_file(&registry, "b", 90, Some(50), &mut out).unwrap();
        assert_eq!(n, 10);
        let spec = registry.get("b").unwrap();
        assert_eq!(out, registry.read(spec, 90, 10));

        out.clear();
        assert_eq!(write_file(&registry, "b", 500, None, &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_name() {
        let mut out = Vec::new();
        assert!(write_file(&registry(), "zzz", 0, None, &mut out).is_err());
    }

    #[test]
    fn test_listing() {
        let mut out = Vec::new();
        write_listing(&registry(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "a\t3145738\t0x00000001\nb\t100\t0x00000002\n");
    }
}
