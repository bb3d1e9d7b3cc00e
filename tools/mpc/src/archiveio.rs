//! Thin subprocess wrapper around `tar`, `xz`, and `bzip2`, used by the archive
//! reconciler and the repository reader. Every invocation captures combined
//! stdout/stderr into a `String` and turns a non-zero exit into a typed error, the same
//! shape `buildsys::builder` uses to shell out to `docker`.

pub mod error;

use crate::package::ArchiveFileType;
use error::Result;
use snafu::{ensure, ResultExt};
use std::env;
use std::path::{Path, PathBuf};

/// Confirms `xz` is reachable on `PATH`; called once at startup, matching the
/// "missing `xz` is a `ConfigurationError`" policy.
pub fn check_xz_available() -> Result<()> {
    which::which("xz")
        .map(|_| ())
        .map_err(|_| error::ToolNotFoundSnafu { tool: "xz" }.build())
}

fn run(cmd: &str, args: &[&str], dir: Option<&Path>) -> Result<String> {
    let command_desc = format!("{cmd} {}", args.join(" "));
    let mut expr = duct::cmd(cmd, args).stderr_to_stdout().stdout_capture();
    if let Some(dir) = dir {
        expr = expr.dir(dir);
    }
    let output = expr
        .unchecked()
        .run()
        .context(error::SpawnSnafu {
            command: command_desc.clone(),
        })?;
    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    ensure!(
        output.status.success(),
        error::NonZeroExitSnafu {
            command: command_desc,
            output: text.clone(),
        }
    );
    Ok(text)
}

/// Restores the process's working directory on drop, including during unwinding, so a
/// multi-step archive build never leaves the process in someone else's CWD.
pub struct CwdGuard {
    original: PathBuf,
}

impl CwdGuard {
    pub fn enter(dir: impl AsRef<Path>) -> Result<Self> {
        let original = env::current_dir().context(error::ChdirSnafu { dir: dir.as_ref() })?;
        env::set_current_dir(dir.as_ref()).context(error::ChdirSnafu { dir: dir.as_ref() })?;
        Ok(CwdGuard { original })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.original);
    }
}

/// Creates an empty tar archive at `tar_path`.
pub fn create_empty_tar(tar_path: &Path) -> Result<()> {
    run(
        "tar",
        &["-cf", &tar_path.to_string_lossy(), "-T", "/dev/null"],
        None,
    )
    .map(|_| ())
}

/// Appends `member` (a directory or file, relative to the current working directory) to
/// `tar_path`. Callers are expected to have entered the right directory via `CwdGuard`.
pub fn append_to_tar(tar_path: &Path, member: &str) -> Result<()> {
    run("tar", &["-rf", &tar_path.to_string_lossy(), member], None).map(|_| ())
}

/// Compresses `path` in place, appending `.lzma` or `.bz2` to its existing name (the
/// same naming `xz`/`bzip2` use by default -- `mpm.tar` becomes `mpm.tar.lzma`, not a
/// replacement of the `.tar` extension), and removing the uncompressed input.
pub fn compress(path: &Path, archive_type: ArchiveFileType) -> Result<PathBuf> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    match archive_type {
        ArchiveFileType::TarLzma => {
            run(
                "xz",
                &["--compress", "--format=lzma", &path.to_string_lossy()],
                Some(dir),
            )?;
            Ok(append_suffix(path, "lzma"))
        }
        ArchiveFileType::TarBzip2 => {
            run("bzip2", &["--compress", &path.to_string_lossy()], Some(dir))?;
            Ok(append_suffix(path, "bz2"))
        }
        ArchiveFileType::Tar => Ok(path.to_path_buf()),
        ArchiveFileType::MsCab | ArchiveFileType::Zip => Ok(path.to_path_buf()),
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Extracts a single `member` from `archive_path` (of the given type) into `dest_dir`.
pub fn extract_member(
    archive_path: &Path,
    archive_type: ArchiveFileType,
    member: &str,
    dest_dir: &Path,
) -> Result<()> {
    let flag = match archive_type {
        ArchiveFileType::TarLzma => "--force-local -xJf",
        ArchiveFileType::TarBzip2 => "--force-local -xjf",
        _ => "--force-local -xf",
    };
    let mut args: Vec<&str> = flag.split(' ').collect();
    let archive_str = archive_path.to_string_lossy().into_owned();
    args.push(&archive_str);
    args.push(member);
    run("tar", &args, Some(dest_dir)).map(|_| ())
}

/// Extracts every member of `archive_path` into `dest_dir`.
pub fn extract_all(archive_path: &Path, archive_type: ArchiveFileType, dest_dir: &Path) -> Result<()> {
    let flag = match archive_type {
        ArchiveFileType::TarLzma => "--force-local -xJf",
        ArchiveFileType::TarBzip2 => "--force-local -xjf",
        _ => "--force-local -xf",
    };
    let mut args: Vec<&str> = flag.split(' ').collect();
    let archive_str = archive_path.to_string_lossy().into_owned();
    args.push(&archive_str);
    run("tar", &args, Some(dest_dir)).map(|_| ())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cwd_guard_restores_directory_on_drop() {
        let before = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        {
            let _guard = CwdGuard::enter(tmp.path()).unwrap();
            assert_eq!(
                env::current_dir().unwrap().canonicalize().unwrap(),
                tmp.path().canonicalize().unwrap()
            );
        }
        assert_eq!(env::current_dir().unwrap(), before);
    }
}
