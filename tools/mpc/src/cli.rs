//! Argument parsing and mode dispatch: a `clap` derive tree plus a thin `run()` matching
//! on the parsed subcommand, mirroring the `args.rs` / `main.rs` split in `buildsys`.

use crate::archiveio;
use crate::error::{self, Result};
use crate::package::{ArchiveFileType, Level, PackageTable};
use crate::packagelist;
use crate::signing::{FilePrivateKeyProvider, PrivateKeyProvider};
use crate::staging;
use clap::{Parser, Subcommand};
use snafu::{ensure, ResultExt};
use std::path::PathBuf;

/// Package-repository builder for a TeX distribution: assembles staging directories
/// into the archives, manifests, and indexes a client needs to discover and install
/// packages.
#[derive(Debug, Parser)]
#[command(name = "mpc", version, about)]
pub struct Mpc {
    #[command(subcommand)]
    pub mode: Mode,

    /// Raise logging to debug level.
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Assemble a TDS tree from one or more staging roots.
    BuildTds {
        /// Staging root directories, joined by the platform path separator.
        #[arg(long, value_delimiter = staging::PATH_SEPARATOR)]
        staging_roots: Vec<PathBuf>,

        /// Destination directory that will receive the `texmf/` tree.
        #[arg(long)]
        texmf_parent: PathBuf,

        /// Override where per-package manifest files are written.
        #[arg(long)]
        tpm_dir: Option<PathBuf>,
    },

    /// Refresh a single package's archive and manifest entry in place.
    CreatePackage {
        /// Staging directory to read; defaults to the current directory.
        #[arg(long)]
        staging_dir: Option<PathBuf>,

        /// Repository directory to update.
        #[arg(long)]
        repository: PathBuf,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Reconstruct a staging directory from a package manifest and its source tree.
    DisassemblePackage {
        /// The `.tpm` package manifest to read.
        #[arg(long)]
        tpm_file: PathBuf,

        /// Source tree the manifest's file list is relative to.
        #[arg(long)]
        texmf_parent: PathBuf,

        /// Destination staging directory.
        #[arg(long)]
        staging_dir: PathBuf,
    },

    /// Rebuild the entire repository from one or more staging roots.
    UpdateRepository {
        /// Staging root directories, joined by the platform path separator.
        #[arg(long, value_delimiter = staging::PATH_SEPARATOR)]
        staging_roots: Vec<PathBuf>,

        /// Repository directory to write.
        #[arg(long)]
        repository: PathBuf,

        /// Remove manifest entries for packages no longer present in the staging roots.
        #[arg(long)]
        prune: bool,

        #[command(flatten)]
        tuning: Tuning,
    },
}

/// Tuning flags shared by the modes that reconcile archives and publish the database.
#[derive(Debug, clap::Args)]
pub struct Tuning {
    /// Level assigned to packages absent from `--package-list`.
    #[arg(long, default_value = "T")]
    pub default_level: Level,

    /// `<major>.<minor>` series; must not exceed this build's maximum.
    #[arg(long, default_value = "2.9")]
    pub miktex_series: MiktexSeries,

    /// Package-list file assigning levels and archive types.
    #[arg(long)]
    pub package_list: Option<PathBuf>,

    /// Passphrase file for `--private-key-file`.
    #[arg(long)]
    pub passphrase_file: Option<PathBuf>,

    /// Private key used to sign published database archives.
    #[arg(long)]
    pub private_key_file: Option<PathBuf>,

    /// Repository release state recorded in `pr.ini`.
    #[arg(long, default_value = "stable")]
    pub release_state: String,

    /// TEXMF prefix expected at the root of each package's file tree.
    #[arg(long, default_value = "texmf")]
    pub texmf_prefix: String,

    /// Override the timestamp recorded for newly built archives (Unix seconds).
    #[arg(long)]
    pub time_packaged: Option<i64>,
}

impl Tuning {
    fn load_signing_key(&self) -> Result<Option<FilePrivateKeyProvider>> {
        match &self.private_key_file {
            Some(path) => Ok(Some(FilePrivateKeyProvider::load(
                path.clone(),
                self.passphrase_file.clone(),
            )?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiktexSeries(pub u32, pub u32);

impl std::str::FromStr for MiktexSeries {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("expected MAJOR.MINOR, got '{s}'"))?;
        let major: u32 = major.parse().map_err(|_| format!("invalid major version '{major}'"))?;
        let minor: u32 = minor.parse().map_err(|_| format!("invalid minor version '{minor}'"))?;
        Ok(MiktexSeries(major, minor))
    }
}

impl clap::ValueEnum for Level {
    fn value_variants<'a>() -> &'a [Self] {
        &[Level::Small, Level::Medium, Level::Large, Level::Tiny, Level::Ignore]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.to_string()))
    }
}

/// Reads every staging directory directly under each of `roots` into a `PackageTable`.
fn read_staging_roots(roots: &[PathBuf]) -> Result<PackageTable> {
    ensure!(!roots.is_empty(), error::NoStagingRootsSnafu);

    let mut table = PackageTable::new();
    for root in roots {
        let entries = std::fs::read_dir(root).context(error::ReadDirSnafu {
            path: root.to_path_buf(),
        })?;
        for entry in entries {
            let entry = entry.context(error::ReadDirSnafu {
                path: root.to_path_buf(),
            })?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            if !entry.path().join("package.ini").is_file() {
                continue;
            }
            let info = staging::read_staging_dir(entry.path())?;
            if table.insert_if_absent(info) {
                log::warn!(
                    "duplicate package '{}' in staging roots, keeping first occurrence",
                    entry.path().display()
                );
            }
        }
    }
    Ok(table)
}

fn check_series(series: MiktexSeries) -> Result<()> {
    let requested = (series.0, series.1);
    ensure!(
        requested <= crate::MAX_MIKTEX_SERIES,
        error::UnsupportedSeriesSnafu {
            requested_major: series.0,
            requested_minor: series.1,
            max_major: crate::MAX_MIKTEX_SERIES.0,
            max_minor: crate::MAX_MIKTEX_SERIES.1,
        }
    );
    Ok(())
}

pub fn run(args: Mpc) -> Result<()> {
    match args.mode {
        Mode::BuildTds {
            staging_roots,
            texmf_parent,
            tpm_dir,
        } => {
            let table = read_staging_roots(&staging_roots)?;
            crate::tds::build_tds(&table, &texmf_parent, tpm_dir.as_deref())?;
            Ok(())
        }

        Mode::CreatePackage {
            staging_dir,
            repository,
            tuning,
        } => {
            check_series(tuning.miktex_series)?;
            archiveio::check_xz_available()?;

            let staging_dir = match staging_dir {
                Some(dir) => dir,
                None => std::env::current_dir().context(error::ReadDirSnafu {
                    path: PathBuf::from("."),
                })?,
            };
            let info = staging::read_staging_dir(&staging_dir)?;
            let mut table = PackageTable::new();
            table.insert(info);

            let specs = match &tuning.package_list {
                Some(path) => packagelist::read_package_list(path)?,
                None => Vec::new(),
            };
            let mut manifest = crate::repo::RepositoryManifest::load(&repository)?;
            let now = tuning.time_packaged.unwrap_or(current_unix_time());
            crate::archive::reconcile_all(
                &mut table,
                &repository,
                &mut manifest,
                &specs,
                tuning.default_level,
                now,
            )?;

            publish_database(&table, &mut manifest, &repository, &tuning, now, false)
        }

        Mode::DisassemblePackage {
            tpm_file,
            texmf_parent,
            staging_dir,
        } => {
            crate::disassemble::disassemble_package(&tpm_file, &texmf_parent, &staging_dir)?;
            Ok(())
        }

        Mode::UpdateRepository {
            staging_roots,
            repository,
            prune,
            tuning,
        } => {
            check_series(tuning.miktex_series)?;
            archiveio::check_xz_available()?;

            let mut table = read_staging_roots(&staging_roots)?;
            crate::categorize::categorize(&mut table);

            let specs = match &tuning.package_list {
                Some(path) => packagelist::read_package_list(path)?,
                None => Vec::new(),
            };
            let mut manifest = crate::repo::RepositoryManifest::load(&repository)?;
            let now = tuning.time_packaged.unwrap_or(current_unix_time());
            crate::archive::reconcile_all(
                &mut table,
                &repository,
                &mut manifest,
                &specs,
                tuning.default_level,
                now,
            )?;

            publish_database(&table, &mut manifest, &repository, &tuning, now, prune)
        }
    }
}

fn publish_database(
    table: &PackageTable,
    manifest: &mut crate::repo::RepositoryManifest,
    repository: &std::path::Path,
    tuning: &Tuning,
    now: i64,
    prune: bool,
) -> Result<()> {
    let signing_key = tuning.load_signing_key()?;
    let signing_key_ref: Option<&dyn PrivateKeyProvider> =
        signing_key.as_ref().map(|k| k as &dyn PrivateKeyProvider);

    let opts = crate::database::PublishOptions {
        repo_dir: repository,
        miktex_series: (tuning.miktex_series.0, tuning.miktex_series.1),
        prune,
        release_state: &tuning.release_state,
        now,
        signing_key: signing_key_ref,
    };
    crate::database::publish(table, manifest, &opts)?;
    Ok(())
}

fn current_unix_time() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn miktex_series_parses_major_dot_minor() {
        let series: MiktexSeries = "2.9".parse().unwrap();
        assert_eq!(series, MiktexSeries(2, 9));
    }

    #[test]
    fn miktex_series_rejects_malformed_input() {
        assert!("2".parse::<MiktexSeries>().is_err());
        assert!("a.b".parse::<MiktexSeries>().is_err());
    }

    #[test]
    fn check_series_rejects_series_above_build_maximum() {
        let err = check_series(MiktexSeries(9, 9)).unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedSeries { .. }));
    }
}
