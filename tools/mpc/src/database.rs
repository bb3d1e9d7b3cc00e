//! Publishes the four derived database artifacts into a repository directory: the
//! `mpm.ini` manifest archive, a per-package `.tpm` directory archive, a combined
//! `package-manifests.ini` archive, and the `files.csv.lzma` flat index, finishing with
//! `pr.ini` written twice (see the module-level note on why the second write matters).

pub mod error;

use crate::archiveio::{self, CwdGuard};
use crate::inifile::IniDocument;
use crate::package::{ArchiveFileType, Level, PackageTable};
use crate::path;
use crate::repo::RepositoryManifest;
use crate::signing::{self, PrivateKeyProvider};
use error::Result;
use snafu::ResultExt;
use std::collections::HashSet;
use std::path::Path;

/// Seconds between the Unix epoch and 2000-01-01 00:00:00 UTC, the epoch `pr.ini`'s
/// `version` (a day counter) is measured from.
const PR_INI_EPOCH: i64 = 946_681_200;
const SECONDS_PER_DAY: i64 = 86_400;
const MAX_LASTUPD: usize = 20;

pub struct PublishOptions<'a> {
    pub repo_dir: &'a Path,
    pub miktex_series: (u32, u32),
    pub prune: bool,
    pub release_state: &'a str,
    pub now: i64,
    pub signing_key: Option<&'a dyn PrivateKeyProvider>,
}

fn database_archive_type(series: (u32, u32)) -> ArchiveFileType {
    if series < (2, 7) {
        ArchiveFileType::TarBzip2
    } else {
        ArchiveFileType::TarLzma
    }
}

/// Runs every database-writing step, in the order the on-disk listing digest depends on.
pub fn publish(
    table: &PackageTable,
    manifest: &mut RepositoryManifest,
    opts: &PublishOptions,
) -> Result<()> {
    if opts.prune {
        prune_manifest(table, manifest);
    }

    write_mpm_archive(manifest, opts)?;
    write_tpm_directory_archive(table, opts)?;
    write_package_manifests_archive(table, opts)?;
    write_files_csv(table, opts)?;
    cleanup_obsolete_formats(opts.repo_dir)?;

    write_pr_ini(table, opts, None)?;
    let lstdigest = compute_listing_digest(opts.repo_dir)?;
    write_pr_ini(table, opts, Some(lstdigest))?;

    Ok(())
}

fn prune_manifest(table: &PackageTable, manifest: &mut RepositoryManifest) {
    let live: HashSet<String> = table
        .values()
        .filter(|p| p.level != Level::Ignore)
        .map(|p| p.id.clone())
        .collect();
    for id in manifest.package_ids() {
        if !live.contains(&id) {
            manifest.remove_package(&id);
        }
    }
}

fn archive_stem_and_dir(
    scratch: &Path,
    repo_dir: &Path,
    member: &str,
    stem: &str,
    series: (u32, u32),
) -> Result<()> {
    let archive_type = database_archive_type(series);
    let tar_path = scratch.join(format!("{stem}.tar"));
    archiveio::create_empty_tar(&tar_path)?;
    {
        let _guard = CwdGuard::enter(scratch)?;
        archiveio::append_to_tar(&tar_path, member)?;
    }
    let compressed = archiveio::compress(&tar_path, archive_type)?;
    let final_path = repo_dir.join(format!(
        "{stem}-{}.{}.{}",
        series.0,
        series.1,
        archive_type.extension()
    ));
    std::fs::rename(&compressed, &final_path).context(error::WriteSnafu {
        path: final_path.clone(),
    })?;
    Ok(())
}

fn write_mpm_archive(manifest: &RepositoryManifest, opts: &PublishOptions) -> Result<()> {
    let text = signing::sign_if_configured(manifest.to_text()?, opts.signing_key);
    let scratch = tempfile::tempdir().expect("failed to create scratch directory");
    let ini_path = scratch.path().join("mpm.ini");
    std::fs::write(&ini_path, text).context(error::WriteSnafu {
        path: ini_path.clone(),
    })?;
    archive_stem_and_dir(
        scratch.path(),
        opts.repo_dir,
        "mpm.ini",
        "miktex-zzdb1",
        opts.miktex_series,
    )
}

fn write_tpm_directory_archive(table: &PackageTable, opts: &PublishOptions) -> Result<()> {
    let scratch = tempfile::tempdir().expect("failed to create scratch directory");
    let packages_dir = scratch.path().join("texmf").join("tpm").join("packages");
    std::fs::create_dir_all(&packages_dir).context(error::WriteSnafu {
        path: packages_dir.clone(),
    })?;

    for p in table.values().filter(|p| p.level != Level::Ignore) {
        let tpm_path = packages_dir.join(format!("{}.tpm", p.id));
        p.to_tpm_document()
            .write(&tpm_path)
            .context(error::WriteTpmSnafu { path: tpm_path })?;
    }

    archive_stem_and_dir(
        scratch.path(),
        opts.repo_dir,
        "texmf",
        "miktex-zzdb2",
        opts.miktex_series,
    )
}

fn write_package_manifests_archive(table: &PackageTable, opts: &PublishOptions) -> Result<()> {
    let doc = build_package_manifests_document(table);
    let text = signing::sign_if_configured(
        doc.to_string().context(error::WriteManifestSnafu {
            path: Path::new("package-manifests.ini").to_path_buf(),
        })?,
        opts.signing_key,
    );

    let scratch = tempfile::tempdir().expect("failed to create scratch directory");
    let ini_path = scratch.path().join("package-manifests.ini");
    std::fs::write(&ini_path, text).context(error::WriteSnafu {
        path: ini_path.clone(),
    })?;
    archive_stem_and_dir(
        scratch.path(),
        opts.repo_dir,
        "package-manifests.ini",
        "miktex-zzdb3",
        opts.miktex_series,
    )
}

fn build_package_manifests_document(table: &PackageTable) -> IniDocument {
    let mut doc = IniDocument::new();
    const SCALAR_KEYS: &[&str] = &[
        "id",
        "name",
        "title",
        "creator",
        "version",
        "targetsystem",
        "mintargetsystemversion",
        "ctanpath",
        "copyrightowner",
        "copyrightyear",
        "licensetype",
        "md5",
        "timepackaged",
    ];
    const LIST_KEYS: &[&str] = &["requires", "runfiles", "docfiles", "sourcefiles"];

    for p in table.values().filter(|p| p.level != Level::Ignore) {
        let tpm_doc = p.to_tpm_document();
        for key in SCALAR_KEYS {
            if let Some(v) = tpm_doc.get(None, key) {
                doc.set(Some(&p.id), *key, v.to_string());
            }
        }
        for key in LIST_KEYS {
            for value in tpm_doc.get_all(None, key) {
                doc.add_multi(Some(&p.id), key, value.to_string());
            }
        }
    }
    doc
}

/// Builds the sorted, prefix-stripped `<rel-path>;<id>\n` lines of `files.csv`, kept
/// separate from the write+compress step below so it can be tested without shelling out
/// to an external compressor.
fn files_csv_lines(table: &PackageTable) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for p in table.values().filter(|p| p.level != Level::Ignore) {
        for rel in p.all_files() {
            lines.push(format!("{};{}\n", path::strip_texmf_prefix(rel), p.id));
        }
    }
    lines.sort();
    lines
}

fn write_files_csv(table: &PackageTable, opts: &PublishOptions) -> Result<()> {
    let lines = files_csv_lines(table);

    let csv_path = opts.repo_dir.join("files.csv");
    std::fs::write(&csv_path, lines.concat()).context(error::WriteSnafu {
        path: csv_path.clone(),
    })?;
    let compressed = archiveio::compress(&csv_path, ArchiveFileType::TarLzma)?;
    let final_path = opts.repo_dir.join("files.csv.lzma");
    if compressed != final_path {
        std::fs::rename(&compressed, &final_path).context(error::WriteSnafu {
            path: final_path,
        })?;
    }
    Ok(())
}

/// Deletes archives superseded by a newer-format archive of the same package: a `.cab`
/// once a `.tar.bz2` or `.tar.lzma` exists, a `.tar.bz2` once a `.tar.lzma` exists.
fn cleanup_obsolete_formats(repo_dir: &Path) -> Result<()> {
    let entries = std::fs::read_dir(repo_dir).context(error::ReadDirSnafu {
        path: repo_dir.to_path_buf(),
    })?;

    let mut stems_with_lzma = HashSet::new();
    let mut stems_with_bz2 = HashSet::new();
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.context(error::ReadDirSnafu {
            path: repo_dir.to_path_buf(),
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = name.strip_suffix(".tar.lzma") {
            stems_with_lzma.insert(stem.to_string());
        } else if let Some(stem) = name.strip_suffix(".tar.bz2") {
            stems_with_bz2.insert(stem.to_string());
        }
        names.push(name);
    }

    for name in names {
        if let Some(stem) = name.strip_suffix(".cab") {
            if stems_with_lzma.contains(stem) || stems_with_bz2.contains(stem) {
                let path = repo_dir.join(&name);
                std::fs::remove_file(&path).context(error::RemoveSnafu { path })?;
            }
        } else if let Some(stem) = name.strip_suffix(".tar.bz2") {
            if stems_with_lzma.contains(stem) {
                let path = repo_dir.join(&name);
                std::fs::remove_file(&path).context(error::RemoveSnafu { path })?;
            }
        }
    }

    Ok(())
}

fn write_pr_ini(table: &PackageTable, opts: &PublishOptions, lstdigest: Option<crate::digest::Digest>) -> Result<()> {
    let mut doc = IniDocument::new();
    doc.set(Some("repository"), "date", opts.now.to_string());
    let version_days = (opts.now - PR_INI_EPOCH) / SECONDS_PER_DAY;
    doc.set(Some("repository"), "version", version_days.to_string());
    let numpkg = table.values().filter(|p| p.level != Level::Ignore).count();
    doc.set(Some("repository"), "numpkg", numpkg.to_string());
    doc.set(Some("repository"), "relstate", opts.release_state.to_string());

    let mut packaged: Vec<&crate::package::PackageInfo> = table
        .values()
        .filter(|p| p.level != Level::Ignore && p.time_packaged.is_some())
        .collect();
    packaged.sort_by(|a, b| b.time_packaged.cmp(&a.time_packaged));
    let lastupd: Vec<String> = packaged
        .into_iter()
        .take(MAX_LASTUPD)
        .map(|p| p.id.clone())
        .collect();
    for id in &lastupd {
        doc.add_multi(Some("repository"), "lastupd", id.clone());
    }

    if let Some(digest) = lstdigest {
        doc.set(Some("repository"), "lstdigest", digest.to_string());
    } else {
        doc.set(Some("repository"), "lstdigest", "");
    }

    let path = opts.repo_dir.join("pr.ini");
    doc.write(&path).context(error::WriteManifestSnafu { path })
}

fn compute_listing_digest(repo_dir: &Path) -> Result<crate::digest::Digest> {
    let entries = std::fs::read_dir(repo_dir).context(error::ReadDirSnafu {
        path: repo_dir.to_path_buf(),
    })?;
    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry.context(error::ReadDirSnafu {
            path: repo_dir.to_path_buf(),
        })?;
        let meta = entry.metadata().context(error::StatSnafu {
            path: entry.path(),
        })?;
        if meta.is_file() {
            listing.push((entry.file_name().to_string_lossy().into_owned(), meta.len()));
        }
    }
    Ok(crate::digest::listing_digest(
        listing.iter().map(|(name, size)| (name.as_str(), *size)),
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::PackageInfo;
    use tempfile::tempdir;

    fn pkg(id: &str, level: Level, time_packaged: Option<i64>) -> PackageInfo {
        PackageInfo {
            id: id.to_string(),
            display_name: id.to_string(),
            level,
            time_packaged,
            ..Default::default()
        }
    }

    #[test]
    fn prune_removes_manifest_entries_missing_from_table() {
        let mut table = PackageTable::new();
        table.insert(pkg("foo", Level::Small, None));
        let mut manifest = RepositoryManifest::empty();
        manifest.set_package("foo", &Default::default());
        manifest.set_package("stale", &Default::default());

        prune_manifest(&table, &mut manifest);

        assert!(manifest.get_package("foo").is_some());
        assert!(manifest.get_package("stale").is_none());
    }

    #[test]
    fn files_csv_lines_strip_texmf_prefix_and_sort() {
        let mut table = PackageTable::new();
        let mut p = pkg("foo", Level::Small, None);
        p.run_files.push("texmf/tex/b.sty".to_string());
        p.run_files.push("texmf/tex/a.sty".to_string());
        table.insert(p);

        let lines = files_csv_lines(&table);
        assert_eq!(lines, vec!["tex/a.sty;foo\n".to_string(), "tex/b.sty;foo\n".to_string()]);
    }

    #[test]
    fn files_csv_lines_exclude_ignored_packages() {
        let mut table = PackageTable::new();
        let mut ignored = pkg("bar", Level::Ignore, None);
        ignored.run_files.push("texmf/tex/bar.sty".to_string());
        table.insert(ignored);

        assert!(files_csv_lines(&table).is_empty());
    }

    #[test]
    fn lastupd_is_capped_at_twenty_most_recent() {
        let mut table = PackageTable::new();
        for i in 0..25 {
            table.insert(pkg(&format!("p{i}"), Level::Small, Some(1_700_000_000 + i)));
        }
        let dir = tempdir().unwrap();
        let opts = PublishOptions {
            repo_dir: dir.path(),
            miktex_series: (2, 9),
            prune: false,
            release_state: "stable",
            now: 1_700_000_000,
            signing_key: None,
        };
        write_pr_ini(&table, &opts, None).unwrap();
        let doc = IniDocument::load(dir.path().join("pr.ini")).unwrap();
        assert_eq!(doc.get_all(Some("repository"), "lastupd").len(), MAX_LASTUPD);
    }
}
