//! Decides, per package, whether the existing archive in the repository directory is
//! still valid and, when it is not, rebuilds it by shelling out to `tar` and an external
//! compressor. Updates the repository manifest as it goes.

pub mod error;

use crate::archiveio::{self, CwdGuard};
use crate::inifile::IniDocument;
use crate::package::{ArchiveFileType, Level, PackageInfo, PackageTable};
use crate::packagelist::PackageSpec;
use crate::repo::{PackageManifestEntry, RepositoryManifest};
use error::Result;
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Walks every package in `table`, reconciling its archive against `manifest` and the
/// package list `specs`. Ignored packages are dropped from the manifest; pure containers
/// are skipped entirely (they never get an archive).
pub fn reconcile_all(
    table: &mut PackageTable,
    repo_dir: &Path,
    manifest: &mut RepositoryManifest,
    specs: &[PackageSpec],
    default_level: Level,
    program_start_time: i64,
) -> Result<()> {
    let spec_by_id: HashMap<&str, &PackageSpec> =
        specs.iter().map(|s| (s.id.as_str(), s)).collect();

    let ids: Vec<String> = table.ids().map(str::to_string).collect();
    for id in ids {
        let (level, archive_type) = spec_by_id
            .get(id.as_str())
            .map(|s| (s.level, s.archive_file_type.unwrap_or_default()))
            .unwrap_or((default_level, ArchiveFileType::default()));

        if level == Level::Ignore {
            if let Some(p) = table.get_mut(&id) {
                p.level = Level::Ignore;
            }
            manifest.remove_package(&id);
            continue;
        }

        let is_pure_container = table
            .get(&id)
            .map(PackageInfo::is_pure_container)
            .unwrap_or(true);
        if is_pure_container {
            continue;
        }

        reconcile_one(
            table,
            &id,
            repo_dir,
            manifest,
            level,
            archive_type,
            program_start_time,
        )?;
    }

    Ok(())
}

fn reconcile_one(
    table: &mut PackageTable,
    id: &str,
    repo_dir: &Path,
    manifest: &mut RepositoryManifest,
    level: Level,
    archive_type: ArchiveFileType,
    program_start_time: i64,
) -> Result<()> {
    {
        let p = table.get_mut(id).expect("id came from table");
        p.level = level;
        if p.digest.is_none() {
            let digest = crate::staging::recompute_tds_digest(p)
                .context(error::RecomputeSnafu { id: id.to_string() })?;
            p.digest = Some(digest);
        }
    }

    let existing_entry = manifest.get_package(id);
    let existing_archive = find_existing_archive(repo_dir, id);
    let digest = table.get(id).and_then(|p| p.digest);

    let mut reused = false;
    let mut time_packaged = None;

    if let (Some((archive_path, found_type)), Some(entry)) = (&existing_archive, &existing_entry) {
        if entry.time_packaged.is_some() && entry.md5.is_some() && entry.md5 == digest {
            reused = true;
            time_packaged = entry.time_packaged;
        } else if let Some(found_tp) = check_archive_manifest(id, archive_path, *found_type, digest)? {
            log::warn!(
                "package '{id}': repository manifest and archive disagree, trusting the archive's embedded manifest"
            );
            reused = true;
            time_packaged = Some(found_tp);
        }
    }

    if reused {
        let (archive_path, _) = existing_archive.expect("reused implies an archive was found");
        let p = table.get_mut(id).expect("id came from table");
        p.time_packaged = time_packaged;
        record_archive_stats(p, &archive_path)?;
    } else {
        let p = table.get_mut(id).expect("id came from table");
        rebuild_archive(
            p,
            repo_dir,
            archive_type,
            time_packaged.or(Some(program_start_time)),
        )?;
    }

    let p = table.get(id).expect("id came from table");
    let entry = PackageManifestEntry {
        level,
        md5: p.digest,
        time_packaged: p.time_packaged,
        version: p.version.clone(),
        target_system: p.target_system.clone(),
        min_target_system_version: p.min_target_system_version.clone(),
        cab_size: p.archive_file_size,
        cab_md5: p.archive_file_digest,
        archive_type: Some(archive_type.manifest_type().to_string()),
    };
    manifest.set_package(id, &entry);

    Ok(())
}

/// Searches for `<id>.cab`, `<id>.tar.bz2`, `<id>.tar.lzma` in that order, returning the
/// last one found -- newer formats are preferred when more than one is present.
fn find_existing_archive(repo_dir: &Path, id: &str) -> Option<(PathBuf, ArchiveFileType)> {
    let mut found = None;
    for (ext, archive_type) in [
        ("cab", ArchiveFileType::MsCab),
        ("tar.bz2", ArchiveFileType::TarBzip2),
        ("tar.lzma", ArchiveFileType::TarLzma),
    ] {
        let path = repo_dir.join(format!("{id}.{ext}"));
        if path.is_file() {
            found = Some((path, archive_type));
        }
    }
    found
}

/// Extracts the package manifest embedded in `archive_path` and compares its digest
/// against `expected_digest`, returning its `time_packaged` on a match.
fn check_archive_manifest(
    id: &str,
    archive_path: &Path,
    archive_type: ArchiveFileType,
    expected_digest: Option<crate::digest::Digest>,
) -> Result<Option<i64>> {
    let tmp = tempfile::tempdir().expect("failed to create scratch directory");
    let member = format!("texmf/tpm/packages/{id}.tpm");
    archiveio::extract_member(archive_path, archive_type, &member, tmp.path())?;

    let tpm_path = tmp.path().join(&member);
    if !tpm_path.is_file() {
        return Ok(None);
    }

    let doc = IniDocument::load(&tpm_path).context(error::ReadTpmSnafu {
        path: tpm_path.clone(),
    })?;
    let info = PackageInfo::from_tpm_document(&doc, tmp.path().to_path_buf());

    Ok(match info {
        Some(info) if expected_digest.is_some() && info.digest == expected_digest => {
            info.time_packaged
        }
        _ => None,
    })
}

fn record_archive_stats(p: &mut PackageInfo, archive_path: &Path) -> Result<()> {
    let meta = std::fs::metadata(archive_path).context(error::StatSnafu {
        path: archive_path.to_path_buf(),
    })?;
    p.archive_file_size = Some(meta.len());
    p.archive_file_digest = Some(
        crate::digest::file_digest(archive_path).context(error::DigestSnafu {
            path: archive_path.to_path_buf(),
        })?,
    );
    Ok(())
}

/// Writes a fresh package-manifest file into the staging directory, then archives the
/// package's `texmf/` tree into `<repo_dir>/<id>.<ext>`.
fn rebuild_archive(
    p: &mut PackageInfo,
    repo_dir: &Path,
    archive_type: ArchiveFileType,
    time_packaged: Option<i64>,
) -> Result<()> {
    p.time_packaged = time_packaged;

    let tpm_rel = p.tpm_path();
    if !p.run_files.iter().any(|f| f == &tpm_rel) {
        p.run_files.push(tpm_rel.clone());
    }

    let tpm_abs = p.path.join("Files").join(&tpm_rel);
    if let Some(parent) = tpm_abs.parent() {
        std::fs::create_dir_all(parent).context(error::WriteSnafu {
            path: parent.to_path_buf(),
        })?;
    }
    p.to_tpm_document()
        .write(&tpm_abs)
        .context(error::WriteTpmSnafu { path: tpm_abs })?;

    let files_dir = p.path.join("Files");
    let scratch = tempfile::tempdir().expect("failed to create scratch directory");
    let tar_path = scratch.path().join(format!("{}.tar", p.id));
    archiveio::create_empty_tar(&tar_path)?;
    {
        let _guard = CwdGuard::enter(&files_dir)?;
        archiveio::append_to_tar(&tar_path, "texmf")?;
    }
    let compressed = archiveio::compress(&tar_path, archive_type)?;

    let final_path = repo_dir.join(format!("{}.{}", p.id, archive_type.extension()));
    std::fs::rename(&compressed, &final_path).context(error::WriteSnafu {
        path: final_path.clone(),
    })?;

    record_archive_stats(p, &final_path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::PackageInfo;
    use std::fs;
    use tempfile::tempdir;

    fn pkg_with_file(root: &Path, id: &str) -> PackageInfo {
        let files = root.join("Files").join("texmf").join("tex");
        fs::create_dir_all(&files).unwrap();
        fs::write(files.join(format!("{id}.sty")), b"content").unwrap();
        PackageInfo {
            id: id.to_string(),
            display_name: id.to_string(),
            path: root.to_path_buf(),
            run_files: vec![format!("texmf/tex/{id}.sty")],
            size_run_files: 7,
            ..Default::default()
        }
    }

    #[test]
    fn find_existing_archive_prefers_newest_format() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("foo.cab"), b"x").unwrap();
        fs::write(dir.path().join("foo.tar.bz2"), b"x").unwrap();
        let (_, archive_type) = find_existing_archive(dir.path(), "foo").unwrap();
        assert_eq!(archive_type, ArchiveFileType::TarBzip2);
    }

    #[test]
    fn ignored_and_pure_container_packages_are_skipped() {
        let stage = tempdir().unwrap();
        let repo = tempdir().unwrap();
        let mut table = PackageTable::new();
        table.insert(PackageInfo {
            id: "empty".to_string(),
            display_name: "empty".to_string(),
            path: stage.path().to_path_buf(),
            ..Default::default()
        });
        let mut manifest = RepositoryManifest::empty();

        reconcile_all(
            &mut table,
            repo.path(),
            &mut manifest,
            &[],
            Level::Tiny,
            1_700_000_000,
        )
        .unwrap();

        assert!(manifest.get_package("empty").is_none());
        assert!(repo.path().read_dir().unwrap().next().is_none());
    }
}
