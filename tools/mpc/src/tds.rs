//! Builds a TDS (TeX Directory Structure) tree: copies every non-ignored package's files
//! into a shared `texmf/` root, verifies each package's digest along the way, and writes
//! the resulting `mpm.ini`.

pub mod error;

use crate::digest::{self, Digest};
use crate::package::{Level, PackageTable};
use crate::path;
use crate::repo::{PackageManifestEntry, RepositoryManifest};
use error::Result;
use snafu::ResultExt;
use std::path::Path;

/// Copies every non-ignored package's files from its staging directory into
/// `texmf_parent/texmf/...`, verifying the TDS digest of each package as it goes, then
/// writes `texmf_parent/mpm.ini`. `tpm_dir`, when given, overrides where package-manifest
/// files land (default: `texmf_parent/texmf/tpm/packages/`).
pub fn build_tds(table: &PackageTable, texmf_parent: &Path, tpm_dir: Option<&Path>) -> Result<()> {
    let mut manifest = RepositoryManifest::empty();

    for p in table.values().filter(|p| p.level != Level::Ignore) {
        let mut entries: Vec<(String, Digest)> = Vec::new();
        let manifest_rel = p.tpm_path();

        for rel in p.all_files() {
            if *rel == manifest_rel {
                continue;
            }
            let src = p.path.join("Files").join(rel);
            let dst = texmf_parent.join(rel);
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent).context(error::CreateDirSnafu {
                    path: parent.to_path_buf(),
                })?;
            }
            let copied_digest = digest::copy_with_digest(&src, &dst).context(error::CopyFileSnafu {
                src: src.clone(),
                dst: dst.clone(),
            })?;
            entries.push((rel.clone(), copied_digest));
        }

        entries.sort_by(|(a, _), (b, _)| path::dos_cmp(a, b));
        let computed = digest::tds_digest(&entries);

        let recorded = match p.digest {
            Some(d) => d,
            None => crate::staging::recompute_tds_digest(p).context(error::RecomputeSnafu {
                id: p.id.clone(),
            })?,
        };
        if computed != recorded {
            return Err(error::DigestMismatchSnafu {
                id: p.id.clone(),
                computed: computed.to_string(),
                recorded: recorded.to_string(),
            }
            .build());
        }

        let tpm_base = tpm_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| texmf_parent.join("texmf").join("tpm").join("packages"));
        std::fs::create_dir_all(&tpm_base).context(error::CreateDirSnafu {
            path: tpm_base.clone(),
        })?;
        let tpm_path = tpm_base.join(format!("{}.tpm", p.id));
        p.to_tpm_document()
            .write(&tpm_path)
            .context(error::WriteTpmSnafu { path: tpm_path })?;

        manifest.set_package(
            &p.id,
            &PackageManifestEntry {
                level: p.level,
                md5: Some(computed),
                time_packaged: p.time_packaged,
                version: p.version.clone(),
                target_system: p.target_system.clone(),
                min_target_system_version: p.min_target_system_version.clone(),
                ..Default::default()
            },
        );
    }

    manifest.save(texmf_parent.join("mpm.ini"))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::PackageInfo;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn copies_files_and_verifies_digest() {
        let stage = tempdir().unwrap();
        let dest = tempdir().unwrap();

        let files_dir = stage.path().join("Files").join("texmf").join("tex");
        fs::create_dir_all(&files_dir).unwrap();
        fs::write(files_dir.join("x.sty"), b"hello\n\n\n\n\n").unwrap();

        let mut p = PackageInfo {
            id: "foo".to_string(),
            display_name: "Foo".to_string(),
            path: stage.path().to_path_buf(),
            run_files: vec!["texmf/tex/x.sty".to_string()],
            ..Default::default()
        };
        p.digest = Some(crate::staging::recompute_tds_digest(&p).unwrap());

        let mut table = PackageTable::new();
        table.insert(p);

        build_tds(&table, dest.path(), None).unwrap();

        assert!(dest.path().join("texmf/tex/x.sty").is_file());
        assert!(dest
            .path()
            .join("texmf/tpm/packages/foo.tpm")
            .is_file());
        assert!(dest.path().join("mpm.ini").is_file());
    }

    #[test]
    fn mismatched_digest_is_fatal() {
        let stage = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let files_dir = stage.path().join("Files").join("texmf").join("tex");
        fs::create_dir_all(&files_dir).unwrap();
        fs::write(files_dir.join("x.sty"), b"hello").unwrap();

        let mut p = PackageInfo {
            id: "foo".to_string(),
            display_name: "Foo".to_string(),
            path: stage.path().to_path_buf(),
            run_files: vec!["texmf/tex/x.sty".to_string()],
            ..Default::default()
        };
        p.digest = Some("00000000000000000000000000000000".parse().unwrap());

        let mut table = PackageTable::new();
        table.insert(p);

        let err = build_tds(&table, dest.path(), None).unwrap_err();
        assert!(matches!(err, Error::DigestMismatch { .. }));
    }
}
