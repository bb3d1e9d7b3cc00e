//! Inverse of the staging reader: given a `.tpm` package manifest and the source tree it
//! references, reconstructs a staging directory -- `package.ini`, `md5sums.txt`,
//! `Description`, and a `Files/` tree with a fresh embedded manifest.

pub mod error;

use crate::digest::{self};
use crate::inifile::IniDocument;
use crate::package::PackageInfo;
use crate::path;
use error::Result;
use snafu::{OptionExt, ResultExt};
use std::path::Path;

/// Reads `tpm_file`, copies every file it lists from `source_dir` into
/// `staging_dir/Files/`, and writes out a complete staging directory at `staging_dir`.
pub fn disassemble_package(tpm_file: &Path, source_dir: &Path, staging_dir: &Path) -> Result<()> {
    let doc = IniDocument::load(tpm_file).context(error::ParseTpmSnafu {
        path: tpm_file.to_path_buf(),
    })?;
    let mut info = PackageInfo::from_tpm_document(&doc, staging_dir.to_path_buf())
        .context(error::MalformedTpmSnafu {
            path: tpm_file.to_path_buf(),
        })?;

    let manifest_rel = info.tpm_path();
    info.run_files.retain(|f| *f != manifest_rel);

    let files_dir = staging_dir.join("Files");
    let mut entries: Vec<(String, crate::digest::Digest)> = Vec::new();
    let mut md5sums_lines: Vec<String> = Vec::new();

    for rel in info.all_files() {
        let src = source_dir.join(rel);
        let dst = files_dir.join(rel);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent).context(error::CreateDirSnafu {
                path: parent.to_path_buf(),
            })?;
        }
        let file_digest = digest::copy_with_digest(&src, &dst).context(error::CopyFileSnafu {
            src: src.clone(),
            dst: dst.clone(),
        })?;
        md5sums_lines.push(format!("{file_digest} {rel}\n"));
        entries.push((rel.clone(), file_digest));
    }

    entries.sort_by(|(a, _), (b, _)| path::dos_cmp(a, b));
    let tds_digest = digest::tds_digest(&entries);
    info.digest = Some(tds_digest);

    write_package_ini(&info, staging_dir)?;

    md5sums_lines.sort();
    let md5sums_path = staging_dir.join("md5sums.txt");
    std::fs::write(&md5sums_path, md5sums_lines.concat()).context(error::WriteSnafu {
        path: md5sums_path,
    })?;

    if let Some(description) = &info.description {
        let description_path = staging_dir.join("Description");
        std::fs::write(&description_path, description).context(error::WriteSnafu {
            path: description_path,
        })?;
    }

    info.run_files.push(manifest_rel);
    let tpm_dir = files_dir.join("texmf").join("tpm").join("packages");
    std::fs::create_dir_all(&tpm_dir).context(error::CreateDirSnafu {
        path: tpm_dir.clone(),
    })?;
    let tpm_path = tpm_dir.join(format!("{}.tpm", info.id));
    info.to_tpm_document()
        .write(&tpm_path)
        .context(error::WriteIniSnafu { path: tpm_path })?;

    Ok(())
}

fn write_package_ini(info: &PackageInfo, staging_dir: &Path) -> Result<()> {
    let mut doc = IniDocument::new();
    doc.set(None, "id", info.id.clone());
    doc.set(None, "name", info.display_name.clone());
    if let Some(v) = &info.title {
        doc.set(None, "title", v.clone());
    }
    if let Some(v) = &info.creator {
        doc.set(None, "creator", v.clone());
    }
    if let Some(v) = &info.version {
        doc.set(None, "version", v.clone());
    }
    if let Some(v) = &info.target_system {
        doc.set(None, "targetsystem", v.clone());
    }
    if let Some(v) = &info.min_target_system_version {
        doc.set(None, "mintargetsystemversion", v.clone());
    }
    if let Some(v) = &info.ctan_path {
        doc.set(None, "ctanpath", v.clone());
    }
    if let Some(v) = &info.copyright_owner {
        doc.set(None, "copyrightowner", v.clone());
    }
    if let Some(v) = &info.copyright_year {
        doc.set(None, "copyrightyear", v.clone());
    }
    if let Some(v) = &info.license_type {
        doc.set(None, "licensetype", v.clone());
    }
    if let Some(d) = info.digest {
        doc.set(None, "md5", d.to_string());
    }
    for dep in &info.required_packages {
        doc.add_multi(None, "requires", dep.clone());
    }

    let path = staging_dir.join("package.ini");
    doc.write(&path).context(error::WriteIniSnafu { path })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::PackageInfo;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reconstructs_staging_directory_from_tpm() {
        let source = tempdir().unwrap();
        let staging = tempdir().unwrap();

        let src_files = source.path().join("texmf").join("tex");
        fs::create_dir_all(&src_files).unwrap();
        fs::write(src_files.join("x.sty"), b"hello\n\n\n\n\n").unwrap();

        let info = PackageInfo {
            id: "foo".to_string(),
            display_name: "Foo".to_string(),
            run_files: vec![
                "texmf/tex/x.sty".to_string(),
                "texmf/tpm/packages/foo.tpm".to_string(),
            ],
            ..Default::default()
        };
        let tpm_path = source.path().join("foo.tpm");
        info.to_tpm_document().write(&tpm_path).unwrap();

        disassemble_package(&tpm_path, source.path(), staging.path()).unwrap();

        assert!(staging.path().join("package.ini").is_file());
        assert!(staging.path().join("md5sums.txt").is_file());
        assert!(staging.path().join("Files/texmf/tex/x.sty").is_file());
        assert!(staging
            .path()
            .join("Files/texmf/tpm/packages/foo.tpm")
            .is_file());

        let restored = IniDocument::load(staging.path().join("package.ini")).unwrap();
        assert_eq!(restored.get(None, "id"), Some("foo"));
    }
}
