//! Reads a staging directory -- `package.ini`, an optional `Description` file, and a
//! `Files/` subtree rooted at `texmf/` -- into a `PackageInfo`.

pub mod error;

use crate::digest::{self, Digest};
use crate::inifile::IniDocument;
use crate::package::PackageInfo;
use crate::path::{self, FileClass};
use error::{Result, *};
use snafu::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The platform path separator used to split a multi-valued `requires` field and
/// `--staging-roots`. On Unix this is `:`.
pub const PATH_SEPARATOR: char = ':';

/// Reads the staging directory rooted at `dir` into a `PackageInfo`. The package's
/// `time_packaged`, `archive_file_digest`, `archive_file_size`, and `level` are left unset;
/// those are the archive reconciler's job.
pub fn read_staging_dir(dir: impl AsRef<Path>) -> Result<PackageInfo> {
    let dir = dir.as_ref();
    let ini_path = dir.join("package.ini");
    let doc = IniDocument::load(&ini_path).context(ReadIniSnafu { dir })?;

    let id = doc
        .get(None, "id")
        .or_else(|| doc.get(None, "externalname"))
        .context(MissingKeySnafu {
            dir,
            key: "id".to_string(),
        })?
        .to_string();
    let display_name = doc
        .get(None, "name")
        .context(MissingKeySnafu {
            dir,
            key: "name".to_string(),
        })?
        .to_string();

    let mut info = PackageInfo {
        id,
        display_name,
        title: doc.get(None, "title").map(str::to_string),
        creator: doc.get(None, "creator").map(str::to_string),
        version: doc.get(None, "version").map(str::to_string),
        target_system: doc.get(None, "targetsystem").map(str::to_string),
        min_target_system_version: doc
            .get(None, "mintargetsystemversion")
            .map(str::to_string),
        ctan_path: doc.get(None, "ctanpath").map(str::to_string),
        copyright_owner: doc.get(None, "copyrightowner").map(str::to_string),
        copyright_year: doc.get(None, "copyrightyear").map(str::to_string),
        license_type: doc.get(None, "licensetype").map(str::to_string),
        description: read_description(dir)?,
        path: dir.to_path_buf(),
        ..Default::default()
    };

    info.required_packages = doc
        .get_all(None, "requires")
        .into_iter()
        .flat_map(|line| line.split(PATH_SEPARATOR))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(md5) = doc.get_ci(None, "md5") {
        let parsed: Digest = md5.parse().context(ParseDigestSnafu { dir })?;
        info.digest = Some(parsed);
    }

    let files_dir = dir.join("Files");
    if files_dir.is_dir() {
        collect_files(&files_dir, &mut info)?;
    }

    Ok(info)
}

fn read_description(dir: &Path) -> Result<Option<String>> {
    let path = dir.join("Description");
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).context(ReadFileSnafu { path: path.clone() })?;
    Ok(Some(text))
}

fn collect_files(files_dir: &Path, info: &mut PackageInfo) -> Result<()> {
    let walker = WalkDir::new(files_dir)
        .same_file_system(true)
        .follow_links(false);

    for entry in walker {
        let entry = entry.context(WalkFilesSnafu {
            dir: files_dir.to_path_buf(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(files_dir)
            .expect("walkdir entries are rooted at files_dir")
            .to_string_lossy()
            .replace('\\', "/");

        let meta = entry.path().metadata().context(StatFileSnafu {
            path: entry.path().to_path_buf(),
        })?;
        let size = meta.len();

        match path::classify(&rel) {
            FileClass::Doc => {
                info.doc_files.push(rel);
                info.size_doc_files += size;
            }
            FileClass::Source => {
                info.source_files.push(rel);
                info.size_source_files += size;
            }
            FileClass::Run => {
                info.run_files.push(rel);
                info.size_run_files += size;
            }
        }
    }

    Ok(())
}

/// Recomputes the TDS digest of every file belonging to `info`, excluding its own
/// package-manifest file, sorting entries in DOS order before hashing per the wire
/// contract in `crate::digest::tds_digest`.
pub fn recompute_tds_digest(info: &PackageInfo) -> Result<Digest> {
    let manifest_path = format!("texmf/tpm/packages/{}.tpm", info.id);
    let mut entries: Vec<(String, Digest)> = Vec::new();

    for rel in info.all_files() {
        if *rel == manifest_path {
            continue;
        }
        let abs: PathBuf = info.path.join("Files").join(rel);
        let d = digest::file_digest(&abs).context(DigestFileSnafu { path: abs.clone() })?;
        entries.push((rel.clone(), d));
    }

    entries.sort_by(|(a, _), (b, _)| path::dos_cmp(a, b));
    Ok(digest::tds_digest(&entries))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_package(dir: &Path, ini: &str) {
        fs::write(dir.join("package.ini"), ini).unwrap();
    }

    #[test]
    fn reads_minimal_package_and_classifies_run_file() {
        let dir = tempdir().unwrap();
        write_package(dir.path(), "id=foo\nname=Foo\n");
        let files = dir.path().join("Files").join("texmf").join("tex");
        fs::create_dir_all(&files).unwrap();
        fs::write(files.join("x.sty"), b"hello\n\n\n\n\n").unwrap();

        let info = read_staging_dir(dir.path()).unwrap();
        assert_eq!(info.id, "foo");
        assert_eq!(info.display_name, "Foo");
        assert_eq!(info.run_files, vec!["texmf/tex/x.sty".to_string()]);
        assert_eq!(info.size_run_files, 10);
        assert_eq!(info.size_doc_files, 0);
        assert_eq!(info.size_source_files, 0);
    }

    #[test]
    fn partitions_doc_source_and_run_files() {
        let dir = tempdir().unwrap();
        write_package(dir.path(), "id=foo\nname=Foo\n");
        let base = dir.path().join("Files").join("texmf");
        fs::create_dir_all(base.join("tex")).unwrap();
        fs::create_dir_all(base.join("doc")).unwrap();
        fs::create_dir_all(base.join("source")).unwrap();
        fs::write(base.join("tex").join("x.sty"), b"a").unwrap();
        fs::write(base.join("doc").join("x.pdf"), b"bb").unwrap();
        fs::write(base.join("source").join("x.dtx"), b"ccc").unwrap();

        let info = read_staging_dir(dir.path()).unwrap();
        assert_eq!(info.run_files.len(), 1);
        assert_eq!(info.doc_files.len(), 1);
        assert_eq!(info.source_files.len(), 1);
    }

    #[test]
    fn missing_id_is_fatal() {
        let dir = tempdir().unwrap();
        write_package(dir.path(), "name=Foo\n");
        let err = read_staging_dir(dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
    }

    #[test]
    fn multi_valued_requires_splits_on_path_separator() {
        let dir = tempdir().unwrap();
        write_package(
            dir.path(),
            "id=foo\nname=Foo\nrequires=bar:baz\nrequires=qux\n",
        );
        let info = read_staging_dir(dir.path()).unwrap();
        assert_eq!(
            info.required_packages,
            vec!["bar".to_string(), "baz".to_string(), "qux".to_string()]
        );
    }
}
