//! Reads an existing repository's database artifacts: the `mpm.ini` repository manifest
//! and the `package-manifests.ini` bundle, each of which may live either uncompressed or
//! inside a `miktex-zzdb<N>-<major>.<minor>.<ext>` archive from a prior run.

pub mod error;

use crate::archiveio;
use crate::digest::Digest;
use crate::inifile::IniDocument;
use crate::package::Level;
use error::Result;
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::Path;

/// Archive-type search order used whenever the uncompressed form of a database file is
/// absent: newest format first, "last match wins" is handled by the archive reconciler,
/// but *reading* always prefers the newest format present.
const FORMAT_SEARCH_ORDER: [(&str, crate::package::ArchiveFileType); 2] = [
    ("tar.lzma", crate::package::ArchiveFileType::TarLzma),
    ("tar.bz2", crate::package::ArchiveFileType::TarBzip2),
];

/// One package's entry in the repository manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifestEntry {
    pub level: Level,
    pub md5: Option<Digest>,
    pub time_packaged: Option<i64>,
    pub version: Option<String>,
    pub target_system: Option<String>,
    pub min_target_system_version: Option<String>,
    pub cab_size: Option<u64>,
    pub cab_md5: Option<Digest>,
    pub archive_type: Option<String>,
}

/// The `mpm.ini` repository manifest: one section per package, plus `[repository]`.
#[derive(Debug, Clone, Default)]
pub struct RepositoryManifest {
    doc: IniDocument,
}

impl RepositoryManifest {
    pub fn empty() -> Self {
        Self {
            doc: IniDocument::new(),
        }
    }

    /// Loads `mpm.ini` from `repo_dir`, extracting it from a `miktex-zzdb1-*` archive if
    /// the uncompressed file is absent. Returns an empty manifest when neither exists
    /// (first run).
    pub fn load(repo_dir: impl AsRef<Path>) -> Result<Self> {
        let repo_dir = repo_dir.as_ref();
        let direct = repo_dir.join("mpm.ini");
        if direct.is_file() {
            let doc = IniDocument::load(&direct).context(error::ParseManifestSnafu { path: direct })?;
            return Ok(Self { doc });
        }

        match find_and_extract(repo_dir, "miktex-zzdb1", "mpm.ini")? {
            Some(text) => {
                let doc = IniDocument::from_str(&text)
                    .context(error::ParseManifestSnafu { path: direct })?;
                Ok(Self { doc })
            }
            None => Ok(Self::empty()),
        }
    }

    pub fn get_package(&self, id: &str) -> Option<PackageManifestEntry> {
        if !self.doc.has_section(id) {
            return None;
        }
        let level = self
            .doc
            .get(Some(id), "Level")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let md5 = self.doc.get_ci(Some(id), "md5").and_then(|s| s.parse().ok());
        let time_packaged = self
            .doc
            .get(Some(id), "TimePackaged")
            .and_then(|s| s.parse().ok());
        let cab_size = self.doc.get(Some(id), "CabSize").and_then(|s| s.parse().ok());
        let cab_md5 = self.doc.get(Some(id), "CabMD5").and_then(|s| s.parse().ok());

        Some(PackageManifestEntry {
            level,
            md5,
            time_packaged,
            version: self.doc.get(Some(id), "Version").map(str::to_string),
            target_system: self.doc.get(Some(id), "TargetSystem").map(str::to_string),
            min_target_system_version: self
                .doc
                .get(Some(id), "MinTargetSystemVersion")
                .map(str::to_string),
            cab_size,
            cab_md5,
            archive_type: self.doc.get(Some(id), "Type").map(str::to_string),
        })
    }

    pub fn set_package(&mut self, id: &str, entry: &PackageManifestEntry) {
        self.doc.set(Some(id), "Level", entry.level.to_string());
        if let Some(md5) = entry.md5 {
            self.doc.set(Some(id), "MD5", md5.to_string());
        }
        if let Some(tp) = entry.time_packaged {
            self.doc.set(Some(id), "TimePackaged", tp.to_string());
        }
        match &entry.version {
            Some(v) => self.doc.set(Some(id), "Version", v.clone()),
            None => self.doc.delete_key(Some(id), "Version"),
        }
        match &entry.target_system {
            Some(v) => self.doc.set(Some(id), "TargetSystem", v.clone()),
            None => self.doc.delete_key(Some(id), "TargetSystem"),
        }
        match &entry.min_target_system_version {
            Some(v) => self.doc.set(Some(id), "MinTargetSystemVersion", v.clone()),
            None => self.doc.delete_key(Some(id), "MinTargetSystemVersion"),
        }
        if let Some(size) = entry.cab_size {
            self.doc.set(Some(id), "CabSize", size.to_string());
        }
        if let Some(md5) = entry.cab_md5 {
            self.doc.set(Some(id), "CabMD5", md5.to_string());
        }
        if let Some(t) = &entry.archive_type {
            self.doc.set(Some(id), "Type", t.clone());
        }
    }

    pub fn remove_package(&mut self, id: &str) {
        self.doc.delete_section(id);
    }

    /// Every package id with a section in the manifest, excluding `[repository]`.
    pub fn package_ids(&self) -> Vec<String> {
        self.doc
            .sections()
            .filter(|s| *s != "repository")
            .map(str::to_string)
            .collect()
    }

    pub fn get_repository_field(&self, key: &str) -> Option<&str> {
        self.doc.get(Some("repository"), key)
    }

    pub fn set_repository_field(&mut self, key: &str, value: impl Into<String>) {
        self.doc.set(Some("repository"), key, value);
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.doc
            .write(path.as_ref())
            .context(error::ParseManifestSnafu {
                path: path.as_ref().to_path_buf(),
            })
    }

    pub fn to_text(&self) -> Result<String> {
        self.doc.to_string().context(error::ParseManifestSnafu {
            path: Path::new("<in-memory>").to_path_buf(),
        })
    }
}

/// Loads `package-manifests.ini` from `repo_dir`, extracting it from `miktex-zzdb3-*` if
/// needed. Returns an empty map when neither form exists.
pub fn load_package_manifests(
    repo_dir: impl AsRef<Path>,
) -> Result<HashMap<String, PackageManifestEntry>> {
    let repo_dir = repo_dir.as_ref();
    let direct = repo_dir.join("package-manifests.ini");
    let text = if direct.is_file() {
        std::fs::read_to_string(&direct).context(error::ReadFileSnafu { path: direct.clone() })?
    } else {
        match find_and_extract(repo_dir, "miktex-zzdb3", "package-manifests.ini")? {
            Some(text) => text,
            None => return Ok(HashMap::new()),
        }
    };

    let doc = IniDocument::from_str(&text).context(error::ParseManifestSnafu { path: direct })?;
    let manifest = RepositoryManifest { doc };
    let mut out = HashMap::new();
    for id in manifest.package_ids() {
        if let Some(entry) = manifest.get_package(&id) {
            out.insert(id, entry);
        }
    }
    Ok(out)
}

/// Looks for `<repo_dir>/<stem>-<major>.<minor>.<ext>` across `FORMAT_SEARCH_ORDER`
/// (newest-preferred) across every `major.minor` series this repository might have been
/// built with, extracting `member` from the first archive found.
fn find_and_extract(repo_dir: &Path, stem: &str, member: &str) -> Result<Option<String>> {
    let Ok(entries) = std::fs::read_dir(repo_dir) else {
        return Ok(None);
    };

    let mut candidates: Vec<(std::path::PathBuf, crate::package::ArchiveFileType)> = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(&format!("{stem}-")) {
            continue;
        }
        for (ext, archive_type) in FORMAT_SEARCH_ORDER {
            if name.ends_with(&format!(".{ext}")) {
                candidates.push((entry.path(), archive_type));
            }
        }
    }
    // Prefer TarLzma over TarBzip2 when both exist.
    candidates.sort_by_key(|(_, t)| match t {
        crate::package::ArchiveFileType::TarLzma => 0,
        _ => 1,
    });

    let Some((archive_path, archive_type)) = candidates.into_iter().next() else {
        return Ok(None);
    };

    let tmp = tempfile::tempdir().expect("failed to create scratch directory");
    archiveio::extract_member(&archive_path, archive_type, member, tmp.path())
        .context(error::ExtractSnafu { path: archive_path })?;
    let text = std::fs::read_to_string(tmp.path().join(member))
        .context(error::ReadFileSnafu { path: tmp.path().join(member) })?;
    Ok(Some(text))
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_returns_empty_manifest_when_nothing_on_disk() {
        let dir = tempdir().unwrap();
        let manifest = RepositoryManifest::load(dir.path()).unwrap();
        assert!(manifest.package_ids().is_empty());
    }

    #[test]
    fn set_and_get_package_round_trips() {
        let mut manifest = RepositoryManifest::empty();
        let entry = PackageManifestEntry {
            level: Level::Small,
            md5: Some("a08261b236da770a562337c9a8dd8e7d".parse().unwrap()),
            time_packaged: Some(1_700_000_000),
            ..Default::default()
        };
        manifest.set_package("foo", &entry);
        let round_tripped = manifest.get_package("foo").unwrap();
        assert_eq!(round_tripped.level, Level::Small);
        assert_eq!(round_tripped.time_packaged, Some(1_700_000_000));
        assert_eq!(round_tripped.md5, entry.md5);
    }

    #[test]
    fn load_package_manifests_returns_empty_map_when_absent() {
        let dir = tempdir().unwrap();
        let manifests = load_package_manifests(dir.path()).unwrap();
        assert!(manifests.is_empty());
    }
}
