//! The central data model: `PackageInfo`, the package table, and the small enums that
//! tag a package's distribution level and archive format.

use crate::digest::Digest;
use crate::inifile::IniDocument;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A package's distribution tier, or `Ignore` to omit it from every derived artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Small,
    Medium,
    Large,
    Tiny,
    Ignore,
}

impl Default for Level {
    fn default() -> Self {
        Level::Tiny
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" => Ok(Level::Small),
            "M" => Ok(Level::Medium),
            "L" => Ok(Level::Large),
            "T" => Ok(Level::Tiny),
            "-" => Ok(Level::Ignore),
            other => Err(format!("invalid level '{other}', expected one of S M L T -")),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Level::Small => "S",
            Level::Medium => "M",
            Level::Large => "L",
            Level::Tiny => "T",
            Level::Ignore => "-",
        };
        write!(f, "{c}")
    }
}

/// The archive compression format used for a package's compressed archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFileType {
    MsCab,
    TarBzip2,
    TarLzma,
    Tar,
    Zip,
}

impl ArchiveFileType {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFileType::MsCab => "cab",
            ArchiveFileType::TarBzip2 => "tar.bz2",
            ArchiveFileType::TarLzma => "tar.lzma",
            ArchiveFileType::Tar => "tar",
            ArchiveFileType::Zip => "zip",
        }
    }

    /// The value stored in the repository manifest's `Type` field.
    pub fn manifest_type(&self) -> &'static str {
        match self {
            ArchiveFileType::MsCab => "MSCab",
            ArchiveFileType::TarBzip2 => "TarBzip2",
            ArchiveFileType::TarLzma => "TarLzma",
            ArchiveFileType::Tar | ArchiveFileType::Zip => "unknown",
        }
    }
}

impl FromStr for ArchiveFileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MSCab" => Ok(ArchiveFileType::MsCab),
            "TarBzip2" => Ok(ArchiveFileType::TarBzip2),
            "TarLzma" => Ok(ArchiveFileType::TarLzma),
            "Tar" => Ok(ArchiveFileType::Tar),
            "Zip" => Ok(ArchiveFileType::Zip),
            other => Err(format!("invalid archive file type '{other}'")),
        }
    }
}

impl Default for ArchiveFileType {
    fn default() -> Self {
        ArchiveFileType::TarLzma
    }
}

/// The central entity: everything known about one package.
#[derive(Debug, Clone, Default)]
pub struct PackageInfo {
    pub id: String,
    pub display_name: String,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub version: Option<String>,
    pub target_system: Option<String>,
    pub min_target_system_version: Option<String>,
    pub ctan_path: Option<String>,
    pub copyright_owner: Option<String>,
    pub copyright_year: Option<String>,
    pub license_type: Option<String>,
    pub description: Option<String>,

    pub required_packages: Vec<String>,
    pub required_by: Vec<String>,

    pub run_files: Vec<String>,
    pub doc_files: Vec<String>,
    pub source_files: Vec<String>,

    pub size_run_files: u64,
    pub size_doc_files: u64,
    pub size_source_files: u64,

    pub digest: Option<Digest>,
    pub archive_file_digest: Option<Digest>,
    pub archive_file_size: Option<u64>,
    pub time_packaged: Option<i64>,

    pub path: PathBuf,
    pub level: Level,
}

impl PackageInfo {
    /// True if the package has no files at all, or its only file is its own `.tpm`
    /// manifest -- such packages are excluded from archive creation.
    pub fn is_pure_container(&self) -> bool {
        let manifest_path = format!("texmf/tpm/packages/{}.tpm", self.id);
        let all_files: Vec<&String> = self
            .run_files
            .iter()
            .chain(self.doc_files.iter())
            .chain(self.source_files.iter())
            .collect();
        all_files.is_empty() || (all_files.len() == 1 && *all_files[0] == manifest_path)
    }

    /// Every file belonging to this package, across all three classification lists.
    pub fn all_files(&self) -> impl Iterator<Item = &String> {
        self.run_files
            .iter()
            .chain(self.doc_files.iter())
            .chain(self.source_files.iter())
    }

    /// The relative path, rooted at a `texmf/` parent, of this package's own manifest.
    pub fn tpm_path(&self) -> String {
        format!("texmf/tpm/packages/{}.tpm", self.id)
    }

    /// Renders this package as a `.tpm`-style INI document: a flat `package.ini` plus the
    /// embedded run/doc/source file lists a disassembler needs to recover a staging
    /// directory without walking a `Files/` tree.
    pub fn to_tpm_document(&self) -> IniDocument {
        let mut doc = IniDocument::new();
        doc.set(None, "id", self.id.clone());
        doc.set(None, "name", self.display_name.clone());
        if let Some(v) = &self.title {
            doc.set(None, "title", v.clone());
        }
        if let Some(v) = &self.creator {
            doc.set(None, "creator", v.clone());
        }
        if let Some(v) = &self.version {
            doc.set(None, "version", v.clone());
        }
        if let Some(v) = &self.target_system {
            doc.set(None, "targetsystem", v.clone());
        }
        if let Some(v) = &self.min_target_system_version {
            doc.set(None, "mintargetsystemversion", v.clone());
        }
        if let Some(v) = &self.ctan_path {
            doc.set(None, "ctanpath", v.clone());
        }
        if let Some(v) = &self.copyright_owner {
            doc.set(None, "copyrightowner", v.clone());
        }
        if let Some(v) = &self.copyright_year {
            doc.set(None, "copyrightyear", v.clone());
        }
        if let Some(v) = &self.license_type {
            doc.set(None, "licensetype", v.clone());
        }
        if let Some(d) = self.digest {
            doc.set(None, "md5", d.to_string());
        }
        if let Some(tp) = self.time_packaged {
            doc.set(None, "timepackaged", tp.to_string());
        }
        for dep in &self.required_packages {
            doc.add_multi(None, "requires", dep.clone());
        }
        for f in &self.run_files {
            doc.add_multi(None, "runfiles", f.clone());
        }
        for f in &self.doc_files {
            doc.add_multi(None, "docfiles", f.clone());
        }
        for f in &self.source_files {
            doc.add_multi(None, "sourcefiles", f.clone());
        }
        doc
    }

    /// Reconstructs a `PackageInfo` from a `.tpm` document previously produced by
    /// `to_tpm_document`. `path` becomes the reconstructed package's staging path.
    pub fn from_tpm_document(doc: &IniDocument, path: PathBuf) -> Option<PackageInfo> {
        let id = doc
            .get(None, "id")
            .or_else(|| doc.get(None, "externalname"))?
            .to_string();
        let display_name = doc.get(None, "name")?.to_string();

        Some(PackageInfo {
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
            digest: doc.get_ci(None, "md5").and_then(|s| s.parse().ok()),
            time_packaged: doc.get(None, "timepackaged").and_then(|s| s.parse().ok()),
            required_packages: doc
                .get_all(None, "requires")
                .into_iter()
                .map(str::to_string)
                .collect(),
            run_files: doc
                .get_all(None, "runfiles")
                .into_iter()
                .map(str::to_string)
                .collect(),
            doc_files: doc
                .get_all(None, "docfiles")
                .into_iter()
                .map(str::to_string)
                .collect(),
            source_files: doc
                .get_all(None, "sourcefiles")
                .into_iter()
                .map(str::to_string)
                .collect(),
            path,
            ..Default::default()
        })
    }
}

/// A mapping from package id to `PackageInfo`, ordered by id for deterministic iteration.
/// Lookups are case-insensitive per the DOS id semantics in the data model.
#[derive(Debug, Clone, Default)]
pub struct PackageTable {
    packages: BTreeMap<String, PackageInfo>,
}

impl PackageTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(id: &str) -> String {
        id.to_ascii_lowercase()
    }

    /// Inserts `info`, returning `true` if a package with that id already existed (in which
    /// case the existing entry is left in place -- callers should warn and move on, mirroring
    /// the "duplicate package: warning, first wins" policy).
    pub fn insert_if_absent(&mut self, info: PackageInfo) -> bool {
        let key = Self::key(&info.id);
        if self.packages.contains_key(&key) {
            true
        } else {
            self.packages.insert(key, info);
            false
        }
    }

    /// Inserts or overwrites `info` unconditionally.
    pub fn insert(&mut self, info: PackageInfo) {
        self.packages.insert(Self::key(&info.id), info);
    }

    pub fn get(&self, id: &str) -> Option<&PackageInfo> {
        self.packages.get(&Self::key(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PackageInfo> {
        self.packages.get_mut(&Self::key(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.packages.contains_key(&Self::key(id))
    }

    pub fn remove(&mut self, id: &str) -> Option<PackageInfo> {
        self.packages.remove(&Self::key(id))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Packages in id order (ascending, case-insensitive).
    pub fn values(&self) -> impl Iterator<Item = &PackageInfo> {
        self.packages.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut PackageInfo> {
        self.packages.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.packages.values().map(|p| p.id.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pkg(id: &str) -> PackageInfo {
        PackageInfo {
            id: id.to_string(),
            display_name: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn insert_if_absent_is_case_insensitive() {
        let mut table = PackageTable::new();
        assert!(!table.insert_if_absent(pkg("Foo")));
        assert!(table.insert_if_absent(pkg("foo")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn pure_container_detection() {
        let mut p = pkg("foo");
        assert!(p.is_pure_container());
        p.run_files.push("texmf/tpm/packages/foo.tpm".to_string());
        assert!(p.is_pure_container());
        p.run_files.push("texmf/tex/foo.sty".to_string());
        assert!(!p.is_pure_container());
    }

    #[test]
    fn level_round_trips_through_display_and_fromstr() {
        for level in [Level::Small, Level::Medium, Level::Large, Level::Tiny, Level::Ignore] {
            let text = level.to_string();
            let parsed: Level = text.parse().unwrap();
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn tpm_document_round_trips_files_and_digest() {
        let mut p = pkg("foo");
        p.run_files.push("texmf/tex/foo.sty".to_string());
        p.doc_files.push("texmf/doc/foo.pdf".to_string());
        p.required_packages.push("bar".to_string());
        p.digest = Some("a08261b236da770a562337c9a8dd8e7d".parse().unwrap());

        let doc = p.to_tpm_document();
        let restored = PackageInfo::from_tpm_document(&doc, PathBuf::from("/tmp/x")).unwrap();

        assert_eq!(restored.id, "foo");
        assert_eq!(restored.run_files, vec!["texmf/tex/foo.sty".to_string()]);
        assert_eq!(restored.doc_files, vec!["texmf/doc/foo.pdf".to_string()]);
        assert_eq!(restored.required_packages, vec!["bar".to_string()]);
        assert_eq!(restored.digest, p.digest);
    }
}
