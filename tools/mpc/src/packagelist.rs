//! Reads a package-list file: one package per line, a level tag, an optional archive
//! type, and `@file` includes.

pub mod error;

use crate::package::{ArchiveFileType, Level};
use error::{Result, *};
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One line of a package list: the id, its level, and an optional preferred archive type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub id: String,
    pub level: Level,
    pub archive_file_type: Option<ArchiveFileType>,
}

/// Reads `path` (and any files it `@includes`), returning specs in file order with later
/// duplicate ids dropped (first occurrence wins; a warning is logged for each duplicate).
pub fn read_package_list(path: impl AsRef<Path>) -> Result<Vec<PackageSpec>> {
    let mut seen_ids = HashSet::new();
    let mut specs = Vec::new();
    let mut visiting = HashSet::new();
    read_into(path.as_ref(), &mut visiting, &mut seen_ids, &mut specs)?;
    Ok(specs)
}

fn read_into(
    path: &Path,
    visiting: &mut HashSet<PathBuf>,
    seen_ids: &mut HashSet<String>,
    out: &mut Vec<PackageSpec>,
) -> Result<()> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    ensure!(
        !visiting.contains(&canonical),
        CyclicIncludeSnafu { path: path.to_path_buf() }
    );
    visiting.insert(canonical.clone());

    let text = std::fs::read_to_string(path).context(ReadFileSnafu {
        path: path.to_path_buf(),
    })?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_start();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(include) = line.strip_prefix('@') {
            let include_path = dir.join(include.trim());
            read_into(&include_path, visiting, seen_ids, out)?;
            continue;
        }

        let mut chars = line.chars();
        let level_char = chars.next().expect("line is non-empty");
        let level: Level = level_char.to_string().parse().map_err(|_| {
            InvalidLevelSnafu {
                path: path.to_path_buf(),
                line: line_no,
                text: level_char.to_string(),
            }
            .build()
        })?;

        let rest = chars.as_str().trim_start();
        let mut tokens = rest.split(';');
        let id = tokens
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .context(EmptyIdSnafu {
                path: path.to_path_buf(),
                line: line_no,
            })?
            .to_string();

        let archive_file_type = match tokens.next().map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => Some(text.parse::<ArchiveFileType>().map_err(|_| {
                InvalidArchiveTypeSnafu {
                    path: path.to_path_buf(),
                    line: line_no,
                    text: text.to_string(),
                }
                .build()
            })?),
            None => None,
        };

        if !seen_ids.insert(id.clone()) {
            log::warn!("duplicate package '{id}' in package list, keeping first occurrence");
            continue;
        }

        out.push(PackageSpec {
            id,
            level,
            archive_file_type,
        });
    }

    visiting.remove(&canonical);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_level_id_and_archive_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "S foo;TarLzma\n- bar\n").unwrap();

        let specs = read_package_list(&path).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].id, "foo");
        assert_eq!(specs[0].level, Level::Small);
        assert_eq!(specs[0].archive_file_type, Some(ArchiveFileType::TarLzma));
        assert_eq!(specs[1].id, "bar");
        assert_eq!(specs[1].level, Level::Ignore);
        assert_eq!(specs[1].archive_file_type, None);
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "\n# comment\nT foo\n").unwrap();
        let specs = read_package_list(&path).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].id, "foo");
    }

    #[test]
    fn follows_includes_relative_to_including_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.txt"), "@sub/included.txt\nT foo\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/included.txt"), "T bar\n").unwrap();

        let specs = read_package_list(dir.path().join("main.txt")).unwrap();
        let ids: Vec<&str> = specs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["bar", "foo"]);
    }

    #[test]
    fn first_occurrence_wins_on_duplicate_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "S foo\nL foo\n").unwrap();
        let specs = read_package_list(&path).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].level, Level::Small);
    }

    #[test]
    fn cyclic_include_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "@b.txt\n").unwrap();
        fs::write(dir.path().join("b.txt"), "@a.txt\n").unwrap();
        let err = read_package_list(dir.path().join("a.txt")).unwrap_err();
        assert!(matches!(err, Error::CyclicInclude { .. }));
    }
}
