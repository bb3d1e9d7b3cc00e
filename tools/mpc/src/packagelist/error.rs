use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to read package list '{}': {}", path.display(), source))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display(
        "Package list '{}' line {}: expected a level character (S, M, L, T, or -), found '{}'",
        path.display(),
        line,
        text
    ))]
    InvalidLevel {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[snafu(display(
        "Package list '{}' line {}: empty package id",
        path.display(),
        line
    ))]
    EmptyId { path: PathBuf, line: usize },

    #[snafu(display(
        "Package list '{}' line {}: unrecognized archive type '{}'",
        path.display(),
        line,
        text
    ))]
    InvalidArchiveType {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[snafu(display("Package list '{}' includes itself, directly or transitively", path.display()))]
    CyclicInclude { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
