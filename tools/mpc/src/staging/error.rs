use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to read package.ini in '{}': {}", dir.display(), source))]
    ReadIni {
        dir: PathBuf,
        source: crate::inifile::error::Error,
    },

    #[snafu(display("'{}' is missing required key '{}'", dir.display(), key))]
    MissingKey { dir: PathBuf, key: String },

    #[snafu(display("Failed to read '{}': {}", path.display(), source))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to walk '{}': {}", dir.display(), source))]
    WalkFiles {
        dir: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("Failed to stat '{}': {}", path.display(), source))]
    StatFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to digest '{}': {}", path.display(), source))]
    DigestFile {
        path: PathBuf,
        source: crate::digest::error::Error,
    },

    #[snafu(display("Malformed digest in '{}': {}", dir.display(), source))]
    ParseDigest {
        dir: PathBuf,
        source: crate::digest::error::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
