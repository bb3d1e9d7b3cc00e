use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to parse package manifest '{}': {}", path.display(), source))]
    ParseTpm {
        path: PathBuf,
        source: crate::inifile::error::Error,
    },

    #[snafu(display("'{}' is not a well-formed package manifest", path.display()))]
    MalformedTpm { path: PathBuf },

    #[snafu(display("failed to create directory '{}': {}", path.display(), source))]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to copy '{}' to '{}': {}", src.display(), dst.display(), source))]
    CopyFile {
        src: PathBuf,
        dst: PathBuf,
        source: crate::digest::error::Error,
    },

    #[snafu(display("failed to write '{}': {}", path.display(), source))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write package manifest '{}': {}", path.display(), source))]
    WriteIni {
        path: PathBuf,
        source: crate::inifile::error::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
