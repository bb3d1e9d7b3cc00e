use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    ExternalTool { source: crate::archiveio::error::Error },

    #[snafu(display("failed to write '{}': {}", path.display(), source))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write manifest '{}': {}", path.display(), source))]
    WriteManifest {
        path: PathBuf,
        source: crate::inifile::error::Error,
    },

    #[snafu(display("failed to write package manifest '{}': {}", path.display(), source))]
    WriteTpm {
        path: PathBuf,
        source: crate::inifile::error::Error,
    },

    #[snafu(display("failed to read directory '{}': {}", path.display(), source))]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to stat '{}': {}", path.display(), source))]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to remove '{}': {}", path.display(), source))]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Repo { source: crate::repo::error::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
