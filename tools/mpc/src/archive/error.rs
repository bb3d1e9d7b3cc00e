use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    ExternalTool { source: crate::archiveio::error::Error },

    #[snafu(display("failed to digest '{}': {}", path.display(), source))]
    Digest {
        path: PathBuf,
        source: crate::digest::error::Error,
    },

    #[snafu(display("failed to stat '{}': {}", path.display(), source))]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write '{}': {}", path.display(), source))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write package manifest '{}': {}", path.display(), source))]
    WriteTpm {
        path: PathBuf,
        source: crate::inifile::error::Error,
    },

    #[snafu(display("failed to parse package manifest '{}': {}", path.display(), source))]
    ReadTpm {
        path: PathBuf,
        source: crate::inifile::error::Error,
    },

    #[snafu(display("failed to recompute digest for package '{}': {}", id, source))]
    Recompute {
        id: String,
        source: crate::staging::error::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
