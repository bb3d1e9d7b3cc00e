use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to extract database archive '{}': {}", path.display(), source))]
    Extract {
        path: PathBuf,
        source: crate::archiveio::error::Error,
    },

    #[snafu(display("Failed to parse repository manifest '{}': {}", path.display(), source))]
    ParseManifest {
        path: PathBuf,
        source: crate::inifile::error::Error,
    },

    #[snafu(display("Failed to read '{}': {}", path.display(), source))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
