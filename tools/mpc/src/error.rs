//! Crate-level error type, wrapping each collaborator module's own `Error` as a source --
//! the same shape `tools/pubsys/src/main.rs`'s top-level `error::Error` uses to wrap
//! `crate::repo::Error`, `crate::aws::ssm::Error`, and so on.

use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Staging { source: crate::staging::error::Error },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    PackageList {
        source: crate::packagelist::error::Error,
    },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Repo { source: crate::repo::error::Error },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Archive { source: crate::archive::error::Error },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Database { source: crate::database::error::Error },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Tds { source: crate::tds::error::Error },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Disassemble {
        source: crate::disassemble::error::Error,
    },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    ArchiveIo {
        source: crate::archiveio::error::Error,
    },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Signing { source: crate::signing::error::Error },

    #[snafu(display("unsupported MiKTeX series {requested_major}.{requested_minor} (this build supports up to {max_major}.{max_minor})"))]
    UnsupportedSeries {
        requested_major: u32,
        requested_minor: u32,
        max_major: u32,
        max_minor: u32,
    },

    #[snafu(display("no staging directories were given"))]
    NoStagingRoots,

    #[snafu(display("failed to read directory '{}': {}", path.display(), source))]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
