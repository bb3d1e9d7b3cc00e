use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
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

    #[snafu(display(
        "package '{}': computed TDS digest does not match the digest recorded in package.ini ({} != {})",
        id,
        computed,
        recorded
    ))]
    DigestMismatch {
        id: String,
        computed: String,
        recorded: String,
    },

    #[snafu(display("failed to write package manifest '{}': {}", path.display(), source))]
    WriteTpm {
        path: PathBuf,
        source: crate::inifile::error::Error,
    },

    #[snafu(display("package '{}': failed to compute TDS digest: {}", id, source))]
    Recompute {
        id: String,
        source: crate::staging::error::Error,
    },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Repo { source: crate::repo::error::Error },
}

pub type Result<T> = std::result::Result<T, Error>;
