use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to open '{}': {}", path.display(), source))]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to create '{}': {}", path.display(), source))]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to read '{}': {}", path.display(), source))]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to copy '{}' to '{}': {}", src.display(), dst.display(), source))]
    FileCopy {
        src: PathBuf,
        dst: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to stat '{}': {}", path.display(), source))]
    FileStat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to set timestamps on '{}': {}", path.display(), source))]
    SetTimes {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Malformed digest '{}'", text))]
    MalformedDigest { text: String },
}

pub type Result<T> = std::result::Result<T, Error>;
