use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to parse INI file '{}': {}", path.display(), source))]
    Parse {
        path: PathBuf,
        source: ini::Error,
    },

    #[snafu(display("Failed to parse INI text: {}", source))]
    ParseText { source: ini::ParseError },

    #[snafu(display("Failed to write INI file '{}': {}", path.display(), source))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to render INI text: {}", source))]
    WriteText { source: std::io::Error },

    #[snafu(display("INI document was not valid UTF-8"))]
    NonUtf8,
}

pub type Result<T> = std::result::Result<T, Error>;
