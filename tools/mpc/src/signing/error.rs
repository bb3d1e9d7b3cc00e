use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("failed to read private key file '{}': {}", path.display(), source))]
    ReadPrivateKey {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to read passphrase file '{}': {}", path.display(), source))]
    ReadPassphrase {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
