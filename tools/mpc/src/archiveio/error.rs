use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("required external tool '{}' was not found on PATH", tool))]
    ToolNotFound { tool: String },

    #[snafu(display("failed to run '{}': {}", command, source))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("'{}' exited with a failure status:\n{}", command, output))]
    NonZeroExit { command: String, output: String },

    #[snafu(display("failed to change directory to '{}': {}", dir.display(), source))]
    Chdir {
        dir: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
