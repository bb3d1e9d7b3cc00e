//! Content-addressed digests used to decide whether a package's archive is up to date.
//!
//! Every digest in this crate is the 128-bit output of the `md-5` crate's `Digest` trait,
//! used the same way `buildsys::cache::LookasideCache::verify_file` drives `sha2::Sha512`:
//! create a hasher, feed it bytes, `finalize()`, and hex-encode the result.

pub mod error;

use error::Result;
use filetime::FileTime;
use md5::{Digest as _, Md5};
use snafu::{OptionExt, ResultExt};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// A 128-bit content digest, displayed as 32 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 16]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl FromStr for Digest {
    type Err = error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s).ok().context(error::MalformedDigestSnafu {
            text: s.to_string(),
        })?;
        let bytes: [u8; 16] = bytes
            .try_into()
            .ok()
            .context(error::MalformedDigestSnafu { text: s.to_string() })?;
        Ok(Digest(bytes))
    }
}

/// Streaming 128-bit hash of a file's bytes.
pub fn file_digest(path: impl AsRef<Path>) -> Result<Digest> {
    let path = path.as_ref();
    let mut f = File::open(path).context(error::FileOpenSnafu { path })?;
    let mut hasher = Md5::new();
    io::copy(&mut f, &mut hasher).context(error::FileReadSnafu { path })?;
    Ok(Digest(hasher.finalize().into()))
}

/// Copies `src` to `dst`, computing the digest of the bytes as they are copied, then
/// mirrors `src`'s (creation, access, modification) timestamps onto `dst`.
pub fn copy_with_digest(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<Digest> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    let mut in_f = File::open(src).context(error::FileOpenSnafu { path: src })?;
    let mut out_f = File::create(dst).context(error::FileCreateSnafu { path: dst })?;
    let mut hasher = Md5::new();
    {
        let mut tee = TeeWriter {
            writer: &mut out_f,
            hasher: &mut hasher,
        };
        io::copy(&mut in_f, &mut tee).context(error::FileCopySnafu { src, dst })?;
    }
    drop(out_f);

    let meta = std::fs::metadata(src).context(error::FileStatSnafu { path: src })?;
    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(dst, atime, mtime).context(error::SetTimesSnafu { path: dst })?;

    Ok(Digest(hasher.finalize().into()))
}

/// Writer adapter that feeds every byte written through to a hasher as well as the
/// underlying writer, so a single `io::copy` both copies and digests.
struct TeeWriter<'a, W> {
    writer: &'a mut W,
    hasher: &'a mut Md5,
}

impl<'a, W: io::Write> io::Write for TeeWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Hashes a list of `(dos-path, file-digest)` pairs, which the caller must have already
/// sorted in case-insensitive DOS-ordered key order (see `crate::path::dos_cmp`). Ordering
/// is part of the wire contract: reimplementations must reproduce it exactly.
pub fn tds_digest<S: AsRef<str>>(entries: &[(S, Digest)]) -> Digest {
    let mut hasher = Md5::new();
    for (path, digest) in entries {
        hasher.update(crate::path::dos_normalize(path.as_ref()).as_bytes());
        hasher.update(digest.as_bytes());
    }
    Digest(hasher.finalize().into())
}

/// Hashes the sorted `<name>;<size>\n` listing used for `pr.ini`'s `lstdigest` field.
pub fn listing_digest<'a>(entries: impl Iterator<Item = (&'a str, u64)>) -> Digest {
    let mut lines: Vec<String> = entries.map(|(name, size)| format!("{name};{size}\n")).collect();
    lines.sort();
    let mut hasher = Md5::new();
    for line in lines {
        hasher.update(line.as_bytes());
    }
    Digest(hasher.finalize().into())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn file_digest_matches_known_md5() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.sty");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"hello\n\n\n\n\n").unwrap();
        drop(f);

        let digest = file_digest(&path).unwrap();
        // md5sum of "hello\n\n\n\n\n"
        assert_eq!(digest.to_string(), "a08261b236da770a562337c9a8dd8e7d");
    }

    #[test]
    fn digest_round_trips_through_display_and_fromstr() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a");
        std::fs::write(&path, b"abc").unwrap();
        let digest = file_digest(&path).unwrap();
        let text = digest.to_string();
        let parsed: Digest = text.parse().unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn tds_digest_depends_on_order() {
        let d1 = file_digest_bytes(b"one");
        let d2 = file_digest_bytes(b"two");
        let forward = tds_digest(&[("a", d1), ("b", d2)]);
        let backward = tds_digest(&[("b", d2), ("a", d1)]);
        assert_ne!(forward, backward);
    }

    fn file_digest_bytes(bytes: &[u8]) -> Digest {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, bytes).unwrap();
        file_digest(&path).unwrap()
    }
}
