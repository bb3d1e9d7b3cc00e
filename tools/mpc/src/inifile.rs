//! Thin read/write wrapper around the `ini` crate for the flat, sectioned documents this
//! tool consumes and produces: `package.ini`, `mpm.ini`, `package-manifests.ini`, `pr.ini`.
//!
//! This module is the narrow "on-disk INI parser/writer" collaborator named in the
//! component design: the rest of the crate only calls `IniDocument::load`/`::write` and
//! the section/key accessors below, never the `ini` crate directly.

pub mod error;

use error::Result;
use ini::Ini;
use snafu::ResultExt;
use std::path::Path;

/// An ordered INI document: a sequence of sections, each an ordered sequence of key/value
/// pairs. Multi-valued keys (e.g. `requires`) are represented by repeating the key.
#[derive(Debug, Clone, Default)]
pub struct IniDocument {
    inner: Ini,
}

impl IniDocument {
    pub fn new() -> Self {
        Self { inner: Ini::new() }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = Ini::load_from_file(path).context(error::ParseSnafu { path })?;
        Ok(Self { inner })
    }

    pub fn from_str(text: &str) -> Result<Self> {
        let inner = Ini::load_from_str(text).context(error::ParseTextSnafu)?;
        Ok(Self { inner })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.inner
            .write_to_file(path)
            .context(error::WriteSnafu { path })
    }

    pub fn to_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.inner
            .write_to(&mut buf)
            .context(error::WriteTextSnafu)?;
        String::from_utf8(buf).ok().context(error::NonUtf8Snafu)
    }

    /// Section names in document order, skipping the implicit "general" section.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.inner
            .sections()
            .filter_map(|s| s)
    }

    pub fn get(&self, section: Option<&str>, key: &str) -> Option<&str> {
        self.inner.get_from(section, key)
    }

    /// Case-insensitive key lookup, used for `package.ini`'s `md5`/`MD5` key.
    pub fn get_ci(&self, section: Option<&str>, key: &str) -> Option<&str> {
        let props = self.inner.section(section)?;
        props
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// All values for a repeated (multi-valued) key within a section, in document order.
    pub fn get_all(&self, section: Option<&str>, key: &str) -> Vec<&str> {
        self.inner
            .section(section)
            .map(|props| props.get_all(key).collect())
            .unwrap_or_default()
    }

    pub fn set(&mut self, section: Option<&str>, key: &str, value: impl Into<String>) {
        self.inner
            .with_section(section)
            .set(key, value.into());
    }

    pub fn delete_key(&mut self, section: Option<&str>, key: &str) {
        if let Some(props) = self.inner.section_mut(section) {
            props.remove_all(key);
        }
    }

    pub fn add_multi(&mut self, section: Option<&str>, key: &str, value: impl Into<String>) {
        self.inner
            .with_section(section)
            .add(key, value.into());
    }

    pub fn delete_section(&mut self, section: &str) {
        self.inner.delete(Some(section));
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.inner.section(Some(section)).is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_sections_and_keys() {
        let mut doc = IniDocument::new();
        doc.set(Some("foo"), "Level", "S");
        doc.set(Some("foo"), "MD5", "abc123");
        doc.add_multi(Some("foo"), "requires", "bar");
        doc.add_multi(Some("foo"), "requires", "baz");

        let text = doc.to_string().unwrap();
        let reloaded = IniDocument::from_str(&text).unwrap();
        assert_eq!(reloaded.get(Some("foo"), "Level"), Some("S"));
        assert_eq!(reloaded.get_all(Some("foo"), "requires"), vec!["bar", "baz"]);
    }

    #[test]
    fn case_insensitive_lookup_finds_either_case() {
        let mut doc = IniDocument::new();
        doc.set(Some("foo"), "MD5", "abc123");
        assert_eq!(doc.get_ci(Some("foo"), "md5"), Some("abc123"));
        assert_eq!(doc.get_ci(Some("foo"), "MD5"), Some("abc123"));
    }

    #[test]
    fn delete_section_removes_it() {
        let mut doc = IniDocument::new();
        doc.set(Some("foo"), "Level", "S");
        assert!(doc.has_section("foo"));
        doc.delete_section("foo");
        assert!(!doc.has_section("foo"));
    }
}
