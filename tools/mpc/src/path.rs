//! DOS-style path comparison and TDS prefix classification.
//!
//! MiKTeX-style repositories are indexed the way a case-insensitive DOS filesystem would
//! sort and compare paths: forward slashes become backslashes and ASCII letters are
//! upper-cased before comparison. Non-ASCII bytes are left untouched.

use std::cmp::Ordering;

/// Replaces forward slashes with backslashes and upper-cases ASCII letters.
pub fn dos_normalize(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            '/' => '\\',
            c if c.is_ascii() => c.to_ascii_uppercase(),
            c => c,
        })
        .collect()
}

/// Compares two forward-slash paths under DOS semantics without requiring the caller to
/// normalize both ahead of time.
pub fn dos_cmp(a: &str, b: &str) -> Ordering {
    dos_normalize(a).cmp(&dos_normalize(b))
}

/// True iff `rel` begins with `texmf/<sub>/`, e.g. `starts_with_texmf("texmf/doc/foo", "doc")`.
pub fn starts_with_texmf(rel: &str, sub: &str) -> bool {
    let prefix = format!("texmf/{sub}/");
    rel.starts_with(&prefix)
}

/// Classification of a file's relative path within a package's `Files/` tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Doc,
    Source,
    Run,
}

/// Classifies a TDS-relative path per the run/doc/source partition rule.
pub fn classify(rel: &str) -> FileClass {
    if starts_with_texmf(rel, "doc") {
        FileClass::Doc
    } else if starts_with_texmf(rel, "source") {
        FileClass::Source
    } else {
        FileClass::Run
    }
}

/// Strips a single leading `texmf/` path component, used when writing `files.csv`.
pub fn strip_texmf_prefix(rel: &str) -> &str {
    rel.strip_prefix("texmf/").unwrap_or(rel)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_slashes_and_case() {
        assert_eq!(dos_normalize("texmf/tex/latex/Foo.sty"), "TEXMF\\TEX\\LATEX\\FOO.STY");
    }

    #[test]
    fn compares_case_insensitively() {
        assert_eq!(dos_cmp("texmf/tex/a.sty", "TEXMF/TEX/A.STY"), Ordering::Equal);
        assert_eq!(dos_cmp("texmf/tex/a.sty", "texmf/tex/b.sty"), Ordering::Less);
    }

    #[test]
    fn classifies_doc_source_and_run() {
        assert_eq!(classify("texmf/doc/foo/readme.pdf"), FileClass::Doc);
        assert_eq!(classify("texmf/source/foo/foo.dtx"), FileClass::Source);
        assert_eq!(classify("texmf/tex/latex/foo/foo.sty"), FileClass::Run);
        // "docs" is not "doc/" -- must not be misclassified.
        assert_eq!(classify("texmf/docs/foo"), FileClass::Run);
    }

    #[test]
    fn strips_single_texmf_prefix() {
        assert_eq!(strip_texmf_prefix("texmf/tex/latex/foo/foo.sty"), "tex/latex/foo/foo.sty");
        assert_eq!(strip_texmf_prefix("notexmf/x"), "notexmf/x");
    }
}
