//! Derives `required_by` from `required_packages`, then attaches orphaned packages to
//! the umbrella packages that collect loose LaTeX and Type1/TrueType font packages.
//!
//! Implemented as two phases -- collect edges, then apply them -- to avoid mutating the
//! table while iterating it and to keep the result independent of iteration order.

use crate::package::PackageTable;

const LATEX_UMBRELLA: &str = "_miktex-latex-packages";
const FONTS_UMBRELLA: &str = "_miktex-fonts-type1";
const LATEX_CONTRIB_PREFIX: &str = "/macros/latex/contrib/";
const FONTS_CTAN_PREFIX: &str = "/fonts/";

/// Runs the categorizer over every package in `table`, mutating `required_by` and, for
/// orphaned packages, the relevant umbrella's `required_packages`.
pub fn categorize(table: &mut PackageTable) {
    transpose_required_by(table);
    attach_orphans_to_umbrellas(table);
}

/// `required_by` is the transpose of `required_packages`: for every edge `p -> dep`,
/// record the reverse edge `dep -> p`. Unknown dependency ids are logged, not fatal.
fn transpose_required_by(table: &mut PackageTable) {
    let edges: Vec<(String, String)> = table
        .values()
        .flat_map(|p| {
            p.required_packages
                .iter()
                .map(move |dep| (p.id.clone(), dep.clone()))
        })
        .collect();

    for id in table.ids().map(str::to_string).collect::<Vec<_>>() {
        if let Some(p) = table.get_mut(&id) {
            p.required_by.clear();
        }
    }

    for (id, dep) in edges {
        if table.contains(&dep) {
            if let Some(dep_pkg) = table.get_mut(&dep) {
                dep_pkg.required_by.push(id.clone());
            }
        } else {
            log::warn!("dependency problem: {dep} is required by {id}");
        }
    }
}

/// For every package with no `required_by` entries, attach it to the LaTeX or fonts
/// umbrella when its CTAN path and run-file locations qualify.
fn attach_orphans_to_umbrellas(table: &mut PackageTable) {
    let has_latex_umbrella = table.contains(LATEX_UMBRELLA);
    let has_fonts_umbrella = table.contains(FONTS_UMBRELLA);

    let mut attach_to_latex = Vec::new();
    let mut attach_to_fonts = Vec::new();

    for p in table.values() {
        if !p.required_by.is_empty() || p.id == LATEX_UMBRELLA || p.id == FONTS_UMBRELLA {
            continue;
        }

        let ctan_path = p.ctan_path.as_deref().unwrap_or_default();
        if has_latex_umbrella && ctan_path.starts_with(LATEX_CONTRIB_PREFIX) {
            attach_to_latex.push(p.id.clone());
        } else if has_fonts_umbrella
            && ctan_path.starts_with(FONTS_CTAN_PREFIX)
            && p.run_files.iter().any(|f| {
                crate::path::starts_with_texmf(f, "fonts/type1")
                    || crate::path::starts_with_texmf(f, "fonts/truetype")
            })
        {
            attach_to_fonts.push(p.id.clone());
        }
    }

    attach(table, LATEX_UMBRELLA, &attach_to_latex);
    attach(table, FONTS_UMBRELLA, &attach_to_fonts);
}

fn attach(table: &mut PackageTable, umbrella_id: &str, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    if let Some(umbrella) = table.get_mut(umbrella_id) {
        for id in ids {
            umbrella.required_packages.push(id.clone());
        }
    }
    for id in ids {
        if let Some(p) = table.get_mut(id) {
            p.required_by.push(umbrella_id.to_string());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::PackageInfo;

    fn pkg(id: &str) -> PackageInfo {
        PackageInfo {
            id: id.to_string(),
            display_name: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn transpose_is_exact_inverse_of_required_packages() {
        let mut table = PackageTable::new();
        let mut foo = pkg("foo");
        foo.required_packages.push("bar".to_string());
        table.insert(foo);
        table.insert(pkg("bar"));

        categorize(&mut table);

        assert_eq!(table.get("bar").unwrap().required_by, vec!["foo".to_string()]);
        assert!(table.get("foo").unwrap().required_by.is_empty());
    }

    #[test]
    fn unknown_dependency_does_not_panic_or_create_entry() {
        let mut table = PackageTable::new();
        let mut foo = pkg("foo");
        foo.required_packages.push("ghost".to_string());
        table.insert(foo);

        categorize(&mut table);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn orphan_latex_contrib_package_attaches_to_umbrella() {
        let mut table = PackageTable::new();
        table.insert(pkg(LATEX_UMBRELLA));
        let mut orphan = pkg("foo");
        orphan.ctan_path = Some("/macros/latex/contrib/foo".to_string());
        table.insert(orphan);

        categorize(&mut table);

        assert!(table
            .get(LATEX_UMBRELLA)
            .unwrap()
            .required_packages
            .contains(&"foo".to_string()));
        assert_eq!(
            table.get("foo").unwrap().required_by,
            vec![LATEX_UMBRELLA.to_string()]
        );
    }

    #[test]
    fn orphan_font_package_requires_type1_or_truetype_run_file() {
        let mut table = PackageTable::new();
        table.insert(pkg(FONTS_UMBRELLA));
        let mut font_pkg = pkg("foofont");
        font_pkg.ctan_path = Some("/fonts/foo".to_string());
        font_pkg.run_files.push("texmf/fonts/type1/foo/foo.pfb".to_string());
        table.insert(font_pkg);

        let mut non_matching = pkg("barfont");
        non_matching.ctan_path = Some("/fonts/bar".to_string());
        non_matching.run_files.push("texmf/fonts/afm/bar/bar.afm".to_string());
        table.insert(non_matching);

        categorize(&mut table);

        assert!(table
            .get(FONTS_UMBRELLA)
            .unwrap()
            .required_packages
            .contains(&"foofont".to_string()));
        assert!(!table
            .get(FONTS_UMBRELLA)
            .unwrap()
            .required_packages
            .contains(&"barfont".to_string()));
    }
}
