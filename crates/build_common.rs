// README-to-rustdoc rendering shared by every crate's build.rs.
//
// Usage: `include!("../build_common.rs");` after importing `std::env`,
// `std::fs` and `std::path::Path`.

/// Write `$OUT_DIR/README_GENERATED.md` from the crate's README.
///
/// Source links such as `[Segmenter](src/segmenter.rs)` become module links
/// (`segmenter`) and links to the workspace README point at the repository
/// URL. A missing README renders as an empty page.
fn process_readme_for_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");
    println!("cargo:rerun-if-changed=../../Cargo.toml");

    let crate_dir = Path::new(crate_dir);
    let readme = fs::read_to_string(crate_dir.join("README.md")).unwrap_or_default();
    let rendered = rewrite_readme_links(&readme, workspace_repository(crate_dir).as_deref());

    let out_dir = env::var("OUT_DIR").unwrap();
    fs::write(Path::new(&out_dir).join("README_GENERATED.md"), rendered).unwrap();
}

fn rewrite_readme_links(readme: &str, repository: Option<&str>) -> String {
    let rendered = readme.replace("](src/", "](").replace(".rs)", ")");
    match repository {
        Some(url) => rendered.replace("](../../README.md", &format!("]({url}")),
        None => rendered,
    }
}

/// `repository = "..."` from the workspace manifest two levels up.
fn workspace_repository(crate_dir: &Path) -> Option<String> {
    let manifest = fs::read_to_string(crate_dir.parent()?.parent()?.join("Cargo.toml")).ok()?;
    manifest.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        (key.trim() == "repository")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|url| !url.is_empty())
    })
}
