// Integration test harness for `nova-delegate`.
//
// Keep integration tests as submodules of this harness (under `tests/suite/`) rather than adding
// new top-level `tests/*.rs` files, which would compile as additional test binaries.
mod suite;

#[test]
fn suite_mod_is_in_sync_with_suite_directory() {
    use std::collections::BTreeSet;
    use std::path::Path;

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let suite_dir = manifest_dir.join("tests").join("suite");
    let suite_mod_source =
        std::fs::read_to_string(suite_dir.join("mod.rs")).expect("read tests/suite/mod.rs");

    let suite_files: BTreeSet<String> = std::fs::read_dir(&suite_dir)
        .expect("read tests/suite directory")
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("rs") {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                (stem != "mod").then_some(stem)
            } else {
                None
            }
        })
        .collect();

    let mod_decls: BTreeSet<String> = {
        let re = regex::Regex::new(r"(?m)^\s*(?:#\[[^\]]*\]\s*)*(?:pub\s+)?mod\s+([A-Za-z0-9_]+)\s*;")
            .expect("suite mod.rs module declaration regex");
        re.captures_iter(&suite_mod_source)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    };

    let missing: Vec<_> = suite_files.difference(&mod_decls).cloned().collect();
    let extra: Vec<_> = mod_decls.difference(&suite_files).cloned().collect();
    assert!(
        missing.is_empty() && extra.is_empty(),
        "tests/suite/mod.rs is out of sync with tests/suite/*.rs.\n\
Missing module declarations for: {missing:?}\n\
Extra module declarations for: {extra:?}"
    );
}
