//! Integration tests for parsing the demo binding tables.

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    #[test]
    fn parse_all_demo_configs() {
        let demos_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent() // crates
            .and_then(|p| p.parent()) // workspace root
            .expect("workspace root")
            .join("demos");

        let mut found = 0usize;
        for entry in fs::read_dir(&demos_dir).expect("read demos dir") {
            let path = entry.unwrap().path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            found += 1;
            let parsed = config::load_from_path(&path);
            assert!(
                parsed.is_ok(),
                "failed to parse {}: {}",
                path.display(),
                parsed.err().map(|e| e.pretty()).unwrap_or_default()
            );
        }
        assert!(found > 0, "no .json files found in demos");
    }
}
