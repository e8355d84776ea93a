use std::path::Path;

/// Load `.apiscanignore` by walking up from the given directory.
/// Parses gitignore-style patterns (skip blank lines and # comments).
pub fn load_apiscanignore(start: &Path) -> Vec<String> {
    let mut dir = start.to_path_buf();
    loop {
        let ignore_path = dir.join(".apiscanignore");
        if ignore_path.is_file() {
            match std::fs::read_to_string(&ignore_path) {
                Ok(content) => return parse_ignore_patterns(&content),
                Err(e) => tracing::warn!("Could not read {}: {e}", ignore_path.display()),
            }
        }
        if !dir.pop() {
            break;
        }
    }
    Vec::new()
}

fn parse_ignore_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_patterns() {
        let content = "# generated clients\nclients/**\n\n*.spec.ts\nbuild/\n";
        assert_eq!(
            parse_ignore_patterns(content),
            vec!["clients/**", "*.spec.ts", "build/"]
        );
        assert!(parse_ignore_patterns("# only\n# comments").is_empty());
    }

    #[test]
    fn found_in_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".apiscanignore"), "legacy/**\n").unwrap();
        let nested = tmp.path().join("services").join("users");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(load_apiscanignore(&nested), vec!["legacy/**"]);
    }

    #[test]
    fn no_ignore_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_apiscanignore(tmp.path()).is_empty());
    }
}
