use crate::config::ResolvedConfig;
use std::io::Write;

/// Render `config show` output.
pub fn render_show<W: Write>(w: &mut W, config: &ResolvedConfig) -> std::io::Result<()> {
    // Loaded files
    if config.loaded_files.is_empty() {
        writeln!(w, "Loaded config files: (none)")?;
    } else {
        writeln!(w, "Loaded config files:")?;
        for (i, path) in config.loaded_files.iter().enumerate() {
            writeln!(w, "  {}. {}", i + 1, path.display())?;
        }
    }
    if !config.ignore_patterns.is_empty() {
        writeln!(w, "Ignore patterns: {}", config.ignore_patterns.join(", "))?;
    }
    writeln!(w)?;

    writeln!(
        w,
        "Resolved settings ({} set explicitly):",
        config.provenance.explicit_count()
    )?;
    for (key, source) in config.provenance.sorted_entries() {
        writeln!(w, "  {}: {} <- {}", key, value_for_key(config, key), source)?;
    }

    Ok(())
}

fn value_for_key(config: &ResolvedConfig, key: &str) -> String {
    match key {
        "defaults.format" => config.format.to_string(),
        "defaults.lang" => config.lang.to_string(),
        "defaults.quiet" => config.quiet.to_string(),
        "targeting.ext" => list_or(config.ext.iter(), "(all)"),
        "targeting.exclude_ext" => list_or(config.exclude_ext.iter(), "(none)"),
        "targeting.ignore_paths" => list_or(config.ignore_paths.iter(), "(none)"),
        "filters.include_verbs" => list_or(config.include_verbs.iter(), "(all)"),
        "filters.exclude_verbs" => list_or(config.exclude_verbs.iter(), "(none)"),
        "filters.auth" => config.auth.to_string(),
        _ => "(unknown)".to_string(),
    }
}

fn list_or<'a>(items: impl Iterator<Item = &'a String>, empty: &str) -> String {
    let items: Vec<&str> = items.map(String::as_str).collect();
    if items.is_empty() {
        empty.to_string()
    } else {
        format!("[{}]", items.join(", "))
    }
}
