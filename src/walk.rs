use crate::errors::Result;
use clap::ValueEnum;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A language the endpoint analyzers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::Java,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
    ];

    /// File extensions for this language.
    pub fn extensions(&self) -> &[&str] {
        match self {
            Language::Python => &["py"],
            Language::Java => &["java"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::Tsx => &["tsx"],
        }
    }

    /// Detect the language from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    /// True for the languages handled by the Express-style analyzer.
    pub fn is_node(&self) -> bool {
        matches!(
            self,
            Language::JavaScript | Language::TypeScript | Language::Tsx
        )
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "javascript" | "js" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "tsx" => Ok(Language::Tsx),
            _ => Err(format!("unsupported language: {s}")),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Java => write!(f, "java"),
            Language::JavaScript => write!(f, "javascript"),
            Language::TypeScript => write!(f, "typescript"),
            Language::Tsx => write!(f, "tsx"),
        }
    }
}

/// Language selection from `--lang` or the `defaults.lang` config key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LanguageSelection {
    #[default]
    Auto,
    Java,
    Python,
    Nodejs,
}

impl LanguageSelection {
    /// Pick the analyzer language for one file.
    ///
    /// Forcing `java` or `python` applies to every file regardless of its
    /// extension; forcing `nodejs` still needs a JS/TS extension to choose
    /// between the grammars.
    pub fn language_for(&self, path: &Path) -> Option<Language> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match self {
            LanguageSelection::Auto => Language::from_extension(ext),
            LanguageSelection::Java => Some(Language::Java),
            LanguageSelection::Python => Some(Language::Python),
            LanguageSelection::Nodejs => Language::from_extension(ext).filter(Language::is_node),
        }
    }
}

impl std::str::FromStr for LanguageSelection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| format!("unknown language option: {s}"))
    }
}

impl std::fmt::Display for LanguageSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageSelection::Auto => write!(f, "auto"),
            LanguageSelection::Java => write!(f, "java"),
            LanguageSelection::Python => write!(f, "python"),
            LanguageSelection::Nodejs => write!(f, "nodejs"),
        }
    }
}

/// Everything that decides whether a file takes part in a scan.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    pub selection: LanguageSelection,
    /// Lowercase extensions without the dot; empty means "all".
    pub include_ext: BTreeSet<String>,
    pub exclude_ext: BTreeSet<String>,
    /// Prefixes of root-relative paths (with `/` separators) to skip.
    pub ignore_paths: Vec<String>,
    /// Glob patterns from `.apiscanignore`.
    pub ignore_globs: Vec<String>,
}

/// A file selected for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub relative: String,
    pub language: Language,
}

/// Discover analyzable files under `scan_dir`, reporting paths relative to `root`.
///
/// - Respects `.gitignore`
/// - Applies extension, ignored-prefix and `.apiscanignore` filters
/// - Returns files sorted by path for deterministic output
pub fn discover_files(
    root: &Path,
    scan_dir: &Path,
    opts: &DiscoveryOptions,
) -> Result<Vec<SourceFile>> {
    let ignore_set = build_globset(&opts.ignore_globs)?;

    let walker = WalkBuilder::new(scan_dir)
        .hidden(false)
        .git_ignore(true)
        .build();

    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = relative_path(root, path);
        if opts
            .ignore_paths
            .iter()
            .any(|prefix| relative.starts_with(prefix.as_str()))
        {
            continue;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !opts.include_ext.is_empty() && !opts.include_ext.contains(&ext) {
            continue;
        }
        if opts.exclude_ext.contains(&ext) {
            continue;
        }

        if ignore_set.is_match(&relative) {
            continue;
        }

        if let Some(language) = opts.selection.language_for(path) {
            files.push(SourceFile {
                path: path.to_path_buf(),
                relative,
                language,
            });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

/// Render `path` relative to `root` with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim_end_matches('/');
        builder.add(Glob::new(pattern)?);
        // `build/` in an ignore file means everything below it as well
        builder.add(Glob::new(&format!("{pattern}/**"))?);
    }
    Ok(builder.build()?)
}
