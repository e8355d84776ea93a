use crate::config::provenance::{ProvenanceMap, Source};
use crate::config::schema::FileConfig;
use crate::config::{normalize_extensions, ResolvedConfig};
use crate::errors::{Result, ScanError};
use crate::filter::{split_list, AuthFilter};
use crate::output::OutputFormat;
use crate::walk::LanguageSelection;
use std::path::{Path, PathBuf};

/// CLI overrides extracted from command arguments.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub format: Option<OutputFormat>,
    pub lang: Option<LanguageSelection>,
    pub quiet: bool,
    pub ext: Vec<String>,
    pub exclude_ext: Vec<String>,
    pub ignore_paths: Vec<String>,
    pub include_verbs: Vec<String>,
    pub exclude_verbs: Vec<String>,
    pub auth: Option<AuthFilter>,
}

pub(crate) const KEYS: [&str; 9] = [
    "defaults.format",
    "defaults.lang",
    "defaults.quiet",
    "targeting.ext",
    "targeting.exclude_ext",
    "targeting.ignore_paths",
    "filters.include_verbs",
    "filters.exclude_verbs",
    "filters.auth",
];

/// Resolve configuration by applying layers bottom-up:
/// 1. Built-in defaults
/// 2. User config (~/.config/apiscan/config.toml)
/// 3. Project config (nearest .apiscan.toml walking up from working_dir)
/// 4. Environment variables
/// 5. CLI overrides
pub fn resolve_config(working_dir: &Path, cli: &CliOverrides) -> Result<ResolvedConfig> {
    resolve_with(
        working_dir,
        find_user_config().as_deref(),
        |key| std::env::var(key).ok(),
        cli,
    )
}

/// [`resolve_config`] with the user config path and environment injected.
pub fn resolve_with(
    working_dir: &Path,
    user_config: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    cli: &CliOverrides,
) -> Result<ResolvedConfig> {
    let mut config = ResolvedConfig::default();
    let mut prov = ProvenanceMap::with_defaults(&KEYS);

    if let Some(path) = user_config.filter(|p| p.is_file()) {
        let file = load_file(path, "user")?;
        apply_file_config(&mut config, &file, Source::UserConfig(path.to_path_buf()), &mut prov)?;
        config.loaded_files.push(path.to_path_buf());
    }

    if let Some(path) = find_project_config(working_dir) {
        let file = load_file(&path, "project")?;
        apply_file_config(&mut config, &file, Source::ProjectConfig(path.clone()), &mut prov)?;
        config.loaded_files.push(path);
    }

    apply_env_vars(&mut config, &env, &mut prov)?;
    apply_cli_overrides(&mut config, cli, &mut prov);

    config.ignore_patterns = crate::config::ignore::load_apiscanignore(working_dir);
    config.provenance = prov;
    Ok(config)
}

fn find_user_config() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("apiscan").join("config.toml"))
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let config_path = dir.join(".apiscan.toml");
        if config_path.is_file() {
            return Some(config_path);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

fn load_file(path: &Path, kind: &str) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path).map_err(|_| {
        ScanError::Config(format!("Could not read {kind} config: {}", path.display()))
    })?;
    FileConfig::from_toml(&content)
        .map_err(|e| ScanError::Config(format!("Invalid {kind} config {}: {e}", path.display())))
}

fn parse_value<T: std::str::FromStr<Err = String>>(value: &str, origin: &Source) -> Result<T> {
    value
        .parse()
        .map_err(|e: String| ScanError::Config(format!("{e} (from {origin})")))
}

fn apply_file_config(
    config: &mut ResolvedConfig,
    file: &FileConfig,
    source: Source,
    prov: &mut ProvenanceMap,
) -> Result<()> {
    // Defaults
    if let Some(ref format) = file.defaults.format {
        config.format = parse_value(format, &source)?;
        prov.set("defaults.format", source.clone());
    }
    if let Some(ref lang) = file.defaults.lang {
        config.lang = parse_value(lang, &source)?;
        prov.set("defaults.lang", source.clone());
    }
    if let Some(quiet) = file.defaults.quiet {
        config.quiet = quiet;
        prov.set("defaults.quiet", source.clone());
    }

    // Targeting
    if let Some(ref ext) = file.targeting.ext {
        config.ext = normalize_extensions(ext);
        prov.set("targeting.ext", source.clone());
    }
    if let Some(ref exclude_ext) = file.targeting.exclude_ext {
        config.exclude_ext = normalize_extensions(exclude_ext);
        prov.set("targeting.exclude_ext", source.clone());
    }
    if let Some(ref ignore_paths) = file.targeting.ignore_paths {
        config.ignore_paths = ignore_paths.clone();
        prov.set("targeting.ignore_paths", source.clone());
    }

    // Filters
    if let Some(ref verbs) = file.filters.include_verbs {
        config.include_verbs = verbs.clone();
        prov.set("filters.include_verbs", source.clone());
    }
    if let Some(ref verbs) = file.filters.exclude_verbs {
        config.exclude_verbs = verbs.clone();
        prov.set("filters.exclude_verbs", source.clone());
    }
    if let Some(ref auth) = file.filters.auth {
        config.auth = parse_value(auth, &source)?;
        prov.set("filters.auth", source);
    }
    Ok(())
}

fn apply_env_vars(
    config: &mut ResolvedConfig,
    env: &impl Fn(&str) -> Option<String>,
    prov: &mut ProvenanceMap,
) -> Result<()> {
    let source = |name: &str| Source::EnvVar(name.to_string());

    if let Some(val) = env("APISCAN_FORMAT") {
        config.format = parse_value(&val, &source("APISCAN_FORMAT"))?;
        prov.set("defaults.format", source("APISCAN_FORMAT"));
    }
    if let Some(val) = env("APISCAN_LANG") {
        config.lang = parse_value(&val, &source("APISCAN_LANG"))?;
        prov.set("defaults.lang", source("APISCAN_LANG"));
    }
    if let Some(val) = env("APISCAN_QUIET") {
        config.quiet = val == "1" || val.eq_ignore_ascii_case("true");
        prov.set("defaults.quiet", source("APISCAN_QUIET"));
    }
    if let Some(val) = env("APISCAN_IGNORE_PATHS") {
        config.ignore_paths = split_list(&val, ';');
        prov.set("targeting.ignore_paths", source("APISCAN_IGNORE_PATHS"));
    }
    if let Some(val) = env("APISCAN_EXT") {
        config.ext = normalize_extensions(split_list(&val, ','));
        prov.set("targeting.ext", source("APISCAN_EXT"));
    }
    if let Some(val) = env("APISCAN_EXCLUDE_EXT") {
        config.exclude_ext = normalize_extensions(split_list(&val, ','));
        prov.set("targeting.exclude_ext", source("APISCAN_EXCLUDE_EXT"));
    }
    Ok(())
}

fn apply_cli_overrides(config: &mut ResolvedConfig, cli: &CliOverrides, prov: &mut ProvenanceMap) {
    if let Some(format) = cli.format {
        config.format = format;
        prov.set("defaults.format", Source::CliFlag("--format".into()));
    }
    if let Some(lang) = cli.lang {
        config.lang = lang;
        prov.set("defaults.lang", Source::CliFlag("--lang".into()));
    }
    if cli.quiet {
        config.quiet = true;
        prov.set("defaults.quiet", Source::CliFlag("--quiet".into()));
    }
    if !cli.ext.is_empty() {
        config.ext = normalize_extensions(&cli.ext);
        prov.set("targeting.ext", Source::CliFlag("--ext".into()));
    }
    if !cli.exclude_ext.is_empty() {
        config.exclude_ext = normalize_extensions(&cli.exclude_ext);
        prov.set("targeting.exclude_ext", Source::CliFlag("--exclude-ext".into()));
    }
    if !cli.ignore_paths.is_empty() {
        config.ignore_paths = cli.ignore_paths.clone();
        prov.set("targeting.ignore_paths", Source::CliFlag("--ignore-paths".into()));
    }
    if !cli.include_verbs.is_empty() {
        config.include_verbs = cli.include_verbs.clone();
        prov.set("filters.include_verbs", Source::CliFlag("--include-verbs".into()));
    }
    if !cli.exclude_verbs.is_empty() {
        config.exclude_verbs = cli.exclude_verbs.clone();
        prov.set("filters.exclude_verbs", Source::CliFlag("--exclude-verbs".into()));
    }
    if let Some(auth) = cli.auth {
        let flag = match auth {
            AuthFilter::Unauthenticated => "--no-auth",
            _ => "--auth",
        };
        config.auth = auth;
        prov.set("filters.auth", Source::CliFlag(flag.into()));
    }
}
