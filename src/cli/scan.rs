use crate::config::resolve::{resolve_config, CliOverrides};
use crate::errors::{Result, ScanError};
use crate::filter::AuthFilter;
use crate::git::{self, Checkout};
use crate::output::{write_endpoints, OutputFormat};
use crate::parse::{analyze_language, Endpoint, GrammarRegistry};
use crate::walk::{self, LanguageSelection, SourceFile};
use clap::Args;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Local directory or Git repository URL to scan
    pub source: String,

    /// Output format
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only analyze files within this sub-path of the source
    #[arg(short, long)]
    pub path_filter: Option<PathBuf>,

    /// Force a language instead of detecting it from file extensions
    #[arg(short, long)]
    pub lang: Option<LanguageSelection>,

    /// File extensions to include (comma-separated, e.g. 'py,java,js')
    #[arg(short, long, value_delimiter = ',')]
    pub ext: Vec<String>,

    /// File extensions to skip (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_ext: Vec<String>,

    /// Only keep endpoints with these HTTP verbs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub include_verbs: Vec<String>,

    /// Drop endpoints with these HTTP verbs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_verbs: Vec<String>,

    /// Only keep endpoints with detected authentication
    #[arg(long, conflicts_with = "no_auth")]
    pub auth: bool,

    /// Only keep endpoints without detected authentication
    #[arg(long)]
    pub no_auth: bool,

    /// Path prefixes to ignore, relative to the source (semicolon-separated)
    #[arg(long, value_delimiter = ';')]
    pub ignore_paths: Vec<String>,

    /// Print each file as it is analyzed and enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress status output
    #[arg(short, long)]
    pub quiet: bool,
}

impl ScanArgs {
    fn overrides(&self) -> CliOverrides {
        let auth = if self.auth {
            Some(AuthFilter::Authenticated)
        } else if self.no_auth {
            Some(AuthFilter::Unauthenticated)
        } else {
            None
        };
        CliOverrides {
            format: self.format,
            lang: self.lang,
            quiet: self.quiet,
            ext: self.ext.clone(),
            exclude_ext: self.exclude_ext.clone(),
            ignore_paths: self
                .ignore_paths
                .iter()
                .map(|p| p.trim().replace('\\', "/"))
                .filter(|p| !p.is_empty())
                .collect(),
            include_verbs: self.include_verbs.clone(),
            exclude_verbs: self.exclude_verbs.clone(),
            auth,
        }
    }
}

pub fn run(args: &ScanArgs) -> Result<()> {
    let start = Instant::now();

    // Keeps a cloned checkout alive until the scan is over.
    let (root, _checkout) = acquire_source(&args.source, args.quiet)?;

    let analysis_dir = match &args.path_filter {
        Some(filter) => {
            let dir = root.join(filter);
            if !dir.exists() {
                return Err(ScanError::Config(format!(
                    "Path filter '{}' does not exist in the repository",
                    filter.display()
                )));
            }
            dir
        }
        None => root.clone(),
    };

    let config = resolve_config(&root, &args.overrides())?;
    let quiet = config.quiet;

    let files = walk::discover_files(&root, &analysis_dir, &config.discovery_options())?;

    if !quiet && !args.verbose {
        let languages: BTreeSet<_> = files.iter().map(|f| f.language).collect();
        eprintln!(
            "Found {} files to analyze across {} language(s).",
            files.len(),
            languages.len()
        );
    }

    let progress = if !quiet && !args.verbose {
        let pb = indicatif::ProgressBar::new(files.len() as u64);
        let style = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    // One registry for every worker; grammars and compiled queries are shared.
    let registry = GrammarRegistry::new();
    let files_skipped = AtomicUsize::new(0);

    let outcomes: Result<Vec<FileOutcome>> = files
        .par_iter()
        .map(|file| {
            if args.verbose && !quiet {
                eprintln!(" -> Analyzing {} as {}", file.relative, file.language);
            }
            let outcome = analyze_file(&registry, file);
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            if let Ok(FileOutcome::Skipped(reason)) = &outcome {
                tracing::warn!("Skipping {}: {}", file.relative, reason);
                files_skipped.fetch_add(1, Ordering::Relaxed);
            }
            outcome
        })
        .collect();

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let per_file: Vec<Vec<Endpoint>> = outcomes?
        .into_iter()
        .filter_map(|outcome| match outcome {
            FileOutcome::Analyzed(endpoints) => Some(endpoints),
            FileOutcome::Skipped(_) => None,
        })
        .collect();

    let files_analyzed = per_file.len();
    let files_skipped = files_skipped.load(Ordering::Relaxed);
    let mut endpoints: Vec<Endpoint> = per_file.into_iter().flatten().collect();

    tracing::debug!(
        files_analyzed,
        files_skipped,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "analysis finished"
    );
    if !quiet {
        eprintln!(
            "\nAnalysis complete. Analyzed {} files and found {} potential endpoints.",
            files_analyzed,
            endpoints.len()
        );
    }

    let filter = config.endpoint_filter();
    if !filter.is_noop() {
        let before = endpoints.len();
        endpoints = filter.apply(endpoints);
        if !quiet {
            eprintln!("Applying filters...");
            eprintln!(
                " -> {} endpoints filtered out. {} remaining.",
                before - endpoints.len(),
                endpoints.len()
            );
        }
    }

    match &args.output {
        Some(path) => {
            let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
            write_endpoints(&mut writer, config.format, &endpoints)?;
            writer.flush()?;
            if !quiet {
                eprintln!("\nResults saved to {}", path.display());
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_endpoints(&mut lock, config.format, &endpoints)?;
            lock.flush()?;
        }
    }

    Ok(())
}

/// Resolve the scan root, cloning remote sources into a temporary checkout.
fn acquire_source(source: &str, quiet: bool) -> Result<(PathBuf, Option<Checkout>)> {
    if git::is_remote(source) {
        if !quiet {
            eprintln!("Cloning repository from {source} into temporary directory...");
        }
        let checkout = git::clone_repository(source)?;
        return Ok((checkout.root.clone(), Some(checkout)));
    }

    let path = Path::new(source);
    if !path.is_dir() {
        return Err(ScanError::InvalidSource {
            path: path.to_path_buf(),
        });
    }
    Ok((path.canonicalize()?, None))
}

/// Result of analyzing one file.
#[derive(Debug)]
enum FileOutcome {
    Analyzed(Vec<Endpoint>),
    Skipped(String),
}

/// Analyze one file, stamping its root-relative path on every endpoint.
///
/// Read failures, source-level analyzer errors and analyzer panics skip the
/// file. A broken built-in query or grammar fails the whole scan.
fn analyze_file(registry: &GrammarRegistry, file: &SourceFile) -> Result<FileOutcome> {
    let source = match std::fs::read(&file.path) {
        Ok(source) => source,
        Err(e) => return Ok(FileOutcome::Skipped(e.to_string())),
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        analyze_language(registry, file.language, &source)
    }));
    let mut endpoints = match outcome {
        Ok(Ok(endpoints)) => endpoints,
        Ok(Err(e)) => return triage_failure(e),
        Err(_) => return Ok(FileOutcome::Skipped("analyzer panicked".to_string())),
    };
    for endpoint in &mut endpoints {
        endpoint.file_path = file.relative.clone();
    }
    Ok(FileOutcome::Analyzed(endpoints))
}

/// Defects in the built-in queries or grammars abort; anything else skips the file.
fn triage_failure(err: ScanError) -> Result<FileOutcome> {
    match err {
        ScanError::QueryCompile { .. } | ScanError::Grammar { .. } => Err(err),
        other => Ok(FileOutcome::Skipped(other.to_string())),
    }
}
