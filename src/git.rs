use crate::errors::Result;
use git2::Repository;
use std::path::PathBuf;
use tempfile::TempDir;

const REMOTE_PREFIXES: [&str; 3] = ["http://", "https://", "git@"];

/// True when `source` names a remote repository rather than a local path.
pub fn is_remote(source: &str) -> bool {
    REMOTE_PREFIXES.iter().any(|p| source.starts_with(p))
}

/// A repository cloned into a temporary directory.
///
/// The checkout is removed when this value is dropped.
#[derive(Debug)]
pub struct Checkout {
    _dir: TempDir,
    pub root: PathBuf,
}

/// Clone `url` into a fresh temporary directory.
pub fn clone_repository(url: &str) -> Result<Checkout> {
    let dir = tempfile::Builder::new().prefix("apiscan-").tempdir()?;
    let root = dir.path().join("repo");
    tracing::debug!("Cloning {url} into {}", root.display());
    Repository::clone(url, &root)?;
    Ok(Checkout { _dir: dir, root })
}
