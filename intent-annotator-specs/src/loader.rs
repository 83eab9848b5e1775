//! Finding and reading `.ann` files.
//!
//! Discovery and parsing are separate passes: the directory tree is walked
//! first, the paths are sorted, and only then is each file parsed. A fixture
//! set therefore replays in the same order on every platform.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{parse_fixture, AnnFixture, SpecError, SpecResult};

pub const FIXTURE_EXTENSION: &str = "ann";

/// A parsed fixture together with where it came from.
#[derive(Debug, Clone)]
pub struct FixtureFile {
    /// Path relative to the directory it was discovered in, `/`-separated.
    pub name: String,
    pub path: PathBuf,
    pub fixture: AnnFixture,
}

fn load_error(path: &Path, cause: impl Display) -> SpecError {
    SpecError::Load {
        path: path.display().to_string(),
        message: cause.to_string(),
    }
}

/// Read and parse one fixture file.
pub fn load_fixture(path: &Path) -> SpecResult<AnnFixture> {
    let content = fs::read_to_string(path).map_err(|e| load_error(path, e))?;
    parse_fixture(&content).map_err(|e| load_error(path, e))
}

/// Every `.ann` file under `root`, sorted.
///
/// `root` itself must be a readable directory; a missing fixture directory
/// is a configuration mistake rather than an empty suite.
pub fn discover_fixtures(root: &Path) -> SpecResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(load_error(root, "not a directory"));
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| load_error(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| load_error(&dir, e))?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == FIXTURE_EXTENSION) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Discover and parse every fixture under `root`, in path order.
pub fn load_all_fixtures(root: &Path) -> SpecResult<Vec<FixtureFile>> {
    let files = discover_fixtures(root)?
        .into_iter()
        .map(|path| {
            let fixture = load_fixture(&path)?;
            let name = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Ok(FixtureFile {
                name,
                path,
                fixture,
            })
        })
        .collect::<SpecResult<Vec<_>>>()?;

    debug!(root = %root.display(), count = files.len(), "loaded fixtures");
    Ok(files)
}
