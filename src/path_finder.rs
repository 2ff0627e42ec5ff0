//! Resolve a bare program name to an executable path by walking the search path.

use nix::unistd::{access, AccessFlags};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable holding the colon-separated list of directories to search.
pub const SEARCH_PATH_VAR: &str = "PATH";

/// Snapshot of a search path. Nothing is cached between lookups; every call to
/// `find_executable` checks the filesystem again.
#[derive(Clone, Debug)]
pub struct PathFinder {
    search_path: Option<OsString>,
}

impl PathFinder {
    /// `None` behaves like an unset `PATH`: only names containing a `/` resolve.
    pub fn new(search_path: Option<OsString>) -> PathFinder {
        PathFinder { search_path }
    }

    /// Uses the current process's `PATH`.
    pub fn from_env() -> PathFinder {
        PathFinder::new(env::var_os(SEARCH_PATH_VAR))
    }

    /// Returns the path to run for `name`, or `None` when nothing executable matches.
    ///
    /// A name with a `/` in it is checked as-is and never searched for. Otherwise each
    /// search-path directory is tried in order and the first executable `dir/name` wins.
    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }

        if name.contains('/') {
            let path = Path::new(name);
            return if is_executable(path) {
                Some(path.to_path_buf())
            } else {
                debug!("{:?} is not executable.", path);
                None
            };
        }

        let search_path = match &self.search_path {
            Some(search_path) => search_path,
            None => {
                warn!("{} environment variable not set.", SEARCH_PATH_VAR);
                return None;
            }
        };

        for dir in env::split_paths(search_path) {
            // Empty entries are skipped rather than meaning the current directory.
            if dir.as_os_str().is_empty() {
                continue;
            }

            let candidate = dir.join(name);
            if is_executable(&candidate) {
                debug!("Resolved {} to {:?}", name, candidate);
                return Some(candidate);
            }
        }

        debug!("{} not found in {}.", name, SEARCH_PATH_VAR);
        None
    }
}

/// Resolve `name` against the current process's `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    PathFinder::from_env().find_executable(name)
}

fn is_executable(path: &Path) -> bool {
    access(path, AccessFlags::X_OK).is_ok()
}
