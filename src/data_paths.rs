//! Purpose: Data-directory and collection-file path resolution.
//! Exports: `default_data_dir`, `accounts_path`, `posts_path`.
//! Invariants: Default data directory remains `~/.chirp/data`.
//! Invariants: Collection file names match the historical `users.json` / `tweets.json`.

use std::path::{Path, PathBuf};

pub(crate) const ACCOUNTS_FILE: &str = "users.json";
pub(crate) const POSTS_FILE: &str = "tweets.json";

pub(crate) fn default_data_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".chirp").join("data")
}

pub(crate) fn accounts_path(data_dir: &Path) -> PathBuf {
    data_dir.join(ACCOUNTS_FILE)
}

pub(crate) fn posts_path(data_dir: &Path) -> PathBuf {
    data_dir.join(POSTS_FILE)
}
