//! Engine root and user path helpers.

use directories::BaseDirs;
use once_cell::sync::Lazy;
use std::path::{Component, Path, PathBuf};

static ENGINE_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
});

/// Directory the engine is installed in.
///
/// This is the directory of the running executable, falling back to the
/// current working directory.
#[must_use]
pub fn engine_root() -> &'static Path {
    &ENGINE_ROOT
}

/// Expand a leading `~` component to the user's home directory.
///
/// Paths without a leading `~`, and all paths when no home directory can be
/// determined, are returned unchanged.
#[must_use]
pub fn expand_user(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}
