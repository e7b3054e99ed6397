use std::env;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "statusblocks";

/// Directories searched for system binaries in addition to `$PATH`.
const SBIN_DIRS: &[&str] = &[
    "/sbin",
    "/usr/sbin",
    "/usr/local/sbin",
    "/bin",
    "/usr/bin",
    "/usr/local/bin",
];

/// `~/.config/statusblocks/<file>`
pub fn config_path(file: &str) -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .map(|dir| dir.join(APP_DIR).join(file))
}

/// `~/.local/lib/statusblocks`
pub fn lib_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".local").join("lib").join(APP_DIR))
}

/// Locate an executable by name in `$PATH` and the usual sbin directories.
pub fn find_binary(name: &str) -> Option<PathBuf> {
    let from_env = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    from_env
        .into_iter()
        .chain(SBIN_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}
