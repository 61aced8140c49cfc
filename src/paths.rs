//! Start-up path helpers.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Directory holding the running executable, symlinks resolved.
///
/// Binaries launched from the system temp dir (throwaway builds) get the
/// crate's manifest directory instead, so config and logs land next to the
/// sources rather than in a directory that disappears.
pub fn install_dir() -> Result<PathBuf, Error> {
    let exe = env::current_exe()?.canonicalize()?;
    let dir = exe.parent().map_or_else(|| exe.clone(), Path::to_path_buf);

    let tmp = env::temp_dir();
    let tmp = tmp.canonicalize().unwrap_or(tmp);
    if dir.starts_with(&tmp) {
        return Ok(PathBuf::from(env!("CARGO_MANIFEST_DIR")));
    }
    Ok(dir)
}

/// Default log directory: `<install_dir>/logs`.
pub fn log_dir() -> Result<PathBuf, Error> {
    Ok(install_dir()?.join("logs"))
}
