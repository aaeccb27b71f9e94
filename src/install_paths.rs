//! Purpose: Resolve the service installation root and default PID file.
//! Exports: `install_root`, `default_pidfile`.
//! Invariants: `ECCHRONOS_HOME` wins when set and non-empty.
//! Invariants: Otherwise the root is the parent of the directory holding the executable.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ecctool::core::error::{Error, ErrorKind};

pub(crate) const HOME_ENV: &str = "ECCHRONOS_HOME";
pub(crate) const DEFAULT_PID_FILE: &str = "ecc.pid";

pub(crate) fn install_root() -> Result<PathBuf, Error> {
    root_from(std::env::var_os(HOME_ENV), std::env::current_exe())
}

pub(crate) fn default_pidfile(home: &Path) -> PathBuf {
    home.join(DEFAULT_PID_FILE)
}

fn root_from(env_home: Option<OsString>, exe: std::io::Result<PathBuf>) -> Result<PathBuf, Error> {
    if let Some(home) = env_home.filter(|home| !home.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let exe = exe.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("cannot locate the running executable")
            .with_hint(format!("Set {HOME_ENV} to the installation directory."))
            .with_source(err)
    })?;
    let exe = std::fs::canonicalize(&exe).unwrap_or(exe);
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message("cannot derive installation directory from executable path")
                .with_path(&exe)
                .with_hint(format!("Set {HOME_ENV} to the installation directory."))
        })
}

#[cfg(test)]
mod tests {
    use super::{default_pidfile, root_from};
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    #[test]
    fn env_home_takes_precedence() {
        let root = root_from(
            Some(OsString::from("/opt/ecchronos")),
            Ok(PathBuf::from("/usr/bin/ecctool")),
        )
        .expect("root");
        assert_eq!(root, PathBuf::from("/opt/ecchronos"));
    }

    #[test]
    fn empty_env_falls_back_to_executable() {
        let root = root_from(
            Some(OsString::new()),
            Ok(PathBuf::from("/nonexistent/install/bin/ecctool")),
        )
        .expect("root");
        assert_eq!(root, PathBuf::from("/nonexistent/install"));
    }

    #[test]
    fn missing_executable_is_an_error() {
        let err = root_from(None, Err(std::io::Error::other("gone"))).expect_err("err");
        assert!(err.hint().is_some_and(|hint| hint.contains("ECCHRONOS_HOME")));
    }

    #[test]
    fn default_pidfile_lives_under_root() {
        assert_eq!(
            default_pidfile(Path::new("/opt/ecc")),
            PathBuf::from("/opt/ecc/ecc.pid")
        );
    }
}
