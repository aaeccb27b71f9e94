//! Purpose: Assemble the command line that launches the ecChronos service.
//! Exports: `LaunchSpec`, `MAIN_CLASS`.
//! Role: Pure input to the supervisor; spawning happens elsewhere.
//! Invariants: Classpath starts with the config directory, then `lib/*.jar` in name order.
//! Invariants: Only `jvm.options` lines starting with `-` become JVM options.
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{Error, ErrorKind};

pub const MAIN_CLASS: &str = "com.ericsson.bss.cassandra.ecchronos.application.spring.SpringBooter";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `java <jvm opts> -Decchronos.config=<conf> -cp <classpath> <main> [-f]`,
    /// run from the installation root.
    pub fn for_install(home: &Path, foreground: bool) -> Result<Self, Error> {
        let conf_dir = home.join("conf");
        let mut spec = Self::new("java", home);
        for option in read_jvm_options(&conf_dir)? {
            spec = spec.arg(option);
        }
        let mut config_flag = OsString::from("-Decchronos.config=");
        config_flag.push(conf_dir.as_os_str());
        spec = spec
            .arg(config_flag)
            .arg("-cp")
            .arg(class_path(&conf_dir, home)?)
            .arg(MAIN_CLASS);
        if foreground {
            spec = spec.arg("-f");
        }
        Ok(spec)
    }
}

fn read_jvm_options(conf_dir: &Path) -> Result<Vec<String>, Error> {
    let path = conf_dir.join("jvm.options");
    let contents = fs::read_to_string(&path).map_err(|err| {
        Error::new(ErrorKind::LaunchFailure)
            .with_message("failed to read jvm.options")
            .with_path(&path)
            .with_source(err)
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-'))
        .map(str::to_string)
        .collect())
}

fn class_path(conf_dir: &Path, home: &Path) -> Result<OsString, Error> {
    let lib_dir = home.join("lib");
    let mut jars = match fs::read_dir(&lib_dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "jar"))
            .collect::<Vec<_>>(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            return Err(Error::new(ErrorKind::LaunchFailure)
                .with_message("failed to list service libraries")
                .with_path(&lib_dir)
                .with_source(err));
        }
    };
    jars.sort();

    let mut class_path = OsString::from(conf_dir.as_os_str());
    for jar in jars {
        class_path.push(":");
        class_path.push(jar.as_os_str());
    }
    Ok(class_path)
}

#[cfg(test)]
mod tests {
    use super::{LaunchSpec, MAIN_CLASS};
    use crate::core::error::ErrorKind;
    use std::ffi::OsString;
    use std::fs;

    fn install_root() -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("conf")).expect("conf");
        fs::create_dir_all(temp.path().join("lib")).expect("lib");
        fs::write(
            temp.path().join("conf").join("jvm.options"),
            "# heap\n-Xmx1g\n\n  -XX:+UseG1GC  \nnot-an-option\n",
        )
        .expect("jvm.options");
        fs::write(temp.path().join("lib").join("b.jar"), b"").expect("jar");
        fs::write(temp.path().join("lib").join("a.jar"), b"").expect("jar");
        fs::write(temp.path().join("lib").join("README"), b"").expect("readme");
        temp
    }

    #[test]
    fn for_install_builds_java_command() {
        let home = install_root();
        let spec = LaunchSpec::for_install(home.path(), false).expect("spec");
        let conf = home.path().join("conf");
        let lib = home.path().join("lib");

        assert_eq!(spec.program, std::path::PathBuf::from("java"));
        assert_eq!(spec.working_dir, home.path());
        let expected_cp = format!(
            "{}:{}:{}",
            conf.display(),
            lib.join("a.jar").display(),
            lib.join("b.jar").display()
        );
        let expected: Vec<OsString> = vec![
            "-Xmx1g".into(),
            "-XX:+UseG1GC".into(),
            format!("-Decchronos.config={}", conf.display()).into(),
            "-cp".into(),
            expected_cp.into(),
            MAIN_CLASS.into(),
        ];
        assert_eq!(spec.args, expected);
    }

    #[test]
    fn foreground_appends_flag() {
        let home = install_root();
        let spec = LaunchSpec::for_install(home.path(), true).expect("spec");
        assert_eq!(spec.args.last(), Some(&OsString::from("-f")));
    }

    #[test]
    fn missing_jvm_options_is_launch_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = LaunchSpec::for_install(temp.path(), false).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::LaunchFailure);
    }
}
