//! Purpose: Start and stop the managed service, tracking it through a PID file.
//! Exports: `Supervisor`, `SupervisedProcess`, `CancelToken`.
//! Role: Lifecycle half of the CLI; never talks to the remote API.
//! Invariants: The PID file is written before any blocking wait on the child.
//! Invariants: A failed spawn leaves no PID file behind.
//! Invariants: Stop is fire-and-forget: signal, remove the file, never wait for exit.
//! Invariants: No locking beyond file existence; concurrent starts on one path race.
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::error::{Error, ErrorKind};
use super::launch::LaunchSpec;

const RELAY_TICK: Duration = Duration::from_millis(100);

/// Shared flag the foreground relay polls every `RELAY_TICK`.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raw flag, for wiring into signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SupervisedProcess {
    pub pid: u32,
    pub pidfile: PathBuf,
    pub working_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct Supervisor {
    pidfile: PathBuf,
}

impl Supervisor {
    pub fn new(pidfile: impl Into<PathBuf>) -> Self {
        Self {
            pidfile: pidfile.into(),
        }
    }

    /// Spawns the service and records its pid.
    ///
    /// Detached starts return right after the PID file is written. Foreground
    /// starts relay the child's combined stdout/stderr into `out` until the
    /// stream closes (then wait for exit) or `cancel` fires (then return and
    /// leave the child running).
    pub fn start(
        &self,
        spec: &LaunchSpec,
        foreground: bool,
        out: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<SupervisedProcess, Error> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null());

        let relay = if foreground {
            let (reader, writer) = io::pipe().map_err(|err| {
                Error::new(ErrorKind::LaunchFailure)
                    .with_message("failed to create output pipe")
                    .with_source(err)
            })?;
            let err_writer = writer.try_clone().map_err(|err| {
                Error::new(ErrorKind::LaunchFailure)
                    .with_message("failed to create output pipe")
                    .with_source(err)
            })?;
            command.stdout(writer).stderr(err_writer);
            Some(reader)
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
            None
        };

        debug!(program = %spec.program.display(), args = ?spec.args, "spawning service");
        let mut child = command.spawn().map_err(|err| {
            Error::new(ErrorKind::LaunchFailure)
                .with_message(format!("failed to launch {}", spec.program.display()))
                .with_source(err)
        })?;
        // The command still owns the parent's copies of the pipe writers.
        drop(command);

        let pid = child.id();
        if let Err(err) = write_pid(&self.pidfile, pid) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }
        info!(pid, pidfile = %self.pidfile.display(), "service started");
        write_line(out, &format!("ecc started with pid {pid}"))?;

        let process = SupervisedProcess {
            pid,
            pidfile: self.pidfile.clone(),
            working_dir: spec.working_dir.clone(),
        };

        let Some(reader) = relay else {
            return Ok(process);
        };
        if relay_output(reader, out, cancel)? {
            let status = child.wait().map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to wait for service")
                    .with_source(err)
            })?;
            info!(pid, %status, "service exited");
        } else {
            warn!(pid, "foreground relay cancelled; service left running");
        }
        Ok(process)
    }

    /// Signals the recorded process and removes the PID file. Returns the pid.
    pub fn stop(&self, out: &mut dyn Write) -> Result<u32, Error> {
        let pid = self.read_pid()?;
        write_line(out, &format!("Killing ecc with pid {pid}"))?;

        match terminate_process(pid) {
            Ok(()) => info!(pid, "sent SIGTERM"),
            Err(err) if err.raw_os_error() == Some(libc::ESRCH) => {
                warn!(pid, "no such process; removing stale pid file");
            }
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                return Err(Error::new(ErrorKind::Permission)
                    .with_message(format!("not permitted to signal pid {pid}"))
                    .with_path(&self.pidfile)
                    .with_source(err));
            }
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message(format!("failed to signal pid {pid}"))
                    .with_source(err));
            }
        }

        match fs::remove_file(&self.pidfile) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(pidfile = %self.pidfile.display(), "pid file already removed");
            }
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("failed to remove pid file")
                    .with_path(&self.pidfile)
                    .with_source(err));
            }
        }
        Ok(pid)
    }

    pub fn read_pid(&self) -> Result<u32, Error> {
        let contents = fs::read_to_string(&self.pidfile).map_err(|err| {
            Error::new(ErrorKind::NotRunning)
                .with_message("no pid file found, is ecChronos running?")
                .with_path(&self.pidfile)
                .with_source(err)
        })?;
        let first_line = contents.lines().next().unwrap_or("").trim();
        first_line
            .parse::<u32>()
            .ok()
            .filter(|pid| *pid > 0 && *pid <= i32::MAX as u32)
            .ok_or_else(|| {
                Error::new(ErrorKind::NotRunning)
                    .with_message("pid file does not contain a process id")
                    .with_path(&self.pidfile)
            })
    }
}

fn write_pid(path: &Path, pid: u32) -> Result<(), Error> {
    fs::write(path, pid.to_string()).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write pid file")
            .with_path(path)
            .with_source(err)
    })
}

fn write_line(out: &mut dyn Write, line: &str) -> Result<(), Error> {
    writeln!(out, "{line}")
        .and_then(|()| out.flush())
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write output")
                .with_source(err)
        })
}

/// Returns `true` at end of stream, `false` when cancelled first.
///
/// Reads happen on a helper thread so a silent child cannot hold off
/// cancellation; the token is checked at least once per `RELAY_TICK`.
fn relay_output(
    reader: impl Read + Send + 'static,
    out: &mut dyn Write,
    cancel: &CancelToken,
) -> Result<bool, Error> {
    let (lines_tx, lines_rx) = mpsc::channel::<io::Result<Vec<u8>>>();
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        loop {
            let mut line = Vec::new();
            let sent = match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => lines_tx.send(Ok(line)),
                Err(err) => {
                    let _ = lines_tx.send(Err(err));
                    break;
                }
            };
            if sent.is_err() {
                break;
            }
        }
    });

    loop {
        if cancel.is_cancelled() {
            return Ok(false);
        }
        let line = match lines_rx.recv_timeout(RELAY_TICK) {
            Ok(line) => line.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read service output")
                    .with_source(err)
            })?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(true),
        };
        out.write_all(&line)
            .and_then(|()| out.flush())
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to relay service output")
                    .with_source(err)
            })?;
    }
}

#[cfg(unix)]
fn terminate_process(pid: u32) -> io::Result<()> {
    let result = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn terminate_process(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "terminate not supported on this platform",
    ))
}
