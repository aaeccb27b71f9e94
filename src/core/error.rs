//! Purpose: Single error type shared by the library and the `ecctool` binary.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Invariants: Every fatal CLI outcome maps to exactly one `ErrorKind`.
//! Invariants: `RemoteFailure` is reported, never turned into a fatal exit by query commands.
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    InvalidArgument,
    ServiceUnreachable,
    RemoteFailure,
    NotRunning,
    LaunchFailure,
    Permission,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    path: Option<PathBuf>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            path: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{message}")?,
            None => write!(f, "{}", default_message(self.kind))?,
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

fn default_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::InvalidArgument => "invalid argument",
        ErrorKind::ServiceUnreachable => "ecChronos is not running",
        ErrorKind::RemoteFailure => "remote request failed",
        ErrorKind::NotRunning => "no running instance recorded",
        ErrorKind::LaunchFailure => "failed to launch service",
        ErrorKind::Permission => "permission denied",
        ErrorKind::Io => "i/o error",
    }
}

/// Fatal kinds exit 1; clap usage errors exit 2.
pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Usage => 2,
        ErrorKind::Internal
        | ErrorKind::InvalidArgument
        | ErrorKind::ServiceUnreachable
        | ErrorKind::RemoteFailure
        | ErrorKind::NotRunning
        | ErrorKind::LaunchFailure
        | ErrorKind::Permission
        | ErrorKind::Io => 1,
    }
}
