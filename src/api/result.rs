//! Purpose: Outcome of one remote call, as seen by the dispatcher.
//! Exports: `RemoteResult`.
//! Invariants: Exactly one arm holds data; failures carry a printable cause.
use crate::core::error::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum RemoteResult<T> {
    Success(T),
    Failure(String),
}

impl<T> From<Result<T, Error>> for RemoteResult<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(value) => RemoteResult::Success(value),
            Err(err) => RemoteResult::Failure(err.to_string()),
        }
    }
}
