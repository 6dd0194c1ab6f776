use derive_more::{Display, Error};
use std::path::PathBuf;

/// A command line error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command line operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("resource check failed")]
    Check,
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("{} is neither a target nor a local manifest", _0.display())]
    Decode(#[error(not(source))] PathBuf),
}
