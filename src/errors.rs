use std::env;
use std::error::Error;
use std::fmt;
use std::io;

/// Error type for populating a [`ContentStore`] and for preparing
/// assets in a build script.
///
/// Errors while serving a request are never reported through this
/// type; they become http status codes.
///
/// [`ContentStore`]: crate::ContentStore
#[derive(Debug)]
pub enum EmbedError {
    /// Reading or writing a file failed.
    Io(io::Error),
    /// A required environment variable was not available.
    Env(String, env::VarError),
    /// A base64 payload of an asset could not be decoded.
    Base64 {
        path: String,
        err: base64::DecodeError,
    },
    /// A compressed payload of an asset is not valid gzip.
    Gzip { path: String, err: io::Error },
    /// An asset was added with neither a raw nor a compressed payload.
    MissingContent(String),
    /// An asset would make a path both a file and a directory.
    Conflict(String),
    /// The modification time of an asset, in seconds since the unix
    /// epoch, can't be expressed as an http date.
    Modified { path: String, secs: u64 },
    /// No asset exists at the given path.
    NotFound(String),
}

impl EmbedError {
    pub(crate) fn base64(path: &str, err: base64::DecodeError) -> Self {
        EmbedError::Base64 {
            path: path.into(),
            err,
        }
    }
    pub(crate) fn gzip(path: &str, err: io::Error) -> Self {
        EmbedError::Gzip {
            path: path.into(),
            err,
        }
    }

    /// True if this error means that something was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            EmbedError::NotFound(_) => true,
            EmbedError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl Error for EmbedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EmbedError::Io(e) => Some(e),
            EmbedError::Env(_, e) => Some(e),
            EmbedError::Base64 { err, .. } => Some(err),
            EmbedError::Gzip { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for EmbedError {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmbedError::Io(e) => write!(out, "I/O error: {e}"),
            EmbedError::Env(var, e) => write!(out, "{var:?}: {e}"),
            EmbedError::Base64 { path, err } => {
                write!(out, "Bad base64 data for {path}: {err}")
            }
            EmbedError::Gzip { path, err } => {
                write!(out, "Bad gzip data for {path}: {err}")
            }
            EmbedError::MissingContent(path) => {
                write!(out, "No content given for {path}")
            }
            EmbedError::Conflict(path) => {
                write!(out, "{path} can't be both a file and a directory")
            }
            EmbedError::Modified { path, secs } => write!(
                out,
                "Modification time {secs} of {path} is out of range",
            ),
            EmbedError::NotFound(path) => write!(out, "{path} not found"),
        }
    }
}

impl From<io::Error> for EmbedError {
    fn from(e: io::Error) -> Self {
        EmbedError::Io(e)
    }
}

impl From<EmbedError> for io::Error {
    fn from(e: EmbedError) -> Self {
        match e {
            EmbedError::Io(e) => e,
            EmbedError::NotFound(_) => {
                io::Error::new(io::ErrorKind::NotFound, e)
            }
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }
}

/// A result where the error type is an [`EmbedError`].
pub type Result<T, E = EmbedError> = std::result::Result<T, E>;
