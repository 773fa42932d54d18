//! Errors of a deployment run, wrapping the FTP client's errors.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use super::types::FtpError;

/// A shorthand for a Result whose error type is always a DeployError.
pub type Result<T> = ::std::result::Result<T, DeployError>;

#[derive(Debug)]
pub enum DeployError {
    /// The remote side failed or refused an operation that is not tolerated.
    Ftp(FtpError),
    /// A local file could not be read.
    Local { path: PathBuf, source: io::Error },
    /// The local tree could not be walked.
    Walk(walkdir::Error),
    /// The configuration is missing a value or is inconsistent.
    Config(String),
}

impl fmt::Display for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DeployError::Ftp(ref err) => write!(f, "{}", err),
            DeployError::Local { ref path, ref source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            DeployError::Walk(ref err) => write!(f, "could not walk local directory: {}", err),
            DeployError::Config(ref desc) => write!(f, "invalid configuration: {}", desc),
        }
    }
}

impl Error for DeployError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            DeployError::Ftp(ref err) => Some(err),
            DeployError::Local { ref source, .. } => Some(source),
            DeployError::Walk(ref err) => Some(err),
            DeployError::Config(_) => None,
        }
    }
}

impl From<FtpError> for DeployError {
    fn from(err: FtpError) -> DeployError {
        DeployError::Ftp(err)
    }
}

impl From<walkdir::Error> for DeployError {
    fn from(err: walkdir::Error) -> DeployError {
        DeployError::Walk(err)
    }
}
