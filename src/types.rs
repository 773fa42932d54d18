//! Error and reply types shared by the FTP client.

use std::error::Error;
use std::fmt;
use std::io;
use std::net::AddrParseError;

use super::status;

/// A shorthand for a Result whose error type is always an FtpError.
pub type Result<T> = ::std::result::Result<T, FtpError>;

/// `FtpError` describes everything that can go wrong while talking to the server.
#[derive(Debug)]
pub enum FtpError {
    ConnectionError(io::Error),
    SecureError(String),
    InvalidResponse(String),
    InvalidAddress(AddrParseError),
    /// The server answered with a reply code the command does not accept.
    UnexpectedResponse(Line),
}

/// Coarse classification of an `FtpError`, so call sites can choose what to tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The control or data connection failed; the session is unusable.
    Transport,
    /// The server sent something the client could not parse.
    Protocol,
    /// The command is not supported by the server (500, 502, 504).
    NotImplemented,
    /// Login refused or more credentials required.
    Denied,
    /// Target missing, already present, or not accessible (450, 550, 553, 521).
    Unavailable,
    /// Any other 4xx reply.
    Transient,
    /// Any other 5xx reply.
    Rejected,
}

impl FtpError {
    pub fn kind(&self) -> ErrorKind {
        match *self {
            FtpError::ConnectionError(_) | FtpError::SecureError(_) => ErrorKind::Transport,
            FtpError::InvalidResponse(_) | FtpError::InvalidAddress(_) => ErrorKind::Protocol,
            FtpError::UnexpectedResponse(Line(code, _)) => match code {
                status::NOT_AVAILABLE => ErrorKind::Transport,
                status::BAD_COMMAND | status::NOT_IMPLEMENTED | status::NOT_IMPLEMENTED_PARAMETER => {
                    ErrorKind::NotImplemented
                }
                status::INVALID_CREDENTIALS | status::NOT_LOGGED_IN | status::STORING_NEED_ACCOUNT => {
                    ErrorKind::Denied
                }
                status::REQUEST_FILE_ACTION_IGNORED
                | status::FILE_UNAVAILABLE
                | status::BAD_FILENAME
                | status::DIRECTORY_EXISTS => ErrorKind::Unavailable,
                400..=499 => ErrorKind::Transient,
                _ => ErrorKind::Rejected,
            },
        }
    }

    /// True when the server refused the command and the session is still usable.
    pub fn is_refusal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Transport | ErrorKind::Protocol)
    }
}

/// `Line` holds a reply code and the text of the final reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(pub u32, pub String);

impl fmt::Display for FtpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FtpError::ConnectionError(ref ioerr) => write!(f, "FTP ConnectionError: {}", ioerr),
            FtpError::SecureError(ref desc) => write!(f, "FTP SecureError: {}", desc),
            FtpError::InvalidResponse(ref desc) => write!(f, "FTP InvalidResponse: {}", desc),
            FtpError::InvalidAddress(ref perr) => write!(f, "FTP InvalidAddress: {}", perr),
            FtpError::UnexpectedResponse(Line(_, ref text)) => {
                write!(f, "FTP UnexpectedResponse: {}", text.trim_end())
            }
        }
    }
}

impl Error for FtpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            FtpError::ConnectionError(ref ioerr) => Some(ioerr),
            FtpError::InvalidAddress(ref perr) => Some(perr),
            _ => None,
        }
    }
}
