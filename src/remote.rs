//! The remote operations the deployment steps need.
//!
//! The cleaner, the mirror uploader and the orchestrator are written against
//! `RemoteFs` rather than `FtpStream`. Paths are relative to the current
//! remote directory unless they start with `/`.

use std::io::Read;

use super::ftp::FtpStream;
use super::listing::RemoteEntry;
use super::types::Result;

pub trait RemoteFs {
    fn mkdir(&mut self, path: &str) -> Result<()>;
    fn cwd(&mut self, path: &str) -> Result<()>;
    /// Moves to the parent of the current directory.
    fn cdup(&mut self) -> Result<()>;
    /// Entries of the current directory. May include `.` and `..`.
    fn list_entries(&mut self) -> Result<Vec<RemoteEntry>>;
    fn rm(&mut self, path: &str) -> Result<()>;
    fn rmdir(&mut self, path: &str) -> Result<()>;
    /// Stores `reader` at `path` as a binary transfer and returns the bytes sent.
    fn put(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64>;
}

impl RemoteFs for FtpStream {
    fn mkdir(&mut self, path: &str) -> Result<()> {
        FtpStream::mkdir(self, path)
    }

    fn cwd(&mut self, path: &str) -> Result<()> {
        FtpStream::cwd(self, path)
    }

    fn cdup(&mut self) -> Result<()> {
        FtpStream::cdup(self)
    }

    fn list_entries(&mut self) -> Result<Vec<RemoteEntry>> {
        FtpStream::list_entries(self)
    }

    fn rm(&mut self, path: &str) -> Result<()> {
        FtpStream::rm(self, path)
    }

    fn rmdir(&mut self, path: &str) -> Result<()> {
        FtpStream::rmdir(self, path)
    }

    fn put(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64> {
        FtpStream::put(self, path, reader)
    }
}
