//! ftp_deploy uploads a static site build to an FTP server.
//!
//! A deployment enters (and creates) the remote root, optionally empties an
//! old assets directory, writes an `.htaccess` that routes unknown paths to
//! `index.html`, then mirrors the local build directory.
//!
//! ### Usage
//!
//! ```rust,no_run
//! use ftp_deploy::{deploy, Config};
//!
//! let config = Config {
//!     host: "ftp.example.net".to_owned(),
//!     username: "site".to_owned(),
//!     password: "secret".to_owned(),
//!     remote_dir: "www".to_owned(),
//!     ..Config::default()
//! };
//! let report = deploy(&config).unwrap_or_else(|err| panic!("{}", err));
//! println!("{} files uploaded", report.mirror.files_uploaded);
//! ```
//!
//! The steps only need the [`RemoteFs`] trait, so they can run against any
//! session that implements it, [`FtpStream`] included.

#[macro_use]
extern crate lazy_static;

mod data_stream;
mod ftp;
pub mod clean;
pub mod config;
pub mod deploy;
pub mod error;
pub mod listing;
pub mod mirror;
pub mod remote;
pub mod routing;
pub mod status;
pub mod types;

pub use self::clean::{clean, CleanReport};
pub use self::config::Config;
pub use self::deploy::{deploy, deploy_to, Report};
pub use self::error::DeployError;
pub use self::ftp::{DataMode, FtpStream};
pub use self::listing::{ListingMode, RemoteEntry};
pub use self::mirror::{mirror_upload, MirrorReport};
pub use self::remote::RemoteFs;
pub use self::types::{ErrorKind, FtpError};
