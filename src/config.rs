//! Deployment settings, read from a TOML file and adjusted by the command line.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::error::{DeployError, Result};
use super::ftp::DataMode;
use super::listing::ListingMode;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "ftp-deploy.toml";

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Local build output that gets mirrored.
    pub local_dir: PathBuf,
    /// Remote root, created when missing. Empty means the login directory.
    pub remote_dir: String,
    /// Subdirectory of the remote root emptied before uploading. An empty
    /// string in the file turns cleaning off.
    pub clean: Option<String>,
    /// Whether to upload the routing `.htaccess`.
    pub htaccess: bool,
    pub rewrite_base: String,
    pub connect_timeout_secs: u64,
    pub passive_mode: DataMode,
    pub listing: ListingMode,
    /// Explicit FTPS; needs the `secure` feature.
    pub secure: bool,
    /// Printed after a successful deployment.
    pub url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: String::new(),
            port: 21,
            username: String::new(),
            password: String::new(),
            local_dir: PathBuf::from("dist"),
            remote_dir: String::new(),
            clean: Some("assets".to_owned()),
            htaccess: true,
            rewrite_base: "/".to_owned(),
            connect_timeout_secs: 30,
            passive_mode: DataMode::default(),
            listing: ListingMode::default(),
            secure: false,
            url: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"****")
            .field("local_dir", &self.local_dir)
            .field("remote_dir", &self.remote_dir)
            .field("clean", &self.clean)
            .field("htaccess", &self.htaccess)
            .field("rewrite_base", &self.rewrite_base)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("passive_mode", &self.passive_mode)
            .field("listing", &self.listing)
            .field("secure", &self.secure)
            .field("url", &self.url)
            .finish()
    }
}

impl Config {
    /// Load config from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|source| DeployError::Local {
            path: path.to_path_buf(),
            source,
        })?;
        Config::parse(&text).map_err(|err| match err {
            DeployError::Config(desc) => DeployError::Config(format!("{}: {}", path.display(), desc)),
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Config> {
        let mut config: Config = toml::from_str(text).map_err(|err| DeployError::Config(err.to_string()))?;
        let clean = config.clean.take();
        config.set_clean(clean);
        Ok(config)
    }

    /// Sets the directory to clean; an empty name turns cleaning off.
    pub fn set_clean(&mut self, dir: Option<String>) {
        self.clean = dir.filter(|dir| !dir.trim().is_empty());
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Checks the settings a deployment cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(DeployError::Config("no host given".to_owned()));
        }
        if self.username.trim().is_empty() {
            return Err(DeployError::Config("no username given".to_owned()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(DeployError::Config("connect_timeout_secs must be positive".to_owned()));
        }
        if !self.local_dir.is_dir() {
            return Err(DeployError::Config(format!(
                "local directory {} does not exist",
                self.local_dir.display()
            )));
        }
        if let Some(ref clean) = self.clean {
            if clean.trim().is_empty() || clean.starts_with('/') || clean.split('/').any(|part| part == "..") {
                return Err(DeployError::Config(format!(
                    "refusing to clean {:?}: it must be a path inside the remote root",
                    clean
                )));
            }
        }
        if self.secure && !cfg!(feature = "secure") {
            return Err(DeployError::Config(
                "secure = true needs a build with the `secure` feature".to_owned(),
            ));
        }
        Ok(())
    }
}
