//! The deployment sequence: remote root, cleanup, routing file, mirror upload.

use std::io::Cursor;
use std::path::{Component, Path};

use log::{debug, info, warn};
#[cfg(feature = "secure")]
use native_tls::TlsConnector;

use super::clean::{clean, CleanReport};
use super::config::Config;
use super::error::{DeployError, Result};
use super::ftp::FtpStream;
use super::mirror::{mirror_upload, MirrorReport};
use super::remote::RemoteFs;
use super::routing::{htaccess, HTACCESS_NAME};

/// Outcome of a successful deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Present when a cleanup ran to completion.
    pub clean: Option<CleanReport>,
    pub mirror: MirrorReport,
}

/// Connects, runs every deployment step and quits the session.
///
/// On failure the session is dropped without `QUIT`.
pub fn deploy(config: &Config) -> Result<Report> {
    config.validate()?;
    let mut ftp = connect(config)?;
    let report = deploy_to(&mut ftp, config)?;
    ftp.quit()?;
    Ok(report)
}

/// Opens a logged-in session in binary, passive mode.
pub fn connect(config: &Config) -> Result<FtpStream> {
    let ftp = FtpStream::connect_timeout((config.host.as_str(), config.port), config.connect_timeout())?;
    let mut ftp = secure(ftp, config)?;
    ftp.login(&config.username, &config.password)?;
    ftp.binary()?;
    ftp.set_mode(config.passive_mode);
    ftp.set_listing_mode(config.listing);
    info!("Connected to {}", config.host);
    Ok(ftp)
}

#[cfg(feature = "secure")]
fn secure(ftp: FtpStream, config: &Config) -> Result<FtpStream> {
    if !config.secure {
        return Ok(ftp);
    }
    let connector = TlsConnector::new().map_err(|e| DeployError::Config(format!("TLS setup failed: {}", e)))?;
    Ok(ftp.into_secure(connector, &config.host)?)
}

#[cfg(not(feature = "secure"))]
fn secure(ftp: FtpStream, config: &Config) -> Result<FtpStream> {
    if config.secure {
        return Err(DeployError::Config("built without the `secure` feature".to_owned()));
    }
    Ok(ftp)
}

/// Runs the remote steps on an open session positioned at the login directory.
pub fn deploy_to<R: RemoteFs + ?Sized>(remote: &mut R, config: &Config) -> Result<Report> {
    enter_remote_root(remote, &config.remote_dir)?;

    let mut report = Report::default();
    if let Some(ref dir) = config.clean {
        match clean(remote, dir) {
            Ok(cleaned) => {
                info!(
                    "Cleaned {}: {} files and {} directories removed",
                    dir, cleaned.files_removed, cleaned.directories_removed
                );
                if !cleaned.leftovers.is_empty() {
                    warn!("{} entries left in {}", cleaned.leftovers.len(), dir);
                }
                report.clean = Some(cleaned);
            }
            Err(err) => warn!("Could not clean {}: {}", dir, err),
        }
    }

    if config.htaccess {
        let rules = htaccess(&config.rewrite_base);
        remote.put(HTACCESS_NAME, &mut Cursor::new(rules.into_bytes()))?;
        info!("Uploaded {} for SPA routing (base {})", HTACCESS_NAME, config.rewrite_base);
    }

    report.mirror = mirror_upload(remote, &config.local_dir)?;
    Ok(report)
}

/// Creates each component of `remote_dir` as needed and enters it.
fn enter_remote_root<R: RemoteFs + ?Sized>(remote: &mut R, remote_dir: &str) -> Result<()> {
    for component in Path::new(remote_dir).components() {
        match component {
            Component::RootDir => remote.cwd("/")?,
            Component::CurDir => {}
            Component::ParentDir => remote.cwd("..")?,
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    DeployError::Config(format!("remote directory {:?} is not valid UTF-8", remote_dir))
                })?;
                match remote.mkdir(name) {
                    Ok(()) => info!("Created remote directory: {}", name),
                    Err(ref err) if err.is_refusal() => debug!("remote directory {} likely exists: {}", name, err),
                    Err(err) => return Err(err.into()),
                }
                remote.cwd(name)?;
            }
            Component::Prefix(_) => {}
        }
    }
    if !remote_dir.is_empty() {
        info!("Changed to remote directory: {}", remote_dir);
    }
    Ok(())
}
