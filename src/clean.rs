//! Recursive removal of the contents of a remote directory.

use log::{debug, warn};

use super::listing::RemoteEntry;
use super::remote::RemoteFs;
use super::types::Result;

/// What a cleanup removed and what it had to leave behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub files_removed: usize,
    pub directories_removed: usize,
    /// Entries the server refused to delete, as paths relative to the cleaned directory.
    pub leftovers: Vec<String>,
}

/// Removes everything inside `directory`, deepest entries first, and keeps
/// `directory` itself.
///
/// `directory` is relative to the current remote directory and may span
/// several components (`static/assets`); a leading `/` is ignored. `remote`
/// is back where it started when this returns, one `CDUP` per component
/// entered. A directory the server will not let us enter counts as absent
/// and yields an empty report. Refused deletions are recorded in `leftovers`
/// and the walk continues; only transport failures are returned.
pub fn clean<R: RemoteFs + ?Sized>(remote: &mut R, directory: &str) -> Result<CleanReport> {
    let mut report = CleanReport::default();
    let components: Vec<&str> = directory.split('/').filter(|p| !p.is_empty() && *p != ".").collect();
    if components.contains(&"..") {
        warn!("not cleaning {}: it leaves the current directory", directory);
        return Ok(report);
    }
    let (target, parents) = match components.split_last() {
        Some(split) => split,
        None => return Ok(report),
    };

    let mut entered = 0;
    let mut result: Result<()> = Ok(());
    for parent in parents {
        match remote.cwd(parent) {
            Ok(()) => entered += 1,
            Err(ref err) if err.is_refusal() => {
                debug!("nothing to clean in {}: {}", directory, err);
                break;
            }
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }
    if result.is_ok() && entered == parents.len() {
        result = clean_into(remote, target, "", &mut report);
    }
    for _ in 0..entered {
        let back = remote.cdup();
        if result.is_ok() {
            result = back;
        }
    }
    result.map(|_| report)
}

fn clean_into<R: RemoteFs + ?Sized>(
    remote: &mut R,
    directory: &str,
    prefix: &str,
    report: &mut CleanReport,
) -> Result<()> {
    match remote.cwd(directory) {
        Ok(()) => {}
        Err(ref err) if err.is_refusal() => {
            debug!("nothing to clean in {}: {}", directory, err);
            return Ok(());
        }
        Err(err) => return Err(err),
    }

    let walked = remove_entries(remote, prefix, report);
    let back = remote.cdup();
    walked?;
    back
}

fn remove_entries<R: RemoteFs + ?Sized>(remote: &mut R, prefix: &str, report: &mut CleanReport) -> Result<()> {
    let entries = remote.list_entries()?;
    for RemoteEntry { name, is_directory } in entries.into_iter().filter(|e| !e.is_pseudo()) {
        let path = if prefix.is_empty() { name.clone() } else { format!("{}/{}", prefix, name) };

        let removed = if is_directory {
            clean_into(remote, &name, &path, report)?;
            remote.rmdir(&name).map(|_| report.directories_removed += 1)
        } else {
            remote.rm(&name).map(|_| report.files_removed += 1)
        };

        match removed {
            Ok(()) => debug!("removed {}", path),
            Err(ref err) if err.is_refusal() => {
                warn!("could not remove {}: {}", path, err);
                report.leftovers.push(path);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
