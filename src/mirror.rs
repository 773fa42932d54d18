//! Uploading a local directory tree into the current remote directory.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path};

use log::{debug, info};
use walkdir::{DirEntry, WalkDir};

use super::error::{DeployError, Result};
use super::remote::RemoteFs;

/// Totals of one mirror upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub directories_created: usize,
    pub files_uploaded: usize,
    pub bytes_uploaded: u64,
}

/// Replicates `local_root` below the current remote directory.
///
/// Directories are visited top-down, each one before its files and its
/// files before its subdirectories, in name order. Directories that cannot
/// be created are assumed to exist already. The first failed upload aborts
/// the walk; files sent before it stay on the server.
pub fn mirror_upload<R: RemoteFs + ?Sized>(remote: &mut R, local_root: &Path) -> Result<MirrorReport> {
    let mut report = MirrorReport::default();
    let walker = WalkDir::new(local_root)
        .follow_links(true)
        .sort_by(files_first);

    for entry in walker {
        let entry = entry?;
        let relative = relative_path(local_root, entry.path())?;

        if entry.file_type().is_dir() {
            if relative.is_empty() {
                continue;
            }
            match remote.mkdir(&relative) {
                Ok(()) => {
                    info!("Created directory: {}", relative);
                    report.directories_created += 1;
                }
                Err(ref err) if err.is_refusal() => debug!("{} not created, likely exists: {}", relative, err),
                Err(err) => return Err(err.into()),
            }
            continue;
        }

        info!("Uploading {} to {}", entry.path().display(), relative);
        let mut file = File::open(entry.path()).map_err(|source| DeployError::Local {
            path: entry.path().to_path_buf(),
            source,
        })?;
        report.bytes_uploaded += upload(remote, &relative, entry.path(), &mut file)?;
        report.files_uploaded += 1;
    }

    Ok(report)
}

/// Sends `reader` to `relative`. A failure while reading the local file is
/// reported against `path` rather than as a broken connection.
fn upload<R: RemoteFs + ?Sized>(remote: &mut R, relative: &str, path: &Path, reader: &mut dyn Read) -> Result<u64> {
    let mut local = LocalReader { inner: reader, failure: None };
    match remote.put(relative, &mut local) {
        Ok(sent) => Ok(sent),
        Err(err) => match local.failure.take() {
            Some(source) => Err(DeployError::Local { path: path.to_path_buf(), source }),
            None => Err(err.into()),
        },
    }
}

/// Remembers the last read error so it can be told apart from network errors.
struct LocalReader<'a> {
    inner: &'a mut dyn Read,
    failure: Option<io::Error>,
}

impl<'a> Read for LocalReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(ref err) if err.kind() != io::ErrorKind::Interrupted => {
                self.failure = Some(io::Error::new(err.kind(), err.to_string()));
                Err(io::Error::new(err.kind(), err.to_string()))
            }
            other => other,
        }
    }
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// The slash-separated path of `path` below `root`; empty for `root` itself.
pub fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let stripped = path.strip_prefix(root).map_err(|_| DeployError::Local {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "path is outside the local root"),
    })?;

    let mut parts = Vec::new();
    for component in stripped.components() {
        if let Component::Normal(name) = component {
            let name = name.to_str().ok_or_else(|| DeployError::Local {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
            })?;
            parts.push(name);
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::RemoteEntry;
    use crate::types::{self, FtpError};

    /// Accepts uploads the way a data connection would, failing on read errors.
    struct Sink;

    impl RemoteFs for Sink {
        fn mkdir(&mut self, _: &str) -> types::Result<()> {
            unimplemented!()
        }
        fn cwd(&mut self, _: &str) -> types::Result<()> {
            unimplemented!()
        }
        fn cdup(&mut self) -> types::Result<()> {
            unimplemented!()
        }
        fn list_entries(&mut self) -> types::Result<Vec<RemoteEntry>> {
            unimplemented!()
        }
        fn rm(&mut self, _: &str) -> types::Result<()> {
            unimplemented!()
        }
        fn rmdir(&mut self, _: &str) -> types::Result<()> {
            unimplemented!()
        }
        fn put(&mut self, _: &str, reader: &mut dyn Read) -> types::Result<u64> {
            io::copy(reader, &mut io::sink()).map_err(FtpError::ConnectionError)
        }
    }

    struct Unreadable;

    impl Read for Unreadable {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "disk says no"))
        }
    }

    #[test]
    fn local_read_failure_names_the_file() {
        let err = upload(&mut Sink, "app.js", Path::new("dist/app.js"), &mut Unreadable).unwrap_err();
        match err {
            DeployError::Local { ref path, ref source } => {
                assert_eq!(path, Path::new("dist/app.js"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected a local error, got {:?}", other),
        }
    }

    #[test]
    fn readable_files_upload_normally() {
        let mut file = io::Cursor::new(b"body".to_vec());
        assert_eq!(upload(&mut Sink, "index.html", Path::new("dist/index.html"), &mut file).unwrap(), 4);
    }

    #[test]
    fn root_is_empty() {
        let root = Path::new("dist");
        assert_eq!(relative_path(root, root).unwrap(), "");
        assert_eq!(relative_path(root, Path::new("dist/index.html")).unwrap(), "index.html");
    }

    #[test]
    fn nested_paths_use_slashes() {
        let root = Path::new("/srv/build/dist");
        let nested = root.join("a").join("b").join("c.txt");
        assert_eq!(relative_path(root, &nested).unwrap(), "a/b/c.txt");
    }

    #[test]
    fn outside_root_is_rejected() {
        assert!(relative_path(Path::new("dist"), Path::new("src/main.rs")).is_err());
    }
}
