use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use ftp_deploy::types::{FtpError, Line, Result};
use ftp_deploy::{RemoteEntry, RemoteFs};

pub fn refused(code: u32, text: &str) -> FtpError {
    FtpError::UnexpectedResponse(Line(code, format!("{} {}\r\n", code, text)))
}

/// In-memory server tree. Paths are stored without a leading slash and the
/// root is the empty string.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub cwd: String,
    /// Mutating operations in the order they happened.
    pub ops: Vec<String>,
    /// Stores to these paths fail with a broken connection.
    pub fail_put: BTreeSet<String>,
    /// Removing these paths is refused.
    pub locked: BTreeSet<String>,
    /// Every listing fails with a broken connection.
    pub fail_list: bool,
}

fn parent(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

impl MemoryRemote {
    pub fn new() -> MemoryRemote {
        let mut remote = MemoryRemote::default();
        remote.dirs.insert(String::new());
        remote
    }

    pub fn with_dir(mut self, path: &str) -> MemoryRemote {
        let mut current = String::new();
        for part in path.split('/') {
            current = if current.is_empty() { part.to_owned() } else { format!("{}/{}", current, part) };
            self.dirs.insert(current.clone());
        }
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> MemoryRemote {
        let mut remote = match parent(path) {
            "" => self,
            dir => self.with_dir(dir),
        };
        remote.files.insert(path.to_owned(), content.as_bytes().to_vec());
        remote
    }

    pub fn has_children(&self, dir: &str) -> bool {
        self.dirs.iter().any(|d| d != dir && parent(d) == dir) || self.files.keys().any(|f| parent(f) == dir)
    }

    pub fn position(&self, op: &str) -> usize {
        self.ops.iter().position(|o| o == op).unwrap_or_else(|| panic!("{} never happened: {:?}", op, self.ops))
    }

    fn resolve(&self, path: &str) -> String {
        let mut parts: Vec<&str> = if path.starts_with('/') {
            Vec::new()
        } else {
            self.cwd.split('/').filter(|p| !p.is_empty()).collect()
        };
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                name => parts.push(name),
            }
        }
        parts.join("/")
    }
}

impl RemoteFs for MemoryRemote {
    fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = self.resolve(path);
        if self.dirs.contains(&path) || self.files.contains_key(&path) {
            return Err(refused(550, "File exists"));
        }
        if !self.dirs.contains(parent(&path)) {
            return Err(refused(550, "No such file or directory"));
        }
        self.ops.push(format!("mkdir {}", path));
        self.dirs.insert(path);
        Ok(())
    }

    fn cwd(&mut self, path: &str) -> Result<()> {
        let path = self.resolve(path);
        if !self.dirs.contains(&path) {
            return Err(refused(550, "No such file or directory"));
        }
        self.cwd = path;
        Ok(())
    }

    fn cdup(&mut self) -> Result<()> {
        self.cwd = parent(&self.cwd).to_owned();
        Ok(())
    }

    fn list_entries(&mut self) -> Result<Vec<RemoteEntry>> {
        if self.fail_list {
            return Err(FtpError::ConnectionError(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));
        }
        let cwd = self.cwd.as_str();
        let mut entries = vec![RemoteEntry::directory("."), RemoteEntry::directory("..")];
        entries.extend(
            self.dirs
                .iter()
                .filter(|d| d.as_str() != cwd && parent(d) == cwd)
                .map(|d| RemoteEntry::directory(&d[d.rfind('/').map_or(0, |i| i + 1)..])),
        );
        entries.extend(
            self.files
                .keys()
                .filter(|f| parent(f) == cwd)
                .map(|f| RemoteEntry::file(&f[f.rfind('/').map_or(0, |i| i + 1)..])),
        );
        Ok(entries)
    }

    fn rm(&mut self, path: &str) -> Result<()> {
        let path = self.resolve(path);
        if self.locked.contains(&path) {
            return Err(refused(550, "Permission denied"));
        }
        match self.files.remove(&path) {
            Some(_) => {
                self.ops.push(format!("rm {}", path));
                Ok(())
            }
            None => Err(refused(550, "No such file")),
        }
    }

    fn rmdir(&mut self, path: &str) -> Result<()> {
        let path = self.resolve(path);
        if self.locked.contains(&path) || !self.dirs.contains(&path) || self.has_children(&path) {
            return Err(refused(550, "Cannot remove directory"));
        }
        self.dirs.remove(&path);
        self.ops.push(format!("rmdir {}", path));
        Ok(())
    }

    fn put(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64> {
        let path = self.resolve(path);
        if !self.dirs.contains(parent(&path)) {
            return Err(refused(553, "No such directory"));
        }
        if self.fail_put.contains(&path) {
            return Err(FtpError::ConnectionError(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")));
        }
        let mut content = Vec::new();
        reader.read_to_end(&mut content).map_err(FtpError::ConnectionError)?;
        self.ops.push(format!("put {}", path));
        let len = content.len() as u64;
        self.files.insert(path, content);
        Ok(len)
    }
}

/// Writes `content` at `root/relative`, creating parent directories.
pub fn write_local(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}
