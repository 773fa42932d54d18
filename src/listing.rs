//! Parsing of directory listings into `RemoteEntry` values.
//!
//! `MLSD` replies carry machine-readable facts and are preferred. `LIST`
//! output has no standard format; `parse_list_line` only understands the
//! Unix `ls -l` layout, where the name is everything after the eighth field.
//! Other layouts (DOS-style listings, for example) yield no entries.

use regex::Regex;
use serde::Deserialize;

lazy_static! {
    // Eight whitespace-separated fields (permissions, links, owner, group,
    // size, month, day, time/year) followed by the name, which may contain spaces.
    static ref LIST_RE: Regex =
        Regex::new(r"^(\S+)\s+\S+\s+\S+\s+\S+\s+\S+\s+\S+\s+\S+\s+\S+\s+(.+)$").unwrap();
}

/// Which listing command a session uses to read directory contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    /// `MLSD`, falling back to `LIST` once the server reports it unsupported.
    #[default]
    Auto,
    Mlsd,
    List,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_directory: bool,
}

impl RemoteEntry {
    pub fn file<S: Into<String>>(name: S) -> RemoteEntry {
        RemoteEntry { name: name.into(), is_directory: false }
    }

    pub fn directory<S: Into<String>>(name: S) -> RemoteEntry {
        RemoteEntry { name: name.into(), is_directory: true }
    }

    /// `.` and `..`
    pub fn is_pseudo(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Parses one `MLSD` line such as `type=dir;modify=20240101120000; assets`.
///
/// The `cdir` and `pdir` entries describe the listed directory and its parent
/// and are dropped.
pub fn parse_mlsd_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let (facts, name) = line.split_once(' ')?;
    if name.is_empty() {
        return None;
    }

    let kind = facts
        .split(';')
        .filter_map(|fact| fact.split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case("type"))
        .map(|(_, value)| value.to_ascii_lowercase())?;

    match kind.as_str() {
        "cdir" | "pdir" => None,
        "dir" => Some(RemoteEntry::directory(name)),
        _ => Some(RemoteEntry::file(name)),
    }
}

/// Parses one Unix-style `LIST` line. A leading `d` marks a directory.
/// Symlinks keep only their own name, without the ` -> target` part.
pub fn parse_list_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let caps = LIST_RE.captures(line)?;
    let perms = caps.get(1)?.as_str();
    let mut name = caps.get(2)?.as_str();

    if perms.starts_with('l') {
        if let Some((link, _)) = name.split_once(" -> ") {
            name = link;
        }
    }

    Some(RemoteEntry {
        name: name.to_owned(),
        is_directory: perms.starts_with('d'),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mlsd_lines() {
        assert_eq!(
            parse_mlsd_line("type=dir;modify=20240101120000;perm=flcdmpe; assets\r\n"),
            Some(RemoteEntry::directory("assets"))
        );
        assert_eq!(
            parse_mlsd_line("Type=file;Size=1024; my file.js"),
            Some(RemoteEntry::file("my file.js"))
        );
        assert_eq!(parse_mlsd_line("type=cdir; /sgg"), None);
        assert_eq!(parse_mlsd_line("type=pdir; .."), None);
        assert_eq!(parse_mlsd_line("garbage"), None);
    }

    #[test]
    fn list_lines() {
        assert_eq!(
            parse_list_line("drwxr-xr-x    2 ftp      ftp          4096 Jan 01 12:00 assets"),
            Some(RemoteEntry::directory("assets"))
        );
        assert_eq!(
            parse_list_line("-rw-r--r--    1 ftp      ftp           512 Mar 3  2023 old bundle.js\r\n"),
            Some(RemoteEntry::file("old bundle.js"))
        );
        assert_eq!(
            parse_list_line("lrwxrwxrwx    1 ftp      ftp            10 Jan 01 12:00 current -> releases/1"),
            Some(RemoteEntry::file("current"))
        );
    }

    #[test]
    fn list_lines_without_a_name_are_skipped() {
        assert_eq!(parse_list_line("total 12"), None);
        assert_eq!(parse_list_line("01-01-24  12:00PM       <DIR>          assets"), None);
        assert_eq!(parse_list_line(""), None);
    }

    #[test]
    fn pseudo_entries() {
        assert!(RemoteEntry::directory(".").is_pseudo());
        assert!(RemoteEntry::directory("..").is_pseudo());
        assert!(!RemoteEntry::directory("...").is_pseudo());
    }
}
