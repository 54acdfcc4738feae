//! Directory entries and decoding of the native `d_name` buffer.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStringExt;
use std::time::SystemTime;

use libc::c_char;

use crate::stat::Stat;

/// Longest name decoded from a `d_name` buffer.
pub const MAX_NAME_LEN: usize = 256;

/// Name stored in a native `d_name` buffer: every byte up to the first NUL,
/// or the first [`MAX_NAME_LEN`] bytes if there is none.
pub fn dirent_name(raw: &[c_char]) -> OsString {
    let name: Vec<u8> = raw
        .iter()
        .take(MAX_NAME_LEN)
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    OsString::from_vec(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Dir,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileType {
    pub fn from_mode(mode: u32) -> Self {
        match mode & libc::S_IFMT as u32 {
            m if m == libc::S_IFREG as u32 => FileType::File,
            m if m == libc::S_IFDIR as u32 => FileType::Dir,
            m if m == libc::S_IFLNK as u32 => FileType::Symlink,
            m if m == libc::S_IFBLK as u32 => FileType::BlockDevice,
            m if m == libc::S_IFCHR as u32 => FileType::CharDevice,
            m if m == libc::S_IFIFO as u32 => FileType::Fifo,
            m if m == libc::S_IFSOCK as u32 => FileType::Socket,
            _ => FileType::Unknown,
        }
    }
}

/// One entry produced by [`Fd::readdir`](crate::Fd::readdir): the name and
/// the attributes fetched in the same round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: OsString,
    stat: Stat,
}

impl DirEntry {
    pub fn new(name: OsString, stat: Stat) -> Self {
        Self { name, stat }
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn into_name(self) -> OsString {
        self.name
    }

    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.stat.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Dir
    }

    pub fn is_file(&self) -> bool {
        self.file_type() == FileType::File
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type() == FileType::Symlink
    }

    pub fn len(&self) -> i64 {
        self.stat.size
    }

    pub fn is_empty(&self) -> bool {
        self.stat.size == 0
    }

    pub fn modified(&self) -> SystemTime {
        self.stat.mtime
    }

    /// Permission bits.
    pub fn permissions(&self) -> u32 {
        self.stat.mode & 0o7777
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_buf(bytes: &[u8]) -> [c_char; MAX_NAME_LEN] {
        let mut buf = [0 as c_char; MAX_NAME_LEN];
        for (dst, &b) in buf.iter_mut().zip(bytes) {
            *dst = b as c_char;
        }
        buf
    }

    #[test]
    fn test_name_stops_at_nul() {
        let buf = name_buf(b"file.txt");
        assert_eq!(dirent_name(&buf), "file.txt");
    }

    #[test]
    fn test_name_without_nul_takes_max_len() {
        let buf = name_buf(&[b'a'; MAX_NAME_LEN]);
        let name = dirent_name(&buf);
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert_eq!(name.into_vec(), vec![b'a'; MAX_NAME_LEN]);
    }

    #[test]
    fn test_bytes_past_max_len_are_ignored() {
        let mut long = vec![b'x' as c_char; MAX_NAME_LEN + 16];
        long[MAX_NAME_LEN + 3] = 0;
        assert_eq!(dirent_name(&long).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_name_keeps_non_utf8_bytes() {
        let buf = name_buf(&[0xff, 0xfe, b'z']);
        assert_eq!(dirent_name(&buf).into_vec(), vec![0xff, 0xfe, b'z']);
    }

    #[test]
    fn test_empty_name() {
        let buf = name_buf(b"");
        assert!(dirent_name(&buf).is_empty());
    }

    #[test]
    fn test_entry_symlink_and_mtime() {
        let mtime = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        let stat = Stat {
            mode: libc::S_IFLNK as u32 | 0o777,
            size: 11,
            mtime,
            ..Stat::default()
        };
        let entry = DirEntry::new("link".into(), stat);
        assert!(entry.is_symlink());
        assert!(!entry.is_dir());
        assert_eq!(entry.modified(), mtime);
        assert_eq!(entry.len(), 11);
        assert!(!entry.is_empty());
        assert_eq!(entry.into_name(), "link");
    }

    #[test]
    fn test_entry_file_type() {
        let stat = Stat {
            mode: libc::S_IFDIR as u32 | 0o755,
            ..Stat::default()
        };
        let entry = DirEntry::new("sub".into(), stat);
        assert!(entry.is_dir());
        assert!(!entry.is_file());
        assert_eq!(entry.permissions(), 0o755);
        assert_eq!(FileType::from_mode(libc::S_IFLNK as u32), FileType::Symlink);
        assert_eq!(FileType::from_mode(0), FileType::Unknown);
    }
}
