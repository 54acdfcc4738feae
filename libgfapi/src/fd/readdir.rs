//! Paginated directory listing.
//!
//! The cursor lives on the service side, so a listing resumes where the
//! previous call on the same handle stopped. There is no rewind.

use std::ffi::OsString;
use std::vec;

use crate::dirent::{DirEntry, dirent_name};
use crate::error::{Error, Result};
use crate::handle::RawDescriptor;
use crate::stat::Stat;
use crate::sys::zeroed_stat;

use super::Fd;

impl<D: RawDescriptor> Fd<D> {
    /// Up to `limit` entries with their attributes, all remaining entries
    /// when `limit` is 0.
    ///
    /// Each entry and its attributes come from one readdirplus call. If any
    /// call reports an error, the entries gathered so far are dropped.
    pub fn readdir(&mut self, limit: usize) -> Result<Vec<DirEntry>> {
        trace!("readdir limit={limit}");
        let mut entries = Vec::new();
        while limit == 0 || entries.len() < limit {
            let mut st = zeroed_stat();
            let call = self.raw.readdirplus(&mut st);
            if let Some(errno) = call.errno {
                return Err(Error::Fetch { op: "readdirplus", errno });
            }
            let Some(dirent) = call.ret else {
                break;
            };
            entries.push(DirEntry::new(
                dirent_name(&dirent.d_name),
                Stat::from_stat(&st),
            ));
        }
        Ok(entries)
    }

    /// Like [`readdir`](Self::readdir) but names only.
    pub fn readdirnames(&mut self, limit: usize) -> Result<Vec<OsString>> {
        trace!("readdirnames limit={limit}");
        let mut names = Vec::new();
        while limit == 0 || names.len() < limit {
            let call = self.raw.readdir();
            if let Some(errno) = call.errno {
                return Err(Error::Fetch { op: "readdir", errno });
            }
            let Some(dirent) = call.ret else {
                break;
            };
            names.push(dirent_name(&dirent.d_name));
        }
        Ok(names)
    }

    /// Iterate over the remaining entries, fetching
    /// [`readdir_batch`](crate::FdOptions::readdir_batch) at a time.
    pub fn entries(&mut self) -> Entries<'_, D> {
        let batch = self.options.readdir_batch;
        Entries {
            fd: self,
            batch,
            buf: Vec::new().into_iter(),
            done: false,
        }
    }
}

/// Iterator returned by [`Fd::entries`]. Stops after the first error.
pub struct Entries<'a, D: RawDescriptor> {
    fd: &'a mut Fd<D>,
    batch: usize,
    buf: vec::IntoIter<DirEntry>,
    done: bool,
}

impl<D: RawDescriptor> Iterator for Entries<'_, D> {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.buf.next() {
            return Some(Ok(entry));
        }
        if self.done {
            return None;
        }
        match self.fd.readdir(self.batch) {
            Ok(page) => {
                // A short page means the cursor hit the end.
                if self.batch == 0 || page.len() < self.batch {
                    self.done = true;
                }
                self.buf = page.into_iter();
                self.buf.next().map(Ok)
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use nix::errno::Errno;

    use crate::Result;
    use crate::error::Error;
    use crate::fd::Fd;
    use crate::mem::{MemDescriptor, Primitive};
    use crate::options::FdOptions;
    use crate::stat::Stat;

    fn listing(n: usize) -> MemDescriptor {
        let mut dir = MemDescriptor::dir();
        for i in 0..n {
            let stat = Stat {
                ino: 100 + i as u64,
                size: i as i64,
                mode: libc::S_IFREG as u32 | 0o644,
                ..Stat::default()
            };
            dir.push_entry(format!("f{i}"), stat);
        }
        dir
    }

    fn names(n: std::ops::Range<usize>) -> Vec<String> {
        n.map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn test_readdir_unbounded_returns_everything_in_order() {
        let mut fd = Fd::new(listing(5));
        let entries = fd.readdir(0).unwrap();
        let got: Vec<_> = entries
            .iter()
            .map(|e| e.name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(got, names(0..5));
        assert_eq!(entries[3].stat().ino, 103);
        assert_eq!(entries[3].len(), 3);
        assert!(entries[3].is_file());
        // five entries plus the call that reported the end
        assert_eq!(fd.get_ref().calls(Primitive::Readdirplus), 6);
        assert!(fd.readdir(0).unwrap().is_empty());
    }

    #[test]
    fn test_readdir_limit_resumes_without_gaps() {
        let mut fd = Fd::new(listing(5));
        let first = fd.readdir(3).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(fd.get_ref().calls(Primitive::Readdirplus), 3);
        let rest = fd.readdir(3).unwrap();
        let got: Vec<_> = first
            .iter()
            .chain(rest.iter())
            .map(|e| e.name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(got, names(0..5));
    }

    #[test]
    fn test_readdir_error_discards_partial_page() {
        let mut dir = listing(4);
        let mut fd = Fd::new(&mut dir);
        assert_eq!(fd.readdir(1).unwrap().len(), 1);
        fd.get_mut().fail_next(Primitive::Readdirplus, Errno::EIO);
        let err = fd.readdir(0).unwrap_err();
        assert_eq!(err.errno(), Errno::EIO);
        assert_eq!(err.code(), None);
        // the failed fetch did not move the cursor
        assert_eq!(fd.readdir(0).unwrap().len(), 3);
    }

    #[test]
    fn test_readdir_errno_with_entry_is_an_error() {
        let mut fd = Fd::new(listing(2));
        fd.get_mut().stale_next(Primitive::Readdirplus, Errno::EBADF);
        assert_eq!(fd.readdir(0).unwrap_err().errno(), Errno::EBADF);
    }

    #[test]
    fn test_readdirnames_error_discards_partial_page() {
        let mut dir = listing(5);
        let mut fd = Fd::new(&mut dir);
        assert_eq!(fd.readdirnames(2).unwrap(), vec!["f0", "f1"]);
        fd.get_mut().fail_next(Primitive::Readdir, Errno::EIO);
        let err = fd.readdirnames(0).unwrap_err();
        assert_eq!(err.errno(), Errno::EIO);
        assert_eq!(err.code(), None);
        assert_eq!(fd.readdirnames(0).unwrap(), vec!["f2", "f3", "f4"]);
    }

    #[test]
    fn test_readdirnames_errno_with_entry_is_an_error() {
        let mut fd = Fd::new(listing(3));
        fd.get_mut().stale_next(Primitive::Readdir, Errno::EBADF);
        let err = fd.readdirnames(0).unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch {
                op: "readdir",
                errno: Errno::EBADF
            }
        ));
        // the flagged entry was consumed by the service
        assert_eq!(fd.readdirnames(0).unwrap(), vec!["f1", "f2"]);
    }

    #[test]
    fn test_readdirnames_pages() {
        let mut fd = Fd::new(listing(3));
        assert_eq!(fd.readdirnames(2).unwrap(), vec!["f0", "f1"]);
        assert_eq!(fd.readdirnames(2).unwrap(), vec!["f2"]);
        assert!(fd.readdirnames(2).unwrap().is_empty());
        assert_eq!(fd.get_ref().calls(Primitive::Readdir), 5);
        assert_eq!(fd.get_ref().calls(Primitive::Readdirplus), 0);
    }

    #[test]
    fn test_readdirnames_long_name_is_cut() {
        let mut dir = MemDescriptor::dir();
        dir.push_entry(vec![b'n'; 300], Stat::default());
        let mut fd = Fd::new(dir);
        let names = fd.readdirnames(0).unwrap();
        assert_eq!(names[0].len(), 256);
    }

    #[test]
    fn test_entries_iterates_in_batches() {
        let opts = FdOptions {
            readdir_batch: 2,
            ..FdOptions::default()
        };
        let mut fd = Fd::with_options(listing(5), opts);
        let all: Vec<_> = fd.entries().collect::<Result<_>>().unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[4].name(), "f4");
        // 2 + 2 + 1 fetched, the short page ends the walk
        assert_eq!(fd.get_ref().calls(Primitive::Readdirplus), 6);
    }

    #[test]
    fn test_entries_stops_after_error() {
        let mut fd = Fd::new(listing(3));
        fd.get_mut().fail_next(Primitive::Readdirplus, Errno::ENOTDIR);
        let mut it = fd.entries();
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
    }
}
