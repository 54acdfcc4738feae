//! In-memory [`RawDescriptor`], used for local development and tests.
//!
//! `MemDescriptor` models one open file (contents, cursor, mode, xattrs) and
//! a directory listing with its own cursor. It counts every primitive it
//! receives and can be told to fail the next call of a primitive, or to
//! report a stale last error alongside the next successful one.

use std::collections::HashMap;
use std::ffi::CStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use libc::c_char;
use nix::errno::Errno;

use crate::dirent::{FileType, MAX_NAME_LEN};
use crate::flags::{FallocateMode, StatMask, XattrFlags};
use crate::handle::{Call, RawDescriptor};
use crate::stat::{Stat, to_timespec};
use crate::sys::{GlfsStat, zeroed_dirent};

const CLOCK_BASE: u64 = 1_700_000_000;
const BLOCK_SIZE: i64 = 4096;
/// Largest file the in-memory descriptor will grow to.
pub const MAX_FILE_SIZE: usize = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Read,
    Write,
    Pread,
    Pwrite,
    Lseek,
    Fallocate,
    Ftruncate,
    Fsync,
    Fchmod,
    Fstat,
    Fgetxattr,
    Fsetxattr,
    Fremovexattr,
    Readdir,
    Readdirplus,
}

pub struct MemDescriptor {
    data: Vec<u8>,
    pos: i64,
    mode: u32,
    ino: u64,
    uid: u32,
    gid: u32,
    version: u64,
    xattrs: HashMap<Vec<u8>, Vec<u8>>,
    entries: Vec<(Vec<u8>, Stat)>,
    cursor: usize,
    calls: HashMap<Primitive, usize>,
    faults: HashMap<Primitive, Errno>,
    stale: HashMap<Primitive, Errno>,
    size_queries: usize,
}

impl Default for MemDescriptor {
    fn default() -> Self {
        Self::file()
    }
}

impl MemDescriptor {
    /// An empty regular file with mode 0644.
    pub fn file() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
            mode: libc::S_IFREG as u32 | 0o644,
            ino: 1,
            uid: 0,
            gid: 0,
            version: 0,
            xattrs: HashMap::new(),
            entries: Vec::new(),
            cursor: 0,
            calls: HashMap::new(),
            faults: HashMap::new(),
            stale: HashMap::new(),
            size_queries: 0,
        }
    }

    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Self::file()
        }
    }

    /// An empty directory with mode 0755.
    pub fn dir() -> Self {
        Self {
            mode: libc::S_IFDIR as u32 | 0o755,
            ..Self::file()
        }
    }

    /// Append an entry to the listing. Names longer than `d_name` are cut.
    pub fn push_entry(&mut self, name: impl AsRef<[u8]>, stat: Stat) {
        self.entries.push((name.as_ref().to_vec(), stat));
    }

    pub fn set_owner(&mut self, uid: u32, gid: u32) {
        self.uid = uid;
        self.gid = gid;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn position(&self) -> i64 {
        self.pos
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn xattr(&self, name: &[u8]) -> Option<&[u8]> {
        self.xattrs.get(name).map(Vec::as_slice)
    }

    pub fn calls(&self, p: Primitive) -> usize {
        self.calls.get(&p).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.values().sum()
    }

    /// Number of `fgetxattr` calls issued with a null target.
    pub fn size_queries(&self) -> usize {
        self.size_queries
    }

    /// Make the next call of `p` fail with `errno` and no side effects.
    pub fn fail_next(&mut self, p: Primitive, errno: Errno) {
        self.faults.insert(p, errno);
    }

    /// Report `errno` alongside the next successful call of `p`.
    pub fn stale_next(&mut self, p: Primitive, errno: Errno) {
        self.stale.insert(p, errno);
    }

    fn issue<T>(
        &mut self,
        p: Primitive,
        failed: T,
        op: impl FnOnce(&mut Self) -> Result<T, Errno>,
    ) -> Call<T> {
        *self.calls.entry(p).or_default() += 1;
        if let Some(errno) = self.faults.remove(&p) {
            return Call::with_errno(failed, errno);
        }
        match op(self) {
            Ok(ret) => match self.stale.remove(&p) {
                Some(errno) => Call::with_errno(ret, errno),
                None => Call::ok(ret),
            },
            Err(errno) => Call::with_errno(failed, errno),
        }
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(CLOCK_BASE + self.version)
    }

    fn stat(&self) -> Stat {
        let size = self.data.len() as i64;
        Stat {
            mask: StatMask::BASIC_STATS,
            atime: self.now(),
            ctime: self.now(),
            mtime: self.now(),
            ino: self.ino,
            size,
            blocks: (size as u64).div_ceil(512),
            blksize: BLOCK_SIZE,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            mode: self.mode,
            ..Stat::default()
        }
    }

    fn snapshot(&self, slot: Option<&mut GlfsStat>) {
        if let Some(slot) = slot {
            *slot = GlfsStat::from(&self.stat());
        }
    }

    fn write_at(&mut self, offset: usize, buf: &[u8]) -> Result<usize, Errno> {
        if buf.is_empty() {
            return Ok(0);
        }
        let end = extent(offset, buf.len())?;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(buf);
        self.touch();
        Ok(buf.len())
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        if offset >= self.data.len() {
            return 0;
        }
        let n = buf.len().min(self.data.len() - offset);
        buf[..n].copy_from_slice(&self.data[offset..offset + n]);
        n
    }

    fn next_entry(&mut self) -> Option<(libc::dirent, Stat)> {
        let (name, stat) = self.entries.get(self.cursor)?;
        let mut d = zeroed_dirent();
        d.d_ino = stat.ino as libc::ino_t;
        d.d_type = dtype(stat.mode);
        for (dst, &b) in d.d_name.iter_mut().zip(name.iter().take(MAX_NAME_LEN)) {
            *dst = b as c_char;
        }
        let stat = stat.clone();
        self.cursor += 1;
        Some((d, stat))
    }
}

fn offset_of(offset: i64) -> Result<usize, Errno> {
    usize::try_from(offset).map_err(|_| Errno::EINVAL)
}

/// End of the range `start..start + len`, bounded by [`MAX_FILE_SIZE`].
fn extent(start: usize, len: usize) -> Result<usize, Errno> {
    start
        .checked_add(len)
        .filter(|&end| end <= MAX_FILE_SIZE)
        .ok_or(Errno::EFBIG)
}

fn dtype(mode: u32) -> u8 {
    match FileType::from_mode(mode) {
        FileType::File => libc::DT_REG,
        FileType::Dir => libc::DT_DIR,
        FileType::Symlink => libc::DT_LNK,
        FileType::BlockDevice => libc::DT_BLK,
        FileType::CharDevice => libc::DT_CHR,
        FileType::Fifo => libc::DT_FIFO,
        FileType::Socket => libc::DT_SOCK,
        FileType::Unknown => libc::DT_UNKNOWN,
    }
}

fn fill_stat(st: &mut libc::stat, s: &Stat) {
    let (atime, mtime, ctime) = (
        to_timespec(s.atime),
        to_timespec(s.mtime),
        to_timespec(s.ctime),
    );
    st.st_dev = libc::makedev(s.dev_major, s.dev_minor);
    st.st_ino = s.ino as libc::ino_t;
    st.st_mode = s.mode as libc::mode_t;
    st.st_nlink = s.nlink as libc::nlink_t;
    st.st_uid = s.uid;
    st.st_gid = s.gid;
    st.st_rdev = libc::makedev(s.rdev_major, s.rdev_minor);
    st.st_size = s.size as libc::off_t;
    st.st_blksize = s.blksize as libc::blksize_t;
    st.st_blocks = s.blocks as libc::blkcnt_t;
    st.st_atime = atime.tv_sec;
    st.st_atime_nsec = atime.tv_nsec as _;
    st.st_mtime = mtime.tv_sec;
    st.st_mtime_nsec = mtime.tv_nsec as _;
    st.st_ctime = ctime.tv_sec;
    st.st_ctime_nsec = ctime.tv_nsec as _;
}

impl RawDescriptor for MemDescriptor {
    fn read(&mut self, buf: &mut [u8], _flags: i32) -> Call<isize> {
        self.issue(Primitive::Read, -1, |f| {
            let n = f.read_at(offset_of(f.pos)?, buf);
            f.pos += n as i64;
            Ok(n as isize)
        })
    }

    fn write(&mut self, buf: &[u8], _flags: i32) -> Call<isize> {
        self.issue(Primitive::Write, -1, |f| {
            let n = f.write_at(offset_of(f.pos)?, buf)?;
            f.pos += n as i64;
            Ok(n as isize)
        })
    }

    fn pread(
        &mut self,
        buf: &mut [u8],
        offset: i64,
        _flags: i32,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<isize> {
        self.issue(Primitive::Pread, -1, |f| {
            let n = f.read_at(offset_of(offset)?, buf);
            f.snapshot(poststat);
            Ok(n as isize)
        })
    }

    fn pwrite(
        &mut self,
        buf: &[u8],
        offset: i64,
        _flags: i32,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<isize> {
        self.issue(Primitive::Pwrite, -1, |f| {
            let offset = offset_of(offset)?;
            extent(offset, buf.len())?;
            f.snapshot(prestat);
            let n = f.write_at(offset, buf)?;
            f.snapshot(poststat);
            Ok(n as isize)
        })
    }

    fn lseek(&mut self, offset: i64, whence: i32) -> Call<i64> {
        self.issue(Primitive::Lseek, -1, |f| {
            let base = match whence {
                libc::SEEK_SET => 0,
                libc::SEEK_CUR => f.pos,
                libc::SEEK_END => f.data.len() as i64,
                _ => return Err(Errno::EINVAL),
            };
            let pos = base
                .checked_add(offset)
                .filter(|p| *p >= 0)
                .ok_or(Errno::EINVAL)?;
            f.pos = pos;
            Ok(pos)
        })
    }

    fn fallocate(&mut self, mode: i32, offset: i64, len: usize) -> Call<i32> {
        self.issue(Primitive::Fallocate, -1, |f| {
            let mode = FallocateMode::from_bits(mode).ok_or(Errno::EOPNOTSUPP)?;
            let start = offset_of(offset)?;
            if len == 0 {
                return Err(Errno::EINVAL);
            }
            let end = extent(start, len)?;
            let keep_size = mode.contains(FallocateMode::KEEP_SIZE);
            if mode.contains(FallocateMode::PUNCH_HOLE) && !keep_size {
                return Err(Errno::EOPNOTSUPP);
            }
            if mode.intersects(FallocateMode::PUNCH_HOLE | FallocateMode::ZERO_RANGE) {
                let zero_end = end.min(f.data.len());
                if start < zero_end {
                    f.data[start..zero_end].fill(0);
                }
            }
            if !keep_size && f.data.len() < end {
                f.data.resize(end, 0);
            }
            f.touch();
            Ok(0)
        })
    }

    fn ftruncate(
        &mut self,
        size: i64,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<i32> {
        self.issue(Primitive::Ftruncate, -1, |f| {
            let size = offset_of(size)?;
            if size > MAX_FILE_SIZE {
                return Err(Errno::EFBIG);
            }
            f.snapshot(prestat);
            f.data.resize(size, 0);
            f.touch();
            f.snapshot(poststat);
            Ok(0)
        })
    }

    fn fsync(
        &mut self,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<i32> {
        self.issue(Primitive::Fsync, -1, |f| {
            f.snapshot(prestat);
            f.snapshot(poststat);
            Ok(0)
        })
    }

    fn fchmod(&mut self, mode: u32) -> Call<i32> {
        self.issue(Primitive::Fchmod, -1, |f| {
            f.mode = (f.mode & libc::S_IFMT as u32) | (mode & 0o7777);
            f.touch();
            Ok(0)
        })
    }

    fn fstat(&mut self, stat: &mut libc::stat) -> Call<i32> {
        self.issue(Primitive::Fstat, -1, |f| {
            fill_stat(stat, &f.stat());
            Ok(0)
        })
    }

    fn fgetxattr(&mut self, name: &CStr, value: Option<&mut [u8]>) -> Call<isize> {
        self.issue(Primitive::Fgetxattr, -1, |f| {
            if value.is_none() {
                f.size_queries += 1;
            }
            let stored = f.xattrs.get(name.to_bytes()).ok_or(Errno::ENODATA)?;
            let Some(dst) = value else {
                return Ok(stored.len() as isize);
            };
            if dst.len() < stored.len() {
                return Err(Errno::ERANGE);
            }
            dst[..stored.len()].copy_from_slice(stored);
            Ok(stored.len() as isize)
        })
    }

    fn fsetxattr(&mut self, name: &CStr, value: &[u8], flags: i32) -> Call<i32> {
        self.issue(Primitive::Fsetxattr, -1, |f| {
            let flags = XattrFlags::from_bits(flags).ok_or(Errno::EINVAL)?;
            let key = name.to_bytes();
            if key.is_empty() {
                return Err(Errno::EINVAL);
            }
            let exists = f.xattrs.contains_key(key);
            if flags.contains(XattrFlags::CREATE) && exists {
                return Err(Errno::EEXIST);
            }
            if flags.contains(XattrFlags::REPLACE) && !exists {
                return Err(Errno::ENODATA);
            }
            f.xattrs.insert(key.to_vec(), value.to_vec());
            Ok(0)
        })
    }

    fn fremovexattr(&mut self, name: &CStr) -> Call<i32> {
        self.issue(Primitive::Fremovexattr, -1, |f| {
            f.xattrs
                .remove(name.to_bytes())
                .map(|_| 0)
                .ok_or(Errno::ENODATA)
        })
    }

    fn readdir(&mut self) -> Call<Option<libc::dirent>> {
        self.issue(Primitive::Readdir, None, |f| {
            Ok(f.next_entry().map(|(d, _)| d))
        })
    }

    fn readdirplus(&mut self, stat: &mut libc::stat) -> Call<Option<libc::dirent>> {
        self.issue(Primitive::Readdirplus, None, |f| {
            Ok(f.next_entry().map(|(d, s)| {
                fill_stat(stat, &s);
                d
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_read_write_cursor() {
        let mut f = MemDescriptor::file();
        let call = f.write(b"hello", 0);
        assert_eq!(call.ret, 5);
        assert_eq!(f.position(), 5);
        assert_eq!(f.lseek(0, libc::SEEK_SET).ret, 0);
        let mut buf = [0u8; 8];
        assert_eq!(f.read(&mut buf, 0).ret, 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(f.read(&mut buf, 0).ret, 0);
        assert_eq!(f.calls(Primitive::Read), 2);
        assert_eq!(f.total_calls(), 4);
    }

    #[test]
    fn test_mem_fault_has_no_side_effects() {
        let mut f = MemDescriptor::file();
        f.fail_next(Primitive::Write, Errno::ENOSPC);
        let call = f.write(b"abc", 0);
        assert_eq!(call.ret, -1);
        assert_eq!(call.errno, Some(Errno::ENOSPC));
        assert!(f.data().is_empty());
        assert_eq!(f.write(b"abc", 0).ret, 3);
    }

    #[test]
    fn test_mem_stale_errno_rides_on_success() {
        let mut f = MemDescriptor::file();
        f.stale_next(Primitive::Fsync, Errno::EAGAIN);
        let call = f.fsync(None, None);
        assert_eq!(call.ret, 0);
        assert_eq!(call.errno, Some(Errno::EAGAIN));
        assert!(f.fsync(None, None).errno.is_none());
    }

    #[test]
    fn test_mem_lseek_rejects_negative_position() {
        let mut f = MemDescriptor::with_data(b"abc".to_vec());
        let call = f.lseek(-4, libc::SEEK_END);
        assert_eq!(call.ret, -1);
        assert_eq!(call.errno, Some(Errno::EINVAL));
        assert_eq!(f.lseek(-1, libc::SEEK_END).ret, 2);
    }

    #[test]
    fn test_mem_punch_hole_keeps_size() {
        let mut f = MemDescriptor::with_data(vec![7u8; 16]);
        let mode = (FallocateMode::PUNCH_HOLE | FallocateMode::KEEP_SIZE).bits();
        assert_eq!(f.fallocate(mode, 4, 100).ret, 0);
        assert_eq!(f.data().len(), 16);
        assert!(f.data()[4..].iter().all(|&b| b == 0));
        assert!(f.data()[..4].iter().all(|&b| b == 7));
        let call = f.fallocate(FallocateMode::PUNCH_HOLE.bits(), 0, 1);
        assert_eq!(call.errno, Some(Errno::EOPNOTSUPP));
    }

    #[test]
    fn test_mem_rejects_growth_past_max_size() {
        let mut f = MemDescriptor::file();
        let call = f.pwrite(b"x", i64::MAX, 0, None, None);
        assert_eq!((call.ret, call.errno), (-1, Some(Errno::EFBIG)));
        let call = f.ftruncate(i64::MAX, None, None);
        assert_eq!((call.ret, call.errno), (-1, Some(Errno::EFBIG)));
        let call = f.fallocate(0, MAX_FILE_SIZE as i64, 1);
        assert_eq!((call.ret, call.errno), (-1, Some(Errno::EFBIG)));
        assert_eq!(f.lseek(i64::MAX, libc::SEEK_SET).ret, i64::MAX);
        let call = f.write(b"x", 0);
        assert_eq!((call.ret, call.errno), (-1, Some(Errno::EFBIG)));
        assert!(f.data().is_empty());
        assert_eq!(f.position(), i64::MAX);
    }

    #[test]
    fn test_mem_empty_write_past_end_does_not_grow() {
        let mut f = MemDescriptor::with_data(b"ab".to_vec());
        f.lseek(100, libc::SEEK_SET);
        assert_eq!(f.write(b"", 0).ret, 0);
        assert_eq!(f.data(), b"ab");
    }

    #[test]
    fn test_mem_listing_cursor() {
        let mut d = MemDescriptor::dir();
        d.push_entry("a", Stat::default());
        d.push_entry("b", Stat::default());
        assert!(d.readdir().ret.is_some());
        assert!(d.readdir().ret.is_some());
        let end = d.readdir();
        assert!(end.ret.is_none());
        assert!(end.errno.is_none());
    }
}
