//! The remote-handle capability consumed by [`Fd`](crate::Fd).
//!
//! Each method issues exactly one primitive and reports what it returned
//! together with the last error captured immediately after the call. No
//! method interprets its own result; that is the descriptor layer's job.

use std::ffi::CStr;

use nix::errno::Errno;

use crate::sys::GlfsStat;

/// Outcome of one primitive: its return value plus the captured last error.
///
/// `errno` may be set even when `ret` signals success; callers decide
/// whether it is meaningful.
#[derive(Clone, Copy)]
pub struct Call<T> {
    pub ret: T,
    pub errno: Option<Errno>,
}

impl<T> Call<T> {
    pub fn ok(ret: T) -> Self {
        Self { ret, errno: None }
    }

    pub fn with_errno(ret: T, errno: Errno) -> Self {
        Self {
            ret,
            errno: Some(errno),
        }
    }
}

/// One open remote file or directory.
///
/// Implementations hold the service-side read/write cursor and directory
/// cursor. Buffers are borrowed for the duration of a call only.
pub trait RawDescriptor {
    /// Read at the current position. An empty `buf` is still issued.
    fn read(&mut self, buf: &mut [u8], flags: i32) -> Call<isize>;

    /// Write at the current position. An empty `buf` is still issued.
    fn write(&mut self, buf: &[u8], flags: i32) -> Call<isize>;

    fn pread(
        &mut self,
        buf: &mut [u8],
        offset: i64,
        flags: i32,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<isize>;

    fn pwrite(
        &mut self,
        buf: &[u8],
        offset: i64,
        flags: i32,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<isize>;

    fn lseek(&mut self, offset: i64, whence: i32) -> Call<i64>;

    fn fallocate(&mut self, mode: i32, offset: i64, len: usize) -> Call<i32>;

    fn ftruncate(
        &mut self,
        size: i64,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<i32>;

    fn fsync(
        &mut self,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<i32>;

    fn fchmod(&mut self, mode: u32) -> Call<i32>;

    fn fstat(&mut self, stat: &mut libc::stat) -> Call<i32>;

    /// `value == None` is a null target with length 0: a size query.
    fn fgetxattr(&mut self, name: &CStr, value: Option<&mut [u8]>) -> Call<isize>;

    fn fsetxattr(&mut self, name: &CStr, value: &[u8], flags: i32) -> Call<i32>;

    fn fremovexattr(&mut self, name: &CStr) -> Call<i32>;

    /// Next directory entry, `None` once the listing is exhausted.
    fn readdir(&mut self) -> Call<Option<libc::dirent>>;

    /// Next directory entry with its attributes written to `stat`.
    fn readdirplus(&mut self, stat: &mut libc::stat) -> Call<Option<libc::dirent>>;
}

impl<T: RawDescriptor + ?Sized> RawDescriptor for &mut T {
    fn read(&mut self, buf: &mut [u8], flags: i32) -> Call<isize> {
        (**self).read(buf, flags)
    }

    fn write(&mut self, buf: &[u8], flags: i32) -> Call<isize> {
        (**self).write(buf, flags)
    }

    fn pread(
        &mut self,
        buf: &mut [u8],
        offset: i64,
        flags: i32,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<isize> {
        (**self).pread(buf, offset, flags, poststat)
    }

    fn pwrite(
        &mut self,
        buf: &[u8],
        offset: i64,
        flags: i32,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<isize> {
        (**self).pwrite(buf, offset, flags, prestat, poststat)
    }

    fn lseek(&mut self, offset: i64, whence: i32) -> Call<i64> {
        (**self).lseek(offset, whence)
    }

    fn fallocate(&mut self, mode: i32, offset: i64, len: usize) -> Call<i32> {
        (**self).fallocate(mode, offset, len)
    }

    fn ftruncate(
        &mut self,
        size: i64,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<i32> {
        (**self).ftruncate(size, prestat, poststat)
    }

    fn fsync(
        &mut self,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<i32> {
        (**self).fsync(prestat, poststat)
    }

    fn fchmod(&mut self, mode: u32) -> Call<i32> {
        (**self).fchmod(mode)
    }

    fn fstat(&mut self, stat: &mut libc::stat) -> Call<i32> {
        (**self).fstat(stat)
    }

    fn fgetxattr(&mut self, name: &CStr, value: Option<&mut [u8]>) -> Call<isize> {
        (**self).fgetxattr(name, value)
    }

    fn fsetxattr(&mut self, name: &CStr, value: &[u8], flags: i32) -> Call<i32> {
        (**self).fsetxattr(name, value, flags)
    }

    fn fremovexattr(&mut self, name: &CStr) -> Call<i32> {
        (**self).fremovexattr(name)
    }

    fn readdir(&mut self) -> Call<Option<libc::dirent>> {
        (**self).readdir()
    }

    fn readdirplus(&mut self, stat: &mut libc::stat) -> Call<Option<libc::dirent>> {
        (**self).readdirplus(stat)
    }
}
