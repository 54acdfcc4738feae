//! Linked gfapi binding.
//!
//! Symbols are resolved against `libgfapi.so`. Each wrapper clears `errno`,
//! makes the call and reads `errno` back before anything else can touch it.

use std::ffi::{CStr, c_char, c_int, c_void};
use std::ptr::{self, NonNull};

use libc::{dirent, mode_t, off_t, size_t, ssize_t, stat};
use nix::errno::Errno;

use super::GlfsStat;
use crate::handle::{Call, RawDescriptor};

/// Opaque `glfs_fd_t`.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct glfs_fd_t {
    _private: [u8; 0],
}

#[link(name = "gfapi")]
unsafe extern "C" {
    fn glfs_close(fd: *mut glfs_fd_t) -> c_int;
    fn glfs_read(fd: *mut glfs_fd_t, buf: *mut c_void, count: size_t, flags: c_int) -> ssize_t;
    fn glfs_write(
        fd: *mut glfs_fd_t,
        buf: *const c_void,
        count: size_t,
        flags: c_int,
    ) -> ssize_t;
    fn glfs_pread(
        fd: *mut glfs_fd_t,
        buf: *mut c_void,
        count: size_t,
        offset: off_t,
        flags: c_int,
        poststat: *mut GlfsStat,
    ) -> ssize_t;
    fn glfs_pwrite(
        fd: *mut glfs_fd_t,
        buf: *const c_void,
        count: size_t,
        offset: off_t,
        flags: c_int,
        prestat: *mut GlfsStat,
        poststat: *mut GlfsStat,
    ) -> ssize_t;
    fn glfs_lseek(fd: *mut glfs_fd_t, offset: off_t, whence: c_int) -> off_t;
    fn glfs_fallocate(fd: *mut glfs_fd_t, keep_size: c_int, offset: off_t, len: size_t) -> c_int;
    fn glfs_ftruncate(
        fd: *mut glfs_fd_t,
        length: off_t,
        prestat: *mut GlfsStat,
        poststat: *mut GlfsStat,
    ) -> c_int;
    fn glfs_fsync(fd: *mut glfs_fd_t, prestat: *mut GlfsStat, poststat: *mut GlfsStat) -> c_int;
    fn glfs_fchmod(fd: *mut glfs_fd_t, mode: mode_t) -> c_int;
    fn glfs_fstat(fd: *mut glfs_fd_t, buf: *mut stat) -> c_int;
    fn glfs_fgetxattr(
        fd: *mut glfs_fd_t,
        name: *const c_char,
        value: *mut c_void,
        size: size_t,
    ) -> ssize_t;
    fn glfs_fsetxattr(
        fd: *mut glfs_fd_t,
        name: *const c_char,
        value: *const c_void,
        size: size_t,
        flags: c_int,
    ) -> c_int;
    fn glfs_fremovexattr(fd: *mut glfs_fd_t, name: *const c_char) -> c_int;
    fn glfs_readdir(fd: *mut glfs_fd_t) -> *mut dirent;
    fn glfs_readdirplus(fd: *mut glfs_fd_t, stat: *mut stat) -> *mut dirent;
}

/// Run one gfapi call with `errno` sampled right after it returns.
#[allow(unused_unsafe)]
fn capture<T>(f: impl FnOnce() -> T) -> Call<T> {
    unsafe { Errno::clear() };
    let ret = f();
    let errno = Errno::last();
    Call {
        ret,
        errno: (errno != Errno::UnknownErrno).then_some(errno),
    }
}

fn stat_ptr(slot: Option<&mut GlfsStat>) -> *mut GlfsStat {
    slot.map_or(ptr::null_mut(), |s| s as *mut GlfsStat)
}

/// Copy out the entry before the next readdir reuses gfapi's buffer.
fn take_dirent(d: *mut dirent) -> Option<dirent> {
    // SAFETY: a non-null result points at a dirent owned by the fd and valid
    // until the next readdir on it.
    NonNull::new(d).map(|d| unsafe { *d.as_ptr() })
}

/// An open gfapi descriptor. Closed on drop.
pub struct GlfsFd {
    fd: NonNull<glfs_fd_t>,
}

// A glfs fd may move between threads; `&mut self` keeps calls serialized.
unsafe impl Send for GlfsFd {}

impl GlfsFd {
    /// Take ownership of a descriptor returned by `glfs_open`, `glfs_creat`
    /// or `glfs_opendir`. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `fd` must be open and not owned by anything else; it is closed when
    /// the returned value is dropped.
    pub unsafe fn from_raw(fd: *mut glfs_fd_t) -> Option<Self> {
        NonNull::new(fd).map(|fd| Self { fd })
    }

    pub fn as_raw(&self) -> *mut glfs_fd_t {
        self.fd.as_ptr()
    }

    /// Give up ownership without closing.
    pub fn into_raw(self) -> *mut glfs_fd_t {
        let fd = self.fd.as_ptr();
        std::mem::forget(self);
        fd
    }
}

impl Drop for GlfsFd {
    fn drop(&mut self) {
        let call = capture(|| unsafe { glfs_close(self.fd.as_ptr()) });
        if call.ret < 0 {
            warn!("glfs_close failed: {:?}", call.errno);
        }
    }
}

impl RawDescriptor for GlfsFd {
    fn read(&mut self, buf: &mut [u8], flags: i32) -> Call<isize> {
        let fd = self.as_raw();
        // An empty slice still has a valid, dangling address.
        capture(|| unsafe { glfs_read(fd, buf.as_mut_ptr().cast(), buf.len(), flags) })
    }

    fn write(&mut self, buf: &[u8], flags: i32) -> Call<isize> {
        let fd = self.as_raw();
        capture(|| unsafe { glfs_write(fd, buf.as_ptr().cast(), buf.len(), flags) })
    }

    fn pread(
        &mut self,
        buf: &mut [u8],
        offset: i64,
        flags: i32,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<isize> {
        let fd = self.as_raw();
        let post = stat_ptr(poststat);
        capture(|| unsafe {
            glfs_pread(fd, buf.as_mut_ptr().cast(), buf.len(), offset as off_t, flags, post)
        })
    }

    fn pwrite(
        &mut self,
        buf: &[u8],
        offset: i64,
        flags: i32,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<isize> {
        let fd = self.as_raw();
        let (pre, post) = (stat_ptr(prestat), stat_ptr(poststat));
        capture(|| unsafe {
            glfs_pwrite(
                fd,
                buf.as_ptr().cast(),
                buf.len(),
                offset as off_t,
                flags,
                pre,
                post,
            )
        })
    }

    fn lseek(&mut self, offset: i64, whence: i32) -> Call<i64> {
        let fd = self.as_raw();
        let call = capture(|| unsafe { glfs_lseek(fd, offset as off_t, whence) });
        Call {
            ret: call.ret as i64,
            errno: call.errno,
        }
    }

    fn fallocate(&mut self, mode: i32, offset: i64, len: usize) -> Call<i32> {
        let fd = self.as_raw();
        capture(|| unsafe { glfs_fallocate(fd, mode, offset as off_t, len) })
    }

    fn ftruncate(
        &mut self,
        size: i64,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<i32> {
        let fd = self.as_raw();
        let (pre, post) = (stat_ptr(prestat), stat_ptr(poststat));
        capture(|| unsafe { glfs_ftruncate(fd, size as off_t, pre, post) })
    }

    fn fsync(
        &mut self,
        prestat: Option<&mut GlfsStat>,
        poststat: Option<&mut GlfsStat>,
    ) -> Call<i32> {
        let fd = self.as_raw();
        let (pre, post) = (stat_ptr(prestat), stat_ptr(poststat));
        capture(|| unsafe { glfs_fsync(fd, pre, post) })
    }

    fn fchmod(&mut self, mode: u32) -> Call<i32> {
        let fd = self.as_raw();
        capture(|| unsafe { glfs_fchmod(fd, mode as mode_t) })
    }

    fn fstat(&mut self, st: &mut stat) -> Call<i32> {
        let fd = self.as_raw();
        capture(|| unsafe { glfs_fstat(fd, st) })
    }

    fn fgetxattr(&mut self, name: &CStr, value: Option<&mut [u8]>) -> Call<isize> {
        let fd = self.as_raw();
        let (ptr, len) = match value {
            Some(buf) => (buf.as_mut_ptr().cast::<c_void>(), buf.len()),
            None => (ptr::null_mut(), 0),
        };
        capture(|| unsafe { glfs_fgetxattr(fd, name.as_ptr(), ptr, len) })
    }

    fn fsetxattr(&mut self, name: &CStr, value: &[u8], flags: i32) -> Call<i32> {
        let fd = self.as_raw();
        capture(|| unsafe {
            glfs_fsetxattr(fd, name.as_ptr(), value.as_ptr().cast(), value.len(), flags)
        })
    }

    fn fremovexattr(&mut self, name: &CStr) -> Call<i32> {
        let fd = self.as_raw();
        capture(|| unsafe { glfs_fremovexattr(fd, name.as_ptr()) })
    }

    fn readdir(&mut self) -> Call<Option<dirent>> {
        let fd = self.as_raw();
        let call = capture(|| unsafe { glfs_readdir(fd) });
        Call {
            ret: take_dirent(call.ret),
            errno: call.errno,
        }
    }

    fn readdirplus(&mut self, st: &mut stat) -> Call<Option<dirent>> {
        let fd = self.as_raw();
        let call = capture(|| unsafe { glfs_readdirplus(fd, st) });
        Call {
            ret: take_dirent(call.ret),
            errno: call.errno,
        }
    }
}
