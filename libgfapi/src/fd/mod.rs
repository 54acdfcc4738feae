//! The descriptor handle and its operations.
//!
//! Every operation issues one primitive (readdir issues one per entry) and
//! turns its `Call` into a `Result` with one of two rules:
//! - negative code: failure, error taken from the captured last error;
//! - zero code (fallocate, fsetxattr, fremovexattr): success, and any
//!   captured last error is discarded.
//!
//! Submodules:
//! - `meta`: fchmod, fstat, fsync, ftruncate
//! - `xattr`: extended attributes
//! - `readdir`: paginated directory listing
mod meta;
mod readdir;
mod xattr;

use std::io;

use nix::errno::Errno;

pub use readdir::Entries;

use crate::error::{Error, Result};
use crate::flags::FallocateMode;
use crate::handle::RawDescriptor;
use crate::options::FdOptions;
use crate::stat::Stat;
use crate::sys::GlfsStat;

/// Origin for [`Fd::lseek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    pub fn as_raw(self) -> i32 {
        match self {
            Whence::Start => libc::SEEK_SET,
            Whence::Current => libc::SEEK_CUR,
            Whence::End => libc::SEEK_END,
        }
    }
}

/// One open remote file or directory.
///
/// The read/write position and the directory cursor live on the service
/// side. All operations take `&mut self`: calls through one handle must not
/// interleave.
pub struct Fd<D: RawDescriptor> {
    raw: D,
    options: FdOptions,
}

impl<D: RawDescriptor> Fd<D> {
    pub fn new(raw: D) -> Self {
        Self::with_options(raw, FdOptions::default())
    }

    pub fn with_options(raw: D, options: FdOptions) -> Self {
        Self { raw, options }
    }

    pub fn options(&self) -> &FdOptions {
        &self.options
    }

    pub fn get_ref(&self) -> &D {
        &self.raw
    }

    pub fn get_mut(&mut self) -> &mut D {
        &mut self.raw
    }

    pub fn into_inner(self) -> D {
        self.raw
    }

    /// Read up to `buf.len()` bytes at the current position; 0 is end of
    /// file. An empty `buf` still reaches the service.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len();
        trace!("read len={len}");
        let call = self.raw.read(buf, self.options.io_flags);
        let n = negative_is_error("read", call.ret as i64, call.errno)?;
        Ok(bounded(n, len))
    }

    /// Write `buf` at the current position. An empty `buf` still reaches
    /// the service.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let len = buf.len();
        trace!("write len={len}");
        let call = self.raw.write(buf, self.options.io_flags);
        let n = negative_is_error("write", call.ret as i64, call.errno)?;
        Ok(bounded(n, len))
    }

    /// Read up to `buf.len()` bytes at `offset`. `buf` must not be empty.
    pub fn pread(&mut self, buf: &mut [u8], offset: i64) -> Result<usize> {
        self.pread_stat(buf, offset, None)
    }

    /// [`pread`](Self::pread) that also returns the attributes after the
    /// read in `poststat`.
    pub fn pread_stat(
        &mut self,
        buf: &mut [u8],
        offset: i64,
        poststat: Option<&mut Stat>,
    ) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::EmptyBuffer { op: "pread" });
        }
        let len = buf.len();
        trace!("pread len={len} offset={offset}");
        let mut post = Stat::to_native(poststat.as_deref());
        let call = self
            .raw
            .pread(buf, offset, self.options.io_flags, post.as_mut());
        let n = negative_is_error("pread", call.ret as i64, call.errno)?;
        store_snapshot(poststat, post);
        Ok(bounded(n, len))
    }

    /// Write `buf` at `offset`. `buf` must not be empty. When given,
    /// `prestat` and `poststat` receive the attributes from just before and
    /// just after the write.
    pub fn pwrite(
        &mut self,
        buf: &[u8],
        offset: i64,
        prestat: Option<&mut Stat>,
        poststat: Option<&mut Stat>,
    ) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::EmptyBuffer { op: "pwrite" });
        }
        let len = buf.len();
        trace!("pwrite len={len} offset={offset}");
        let mut pre = Stat::to_native(prestat.as_deref());
        let mut post = Stat::to_native(poststat.as_deref());
        let call = self.raw.pwrite(
            buf,
            offset,
            self.options.io_flags,
            pre.as_mut(),
            post.as_mut(),
        );
        let n = negative_is_error("pwrite", call.ret as i64, call.errno)?;
        store_snapshot(prestat, pre);
        store_snapshot(poststat, post);
        Ok(bounded(n, len))
    }

    /// Move the current position; returns the new offset from the start.
    pub fn lseek(&mut self, offset: i64, whence: Whence) -> Result<i64> {
        trace!("lseek offset={offset} whence={whence:?}");
        let call = self.raw.lseek(offset, whence.as_raw());
        negative_is_error("lseek", call.ret, call.errno)
    }

    /// Allocate or deallocate `len` bytes at `offset`.
    pub fn fallocate(&mut self, mode: FallocateMode, offset: i64, len: usize) -> Result<()> {
        trace!("fallocate mode={mode:?} offset={offset} len={len}");
        let call = self.raw.fallocate(mode.bits(), offset, len);
        zero_is_success("fallocate", call.ret as i64, call.errno)
    }
}

impl<D: RawDescriptor> io::Read for Fd<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Fd::read(self, buf).map_err(Into::into)
    }
}

impl<D: RawDescriptor> io::Write for Fd<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Fd::write(self, buf).map_err(Into::into)
    }

    // Writes are not buffered here; durability is `fsync`.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<D: RawDescriptor> io::Seek for Fd<D> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => {
                let n = i64::try_from(n).map_err(|_| Error::OffsetOverflow(n))?;
                (n, Whence::Start)
            }
            io::SeekFrom::Current(n) => (n, Whence::Current),
            io::SeekFrom::End(n) => (n, Whence::End),
        };
        let new = self.lseek(offset, whence)?;
        Ok(new as u64)
    }
}

/// Counts never exceed what was asked for.
fn bounded(n: i64, len: usize) -> usize {
    usize::try_from(n).map_or(len, |n| n.min(len))
}

pub(crate) fn negative_is_error(
    op: &'static str,
    code: i64,
    errno: Option<Errno>,
) -> Result<i64> {
    if code < 0 {
        return Err(Error::call(op, code, errno));
    }
    Ok(code)
}

pub(crate) fn zero_is_success(op: &'static str, code: i64, errno: Option<Errno>) -> Result<()> {
    if code == 0 {
        if let Some(stale) = errno {
            debug!("{op}: discarding stale errno {stale} on success");
        }
        return Ok(());
    }
    Err(Error::call(op, code, errno))
}

/// Replace the caller's snapshot with the record the service filled in.
pub(crate) fn store_snapshot(slot: Option<&mut Stat>, native: Option<GlfsStat>) {
    if let (Some(slot), Some(native)) = (slot, native) {
        *slot = Stat::from_native(&native);
    }
}
