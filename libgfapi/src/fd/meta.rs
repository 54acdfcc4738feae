use crate::error::Result;
use crate::handle::RawDescriptor;
use crate::stat::Stat;
use crate::sys::zeroed_stat;

use super::{Fd, negative_is_error, store_snapshot};

impl<D: RawDescriptor> Fd<D> {
    /// Change the permission bits.
    pub fn fchmod(&mut self, mode: u32) -> Result<()> {
        trace!("fchmod mode={mode:o}");
        let call = self.raw.fchmod(mode);
        negative_is_error("fchmod", call.ret as i64, call.errno).map(drop)
    }

    /// Attributes of the open file as a plain `struct stat`.
    pub fn fstat(&mut self) -> Result<libc::stat> {
        trace!("fstat");
        let mut st = zeroed_stat();
        let call = self.raw.fstat(&mut st);
        negative_is_error("fstat", call.ret as i64, call.errno)?;
        Ok(st)
    }

    /// Flush to stable storage. Snapshot slots are handed to the service
    /// as they are.
    pub fn fsync(
        &mut self,
        prestat: Option<&mut Stat>,
        poststat: Option<&mut Stat>,
    ) -> Result<()> {
        trace!("fsync");
        let mut pre = Stat::to_native(prestat.as_deref());
        let mut post = Stat::to_native(poststat.as_deref());
        let call = self.raw.fsync(pre.as_mut(), post.as_mut());
        negative_is_error("fsync", call.ret as i64, call.errno)?;
        store_snapshot(prestat, pre);
        store_snapshot(poststat, post);
        Ok(())
    }

    /// Set the file length to `size`.
    pub fn ftruncate(
        &mut self,
        size: i64,
        prestat: Option<&mut Stat>,
        poststat: Option<&mut Stat>,
    ) -> Result<()> {
        trace!("ftruncate size={size}");
        let mut pre = Stat::to_native(prestat.as_deref());
        let mut post = Stat::to_native(poststat.as_deref());
        let call = self.raw.ftruncate(size, pre.as_mut(), post.as_mut());
        negative_is_error("ftruncate", call.ret as i64, call.errno)?;
        store_snapshot(prestat, pre);
        store_snapshot(poststat, post);
        Ok(())
    }
}
