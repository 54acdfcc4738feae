use std::ffi::CString;

use crate::error::{Error, Result};
use crate::flags::XattrFlags;
use crate::handle::RawDescriptor;

use super::{Fd, zero_is_success};

impl<D: RawDescriptor> Fd<D> {
    /// Read attribute `name` into `dest` and return its length.
    ///
    /// An empty `dest` asks only for the length: the service is called with
    /// a null target and size 0.
    pub fn fgetxattr(&mut self, name: &str, dest: &mut [u8]) -> Result<usize> {
        let cname = CString::new(name)?;
        trace!("fgetxattr name={name} len={}", dest.len());
        let target = if dest.is_empty() { None } else { Some(dest) };
        let call = self.raw.fgetxattr(&cname, target);
        if call.ret >= 0 {
            return Ok(call.ret as usize);
        }
        Err(Error::call("fgetxattr", call.ret as i64, call.errno))
    }

    /// Set attribute `name` to `value`, which must not be empty.
    pub fn fsetxattr(&mut self, name: &str, value: &[u8], flags: XattrFlags) -> Result<()> {
        if value.is_empty() {
            return Err(Error::EmptyValue);
        }
        let cname = CString::new(name)?;
        trace!("fsetxattr name={name} len={} flags={flags:?}", value.len());
        let call = self.raw.fsetxattr(&cname, value, flags.bits());
        zero_is_success("fsetxattr", call.ret as i64, call.errno)
    }

    pub fn fremovexattr(&mut self, name: &str) -> Result<()> {
        let cname = CString::new(name)?;
        trace!("fremovexattr name={name}");
        let call = self.raw.fremovexattr(&cname);
        zero_is_success("fremovexattr", call.ret as i64, call.errno)
    }
}
