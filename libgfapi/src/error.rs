use std::ffi::NulError;
use std::io;

use nix::errno::Errno;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The primitive returned a failure code. `errno` is the last error
    /// captured with that call, or `UnknownErrno` if none was reported.
    #[error("{op} failed with code {code}: {errno}")]
    Call {
        op: &'static str,
        code: i64,
        errno: Errno,
    },

    /// A directory fetch reported an error. Fetches return an entry or
    /// nothing, so there is no code to carry.
    #[error("{op} failed: {errno}")]
    Fetch { op: &'static str, errno: Errno },

    #[error("{op} requires a non-empty buffer")]
    EmptyBuffer { op: &'static str },

    #[error("extended attribute value must not be empty")]
    EmptyValue,

    #[error("invalid extended attribute name: {0}")]
    InvalidName(#[from] NulError),

    #[error("seek offset {0} does not fit in off_t")]
    OffsetOverflow(u64),
}

impl Error {
    pub(crate) fn call(op: &'static str, code: i64, errno: Option<Errno>) -> Self {
        Error::Call {
            op,
            code,
            errno: errno.unwrap_or(Errno::UnknownErrno),
        }
    }

    /// Errno carried by a failed call, or `EINVAL` for rejected arguments.
    pub fn errno(&self) -> Errno {
        match self {
            Error::Call { errno, .. } | Error::Fetch { errno, .. } => *errno,
            Error::EmptyBuffer { .. }
            | Error::EmptyValue
            | Error::InvalidName(_)
            | Error::OffsetOverflow(_) => Errno::EINVAL,
        }
    }

    /// Raw return code of a failed call.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::Call { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Call { errno, .. } | Error::Fetch { errno, .. }
                if errno != Errno::UnknownErrno =>
            {
                io::Error::from_raw_os_error(errno as i32)
            }
            Error::Call { .. } | Error::Fetch { .. } => io::Error::other(e),
            _ => io::Error::new(io::ErrorKind::InvalidInput, e),
        }
    }
}
