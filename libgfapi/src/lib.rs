//! Descriptor layer for the GlusterFS gfapi client.
//!
//! An [`Fd`] owns one open remote file or directory and exposes POSIX-like
//! operations on it: positioned and positionless I/O, seek, allocate,
//! truncate, fsync, extended attributes and paginated directory listing.
//! The remote side is reached through the [`RawDescriptor`] trait; the
//! `glusterfs` feature provides the linked implementation in [`sys`], and
//! [`mem::MemDescriptor`] is an in-memory implementation for local testing.
#[macro_use]
extern crate log;

pub mod dirent;
mod error;
pub mod fd;
pub mod flags;
pub mod handle;
pub mod mem;
mod options;
pub mod stat;
pub mod sys;

pub use dirent::{DirEntry, FileType};
pub use error::{Error, Result};
pub use fd::{Entries, Fd, Whence};
pub use flags::{FallocateMode, StatMask, XattrFlags};
pub use handle::{Call, RawDescriptor};
pub use options::FdOptions;
pub use stat::Stat;
