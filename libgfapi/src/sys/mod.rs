//! Native gfapi layout and, with the `glusterfs` feature, the linked binding.
//!
//! `GlfsStat` mirrors `struct glfs_stat` from `glusterfs/api/glfs.h`
//! field for field, so it can be handed to the library by pointer.

#[cfg(feature = "glusterfs")]
mod glfs;

#[cfg(feature = "glusterfs")]
pub use glfs::{GlfsFd, glfs_fd_t};

/// `struct timespec`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespec {
    pub tv_sec: libc::time_t,
    pub tv_nsec: libc::c_long,
}

/// `struct glfs_stat`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlfsStat {
    pub glfs_st_mask: u64,
    pub glfs_st_attributes: u64,
    pub glfs_st_attributes_mask: u64,
    pub glfs_st_atime: Timespec,
    pub glfs_st_btime: Timespec,
    pub glfs_st_ctime: Timespec,
    pub glfs_st_mtime: Timespec,
    pub glfs_st_ino: libc::ino_t,
    pub glfs_st_size: libc::off_t,
    pub glfs_st_blocks: libc::blkcnt_t,
    pub glfs_st_rdev_major: u32,
    pub glfs_st_rdev_minor: u32,
    pub glfs_st_dev_major: u32,
    pub glfs_st_dev_minor: u32,
    pub glfs_st_blksize: libc::blksize_t,
    pub glfs_st_nlink: libc::nlink_t,
    pub glfs_st_uid: libc::uid_t,
    pub glfs_st_gid: libc::gid_t,
    pub glfs_st_mode: libc::mode_t,
}

/// A zeroed `struct stat`, ready to be filled by fstat or readdirplus.
pub fn zeroed_stat() -> libc::stat {
    // SAFETY: `struct stat` is plain integers; all-zero is a valid value.
    unsafe { std::mem::zeroed() }
}

/// A zeroed `struct dirent`.
pub fn zeroed_dirent() -> libc::dirent {
    // SAFETY: `struct dirent` is integers and a byte array.
    unsafe { std::mem::zeroed() }
}
