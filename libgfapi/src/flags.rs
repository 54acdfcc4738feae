use bitflags::bitflags;

// Bits of `glfs_stat.glfs_st_mask`, see glfs.h.
const GLFS_STAT_TYPE: u64 = 0x0000_0001;
const GLFS_STAT_MODE: u64 = 0x0000_0002;
const GLFS_STAT_NLINK: u64 = 0x0000_0004;
const GLFS_STAT_UID: u64 = 0x0000_0008;
const GLFS_STAT_GID: u64 = 0x0000_0010;
const GLFS_STAT_ATIME: u64 = 0x0000_0020;
const GLFS_STAT_MTIME: u64 = 0x0000_0040;
const GLFS_STAT_CTIME: u64 = 0x0000_0080;
const GLFS_STAT_INO: u64 = 0x0000_0100;
const GLFS_STAT_SIZE: u64 = 0x0000_0200;
const GLFS_STAT_BLOCKS: u64 = 0x0000_0400;
const GLFS_STAT_BASIC_STATS: u64 = 0x0000_07ff;
const GLFS_STAT_BTIME: u64 = 0x0000_0800;

bitflags! {
    /// Which fields of a [`Stat`](crate::Stat) carry a value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatMask: u64 {
        /// File type bits of `mode`.
        const TYPE = GLFS_STAT_TYPE;
        /// Permission bits of `mode`.
        const MODE = GLFS_STAT_MODE;
        const NLINK = GLFS_STAT_NLINK;
        const UID = GLFS_STAT_UID;
        const GID = GLFS_STAT_GID;
        const ATIME = GLFS_STAT_ATIME;
        const MTIME = GLFS_STAT_MTIME;
        const CTIME = GLFS_STAT_CTIME;
        const INO = GLFS_STAT_INO;
        const SIZE = GLFS_STAT_SIZE;
        const BLOCKS = GLFS_STAT_BLOCKS;
        /// Everything a plain `struct stat` provides.
        const BASIC_STATS = GLFS_STAT_BASIC_STATS;
        /// Creation time.
        const BTIME = GLFS_STAT_BTIME;
    }
}

bitflags! {
    /// Create/replace semantics of `fsetxattr`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct XattrFlags: i32 {
        /// Fail with `EEXIST` if the attribute already exists.
        const CREATE = libc::XATTR_CREATE;
        /// Fail with `ENODATA` if the attribute does not exist.
        const REPLACE = libc::XATTR_REPLACE;
    }
}

bitflags! {
    /// Mode argument of `fallocate`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FallocateMode: i32 {
        /// Reserve space without changing the file size.
        const KEEP_SIZE = libc::FALLOC_FL_KEEP_SIZE;
        /// Deallocate the range; must be combined with `KEEP_SIZE`.
        const PUNCH_HOLE = libc::FALLOC_FL_PUNCH_HOLE;
        /// Zero the range, allocating it if needed.
        const ZERO_RANGE = libc::FALLOC_FL_ZERO_RANGE;
    }
}
