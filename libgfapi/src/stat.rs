//! Extended file metadata and its conversion to and from `struct glfs_stat`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::flags::StatMask;
use crate::sys::{GlfsStat, Timespec};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Extended file metadata.
///
/// Only the fields named by `mask` are meaningful. Numeric fields are carried
/// with the widths the service uses and are never range checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub mask: StatMask,
    /// Filesystem-specific flags.
    pub attributes: u64,
    /// Which bits of `attributes` the filesystem supports.
    pub attributes_mask: u64,
    pub atime: SystemTime,
    pub btime: SystemTime,
    pub ctime: SystemTime,
    pub mtime: SystemTime,
    pub ino: u64,
    pub size: i64,
    /// Number of 512-byte blocks allocated.
    pub blocks: u64,
    /// Device identifiers, valid for block and character devices only.
    pub rdev_major: u32,
    pub rdev_minor: u32,
    /// Device containing the file.
    pub dev_major: u32,
    pub dev_minor: u32,
    /// Preferred I/O block size.
    pub blksize: i64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
}

impl Default for Stat {
    fn default() -> Self {
        Self {
            mask: StatMask::empty(),
            attributes: 0,
            attributes_mask: 0,
            atime: UNIX_EPOCH,
            btime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ino: 0,
            size: 0,
            blocks: 0,
            rdev_major: 0,
            rdev_minor: 0,
            dev_major: 0,
            dev_minor: 0,
            blksize: 0,
            nlink: 0,
            uid: 0,
            gid: 0,
            mode: 0,
        }
    }
}

impl Stat {
    /// Native record for a snapshot slot. No record in, no record out.
    pub fn to_native(stat: Option<&Stat>) -> Option<GlfsStat> {
        stat.map(GlfsStat::from)
    }

    pub fn from_native(st: &GlfsStat) -> Self {
        Self {
            mask: StatMask::from_bits_retain(st.glfs_st_mask),
            attributes: st.glfs_st_attributes,
            attributes_mask: st.glfs_st_attributes_mask,
            atime: from_timespec(&st.glfs_st_atime),
            btime: from_timespec(&st.glfs_st_btime),
            ctime: from_timespec(&st.glfs_st_ctime),
            mtime: from_timespec(&st.glfs_st_mtime),
            ino: st.glfs_st_ino as u64,
            size: st.glfs_st_size as i64,
            blocks: st.glfs_st_blocks as u64,
            rdev_major: st.glfs_st_rdev_major,
            rdev_minor: st.glfs_st_rdev_minor,
            dev_major: st.glfs_st_dev_major,
            dev_minor: st.glfs_st_dev_minor,
            blksize: st.glfs_st_blksize as i64,
            nlink: st.glfs_st_nlink as u64,
            uid: st.glfs_st_uid,
            gid: st.glfs_st_gid,
            mode: st.glfs_st_mode as u32,
        }
    }

    /// Record built from a plain `struct stat`, which has no creation time
    /// or attribute flags.
    pub fn from_stat(st: &libc::stat) -> Self {
        let time = |sec: libc::time_t, nsec: i64| {
            from_timespec(&Timespec {
                tv_sec: sec,
                tv_nsec: nsec as libc::c_long,
            })
        };
        Self {
            mask: StatMask::BASIC_STATS,
            atime: time(st.st_atime, st.st_atime_nsec as i64),
            ctime: time(st.st_ctime, st.st_ctime_nsec as i64),
            mtime: time(st.st_mtime, st.st_mtime_nsec as i64),
            ino: st.st_ino as u64,
            size: st.st_size as i64,
            blocks: st.st_blocks as u64,
            rdev_major: libc::major(st.st_rdev) as u32,
            rdev_minor: libc::minor(st.st_rdev) as u32,
            dev_major: libc::major(st.st_dev) as u32,
            dev_minor: libc::minor(st.st_dev) as u32,
            blksize: st.st_blksize as i64,
            nlink: st.st_nlink as u64,
            uid: st.st_uid,
            gid: st.st_gid,
            mode: st.st_mode as u32,
            ..Self::default()
        }
    }
}

impl From<&Stat> for GlfsStat {
    fn from(s: &Stat) -> Self {
        GlfsStat {
            glfs_st_mask: s.mask.bits(),
            glfs_st_attributes: s.attributes,
            glfs_st_attributes_mask: s.attributes_mask,
            glfs_st_atime: to_timespec(s.atime),
            glfs_st_btime: to_timespec(s.btime),
            glfs_st_ctime: to_timespec(s.ctime),
            glfs_st_mtime: to_timespec(s.mtime),
            glfs_st_ino: s.ino as libc::ino_t,
            glfs_st_size: s.size as libc::off_t,
            glfs_st_blocks: s.blocks as libc::blkcnt_t,
            glfs_st_rdev_major: s.rdev_major,
            glfs_st_rdev_minor: s.rdev_minor,
            glfs_st_dev_major: s.dev_major,
            glfs_st_dev_minor: s.dev_minor,
            glfs_st_blksize: s.blksize as libc::blksize_t,
            glfs_st_nlink: s.nlink as libc::nlink_t,
            glfs_st_uid: s.uid,
            glfs_st_gid: s.gid,
            glfs_st_mode: s.mode as libc::mode_t,
        }
    }
}

impl From<&GlfsStat> for Stat {
    fn from(st: &GlfsStat) -> Self {
        Stat::from_native(st)
    }
}

/// Seconds are floored, so `tv_nsec` is always in `0..1_000_000_000`, also
/// for times before the epoch.
pub(crate) fn to_timespec(t: SystemTime) -> Timespec {
    let (sec, nsec) = match t.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
        Err(e) => {
            let d = e.duration();
            let mut sec = -(d.as_secs() as i64);
            let mut nsec = d.subsec_nanos();
            if nsec > 0 {
                sec -= 1;
                nsec = NANOS_PER_SEC - nsec;
            }
            (sec, nsec)
        }
    };
    Timespec {
        tv_sec: sec as libc::time_t,
        tv_nsec: nsec as libc::c_long,
    }
}

pub(crate) fn from_timespec(ts: &Timespec) -> SystemTime {
    let sec = ts.tv_sec as i64;
    let whole = Duration::from_secs(sec.unsigned_abs());
    let base = if sec >= 0 {
        UNIX_EPOCH.checked_add(whole)
    } else {
        UNIX_EPOCH.checked_sub(whole)
    };
    let nsec = (ts.tv_nsec as i64).max(0) as u64;
    base.and_then(|t| t.checked_add(Duration::from_nanos(nsec)))
        .unwrap_or(UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(sec: u64, nsec: u32) -> SystemTime {
        UNIX_EPOCH + Duration::new(sec, nsec)
    }

    #[test]
    fn test_to_native_absent_record() {
        assert!(Stat::to_native(None).is_none());
    }

    #[test]
    fn test_atime_round_trip() {
        let stat = Stat {
            mask: StatMask::ATIME,
            atime: at(1_700_000_000, 123_456_789),
            ..Stat::default()
        };
        let native = Stat::to_native(Some(&stat)).unwrap();
        assert_eq!(native.glfs_st_atime.tv_sec, 1_700_000_000);
        assert_eq!(native.glfs_st_atime.tv_nsec, 123_456_789);
        assert_eq!(Stat::from_native(&native).atime, stat.atime);
    }

    #[test]
    fn test_every_field_survives_conversion() {
        let stat = Stat {
            mask: StatMask::BASIC_STATS | StatMask::BTIME,
            attributes: 0x20,
            attributes_mask: 0xff,
            atime: at(1, 2),
            btime: at(3, 4),
            ctime: at(5, 6),
            mtime: at(7, 8),
            ino: u64::MAX,
            size: -1,
            blocks: 16,
            rdev_major: 8,
            rdev_minor: 1,
            dev_major: 253,
            dev_minor: 7,
            blksize: 131_072,
            nlink: 2,
            uid: 1000,
            gid: 100,
            mode: libc::S_IFREG as u32 | 0o640,
        };
        let native = GlfsStat::from(&stat);
        assert_eq!(native.glfs_st_size, -1);
        assert_eq!(native.glfs_st_mtime.tv_sec, 7);
        assert_eq!(native.glfs_st_blksize, 131_072);
        assert_eq!(Stat::from(&native), stat);
    }

    #[test]
    fn test_pre_epoch_time_floors_seconds() {
        let t = UNIX_EPOCH - Duration::from_millis(500);
        let ts = to_timespec(t);
        assert_eq!(ts.tv_sec, -1);
        assert_eq!(ts.tv_nsec, 500_000_000);
        assert_eq!(from_timespec(&ts), t);

        let whole = UNIX_EPOCH - Duration::from_secs(10);
        let ts = to_timespec(whole);
        assert_eq!((ts.tv_sec, ts.tv_nsec), (-10, 0));
    }

    #[test]
    fn test_from_stat_sets_basic_mask() {
        let mut st = crate::sys::zeroed_stat();
        st.st_size = 4096;
        st.st_mode = libc::S_IFDIR | 0o755;
        st.st_mtime = 1_700_000_000;
        st.st_mtime_nsec = 5;
        st.st_dev = libc::makedev(8, 3);
        let stat = Stat::from_stat(&st);
        assert_eq!(stat.mask, StatMask::BASIC_STATS);
        assert_eq!(stat.size, 4096);
        assert_eq!(stat.mtime, at(1_700_000_000, 5));
        assert_eq!((stat.dev_major, stat.dev_minor), (8, 3));
        assert_eq!(stat.btime, UNIX_EPOCH);
    }
}
