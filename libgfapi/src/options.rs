use serde::{Deserialize, Serialize};

const DEFAULT_READDIR_BATCH: usize = 128;

/// Per-descriptor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FdOptions {
    /// Flags forwarded to read, write, pread and pwrite.
    pub io_flags: i32,
    /// Entries fetched per page by [`Fd::entries`](crate::Fd::entries).
    /// 0 fetches the whole listing in one call.
    pub readdir_batch: usize,
}

impl Default for FdOptions {
    fn default() -> Self {
        Self {
            io_flags: 0,
            readdir_batch: DEFAULT_READDIR_BATCH,
        }
    }
}

impl FdOptions {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
