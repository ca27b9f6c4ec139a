//! Append-only file persistence
//!
//! Every accepted mutating command is appended to the log as a wire-format
//! frame, in the exact order it was applied to the keyspace. At startup the
//! log is replayed through the normal dispatch path to rebuild state.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How aggressively appended frames reach stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Sync after every append, before the command's reply is produced
    /// (safest, slowest).
    #[default]
    Always,
    /// Sync at most once per second (balanced).
    EverySecond,
    /// Let the OS decide when to sync (fastest, least safe).
    Os,
}

/// AOF configuration.
#[derive(Debug, Clone)]
pub struct AofConfig {
    /// Path to the log file.
    pub path: PathBuf,
    /// Sync policy for appends.
    pub sync_policy: SyncPolicy,
}

impl Default for AofConfig {
    fn default() -> Self {
        AofConfig {
            path: PathBuf::from("vexdb.aof"),
            sync_policy: SyncPolicy::default(),
        }
    }
}

/// Appends wire-format frames to the log file.
pub struct AofWriter {
    file: File,
    sync_policy: SyncPolicy,
    last_sync: Instant,
}

impl AofWriter {
    /// Open the log for appending, creating it if absent.
    pub fn open<P: AsRef<Path>>(path: P, sync_policy: SyncPolicy) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(AofWriter {
            file,
            sync_policy,
            last_sync: Instant::now(),
        })
    }

    /// Append one encoded frame and apply the sync policy.
    pub fn append(&mut self, frame: &[u8]) -> io::Result<()> {
        self.file.write_all(frame)?;
        self.file.flush()?;

        match self.sync_policy {
            SyncPolicy::Always => {
                self.file.sync_all()?;
                self.last_sync = Instant::now();
            }
            SyncPolicy::EverySecond => {
                if self.last_sync.elapsed() >= Duration::from_secs(1) {
                    self.file.sync_all()?;
                    self.last_sync = Instant::now();
                }
            }
            SyncPolicy::Os => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_append_creates_and_grows_file() {
        let path = "test_aof_writer.aof";
        let _ = fs::remove_file(path);

        let mut writer = AofWriter::open(path, SyncPolicy::Always).unwrap();
        writer.append(b"*1\r\n$4\r\nPING\r\n").unwrap();
        writer.append(b"*1\r\n$4\r\nPING\r\n").unwrap();

        let contents = fs::read(path).unwrap();
        assert_eq!(contents, b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n");

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_open_bad_path_fails() {
        assert!(AofWriter::open("no/such/dir/x.aof", SyncPolicy::Always).is_err());
    }
}
