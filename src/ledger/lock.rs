// brutility/src/ledger/lock.rs
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{AppError, Result};

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Exclusive lock over the ledger file, held for one read-modify-write cycle.
///
/// The lock file holds the owner's pid. A lock whose pid no longer exists is
/// treated as abandoned and reclaimed. Dropping the guard releases the lock.
#[derive(Debug)]
pub struct LedgerLock {
    path: PathBuf,
}

impl LedgerLock {
    pub fn acquire(ledger_path: &Path) -> Result<Self> {
        let lock_path = lock_path_for(ledger_path);
        for attempt in 0..LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
                Ok(mut f) => {
                    writeln!(f, "{}", std::process::id())?;
                    debug!(lock = %lock_path.display(), "acquired ledger lock");
                    return Ok(LedgerLock { path: lock_path });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if reclaim_if_abandoned(&lock_path)? {
                        continue;
                    }
                    debug!(attempt, lock = %lock_path.display(), "ledger lock busy, retrying");
                    thread::sleep(LOCK_RETRY_DELAY);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(AppError::LedgerLocked {
            ledger: ledger_path.to_path_buf(),
            lock: lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let owner = fs::read_to_string(&self.path).ok();
        if owner.as_deref().map(str::trim) != Some(std::process::id().to_string().as_str()) {
            warn!(lock = %self.path.display(), ?owner, "ledger lock no longer ours, leaving it in place");
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release ledger lock");
        }
    }
}

pub fn lock_path_for(ledger_path: &Path) -> PathBuf {
    let mut name = ledger_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Removes the lock file when its owner pid is gone. Returns true if the
/// caller should retry immediately.
///
/// Not atomic: another process may reclaim the same lock and create a fresh
/// one between the pid read and `remove_file`, and that fresh lock is then
/// deleted here.
fn reclaim_if_abandoned(lock_path: &Path) -> Result<bool> {
    let pid = match fs::read_to_string(lock_path) {
        Ok(text) => text.trim().parse::<u32>().ok(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(err) => return Err(err.into()),
    };
    let owner_alive = match pid {
        Some(pid) => process_alive(pid),
        // Another process may be between create and write.
        None => return Ok(false),
    };
    if owner_alive {
        return Ok(false);
    }
    warn!(lock = %lock_path.display(), ?pid, "reclaiming abandoned ledger lock");
    match fs::remove_file(lock_path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(err) => Err(err.into()),
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without /proc there is no cheap liveness check; never reclaim.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}
