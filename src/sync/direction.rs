//! Re-entrancy guard for synchronization.
//!
//! Only one synchronization runs at a time. A handler acquires the lock
//! for its direction and holds the returned guard; notifications that
//! arrive while it is held (for example the clipboard reporting our own
//! write) find the lock busy and are dropped. The guard resets the lock
//! to [`SyncDirection::Idle`] on every exit path, errors included.

use std::cell::Cell;

/// Which synchronization is in progress.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    #[default]
    Idle,
    ClipboardToBuffer,
    BufferToClipboard,
}

#[derive(Debug, Default)]
pub struct DirectionLock {
    current: Cell<SyncDirection>,
}

impl DirectionLock {
    pub fn current(&self) -> SyncDirection {
        self.current.get()
    }

    /// Claim the lock for `direction`. `None` if any synchronization
    /// is already running.
    pub fn try_acquire(&self, direction: SyncDirection) -> Option<DirectionGuard<'_>> {
        if self.current.get() != SyncDirection::Idle {
            return None;
        }
        self.current.set(direction);
        Some(DirectionGuard { lock: self })
    }
}

/// Held for the duration of one synchronization.
#[derive(Debug)]
pub struct DirectionGuard<'a> {
    lock: &'a DirectionLock,
}

impl Drop for DirectionGuard<'_> {
    fn drop(&mut self) {
        self.lock.current.set(SyncDirection::Idle);
    }
}
