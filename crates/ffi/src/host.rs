use std::ffi::c_void;

use mc_common::host::{run_released, RawHostLock};
use mc_common::HostLock;

use crate::Error;

/// A host's global lock as a release/acquire callback pair, for example an
/// interpreter's save-thread and restore-thread calls.
#[repr(C)]
pub struct McHostLock {
    pub user_data: *mut c_void,
    pub release: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
    pub acquire: Option<unsafe extern "C" fn(user_data: *mut c_void)>,
}

/// Validated [`McHostLock`]. The calling thread holds the lock on entry.
pub struct CallbackLock {
    user_data: *mut c_void,
    release: unsafe extern "C" fn(user_data: *mut c_void),
    acquire: unsafe extern "C" fn(user_data: *mut c_void),
}

impl CallbackLock {
    /// Null means the host has no lock to release.
    ///
    /// # Safety
    ///
    /// `lock` must be null or point to a valid [`McHostLock`] whose callbacks
    /// stay callable for the duration of the current call.
    pub unsafe fn from_raw(lock: *const McHostLock) -> Result<Option<Self>, Error> {
        let Some(lock) = (unsafe { lock.as_ref() }) else {
            return Ok(None);
        };

        match (lock.release, lock.acquire) {
            (Some(release), Some(acquire)) => Ok(Some(Self {
                user_data: lock.user_data,
                release,
                acquire,
            })),
            _ => Err(Error::InvalidHostLock),
        }
    }
}

impl RawHostLock for CallbackLock {
    fn release(&mut self) {
        unsafe { (self.release)(self.user_data) }
    }

    fn acquire(&mut self) {
        unsafe { (self.acquire)(self.user_data) }
    }
}

impl HostLock for CallbackLock {
    fn unlocked<R, F: FnOnce() -> R>(&mut self, work: F) -> R {
        run_released(self, work)
    }
}
