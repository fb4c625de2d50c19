//! Host-lock discipline around blocking native work.
//!
//! A host runtime may serialize all of its threads behind one global lock.
//! Decode calls arrive with that lock held. Native parse/decode/convert work
//! runs with the lock released so other host threads can progress, and the
//! lock is held again whenever host-visible output is touched and when
//! control returns to the host.
//!
//! [`HostLock::unlocked`] is the only entry point. Implementations must
//! reacquire on every exit from `work`, including unwinding.

/// A host lock that can be released around a unit of blocking work.
pub trait HostLock {
    /// Run `work` with the host lock released, then reacquire it.
    fn unlocked<R, F: FnOnce() -> R>(&mut self, work: F) -> R;
}

/// No host runtime: work runs in place.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHostLock;

impl HostLock for NoHostLock {
    fn unlocked<R, F: FnOnce() -> R>(&mut self, work: F) -> R {
        work()
    }
}

/// A host modelled as a process-wide `parking_lot` mutex whose guard the
/// calling thread holds.
impl<T: ?Sized> HostLock for parking_lot::MutexGuard<'_, T> {
    fn unlocked<R, F: FnOnce() -> R>(&mut self, work: F) -> R {
        parking_lot::MutexGuard::unlocked(self, work)
    }
}

/// A lock exposed as a bare release/acquire pair, such as the save/restore
/// thread-state calls of an embedded interpreter.
pub trait RawHostLock {
    fn release(&mut self);
    fn acquire(&mut self);
}

/// Scoped release of a [`RawHostLock`]. Reacquires on drop.
pub struct Released<'a, L: RawHostLock + ?Sized> {
    lock: &'a mut L,
}

impl<'a, L: RawHostLock + ?Sized> Released<'a, L> {
    pub fn new(lock: &'a mut L) -> Self {
        lock.release();
        Self { lock }
    }
}

impl<L: RawHostLock + ?Sized> Drop for Released<'_, L> {
    fn drop(&mut self) {
        self.lock.acquire();
    }
}

/// Run `work` inside a [`Released`] scope.
pub fn run_released<L, R, F>(lock: &mut L, work: F) -> R
where
    L: RawHostLock + ?Sized,
    F: FnOnce() -> R,
{
    let _released = Released::new(lock);
    work()
}
