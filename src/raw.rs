use crate::counts::Counted;
use crate::pointers::{RawStrong, RawWeak, Strong, Weak};

/// Strong-side operations on bare addresses.
///
/// For foreign code that can only carry a pointer. Every address here is
/// a strong unit that escaped through [`Strong::release`] or was minted by
/// [`retain`](strong::retain); each function briefly re-adopts the unit,
/// works through the handle, and puts the unit back.
pub mod strong
{
    use super::*;

    /// Mint one more strong unit on a live target's address.
    ///
    /// # Safety
    ///
    /// `ptr` is null, which does nothing, or points at a live managed
    /// target.
    pub unsafe fn retain<T: Counted + 'static>(ptr: *mut T)
    {
        if let Some(it) = ptr.as_ref() {
            it.counts().inc_strong();
        }
    }

    /// Spend one strong unit; the last one runs the teardown protocol.
    ///
    /// # Safety
    ///
    /// `ptr` is null, which does nothing, or carries exactly one strong
    /// unit owed by the caller.
    pub unsafe fn release<T: Counted + 'static>(ptr: *mut T)
    {
        drop(Strong::<T>::reclaim(RawStrong::from_addr(ptr)));
    }

    /// Mint a weak unit for the target of a strong address and return the
    /// address carrying it. The strong unit itself is untouched.
    ///
    /// # Safety
    ///
    /// `ptr` carries at least one strong unit held by the caller for the
    /// duration of the call.
    pub unsafe fn make_weak<T: Counted + 'static>(ptr: *mut T) -> *mut T
    {
        let it = Strong::<T>::reclaim(RawStrong::from_addr(ptr));
        let observer = it.alias();
        let _ = it.release();
        observer.release().into_addr()
    }

    /// Strong units on the target, 0 for null.
    ///
    /// # Safety
    ///
    /// `ptr` is null or points at a live managed target.
    pub unsafe fn use_count<T: Counted + 'static>(ptr: *mut T) -> usize
    {
        let it = Strong::<T>::reclaim(RawStrong::from_addr(ptr));
        let n = it.use_count();
        let _ = it.release();
        n
    }
}

/// Weak-side operations on bare addresses.
///
/// Every address here is a weak unit that escaped through
/// [`Weak::release`] or came out of [`strong::make_weak`].
pub mod weak
{
    use super::*;

    /// Mint one more weak unit on a weak address.
    ///
    /// # Safety
    ///
    /// `ptr` is null, which does nothing, or points at a managed target
    /// some weak unit still pins.
    pub unsafe fn retain<T: Counted + 'static>(ptr: *mut T)
    {
        if let Some(it) = ptr.as_ref() {
            it.counts().inc_weak();
        }
    }

    /// Spend one weak unit; the last one frees the allocation.
    ///
    /// # Safety
    ///
    /// `ptr` is null, which does nothing, or carries exactly one weak
    /// unit owed by the caller.
    pub unsafe fn release<T: Counted + 'static>(ptr: *mut T)
    {
        drop(Weak::<T>::reclaim(RawWeak::from_addr(ptr)));
    }

    /// Promote a weak address: null when the target has expired, otherwise
    /// the address back again, now carrying a fresh strong unit the caller
    /// owes.
    ///
    /// # Safety
    ///
    /// `ptr` is null or carries a weak unit held by the caller for the
    /// duration of the call.
    pub unsafe fn lock<T: Counted + 'static>(ptr: *mut T) -> *mut T
    {
        let it = Weak::<T>::reclaim(RawWeak::from_addr(ptr));
        let promoted = it.lock();
        let _ = it.release();
        promoted.release().into_addr()
    }

    /// Strong units seen through a weak address, 0 for null or expired.
    ///
    /// # Safety
    ///
    /// `ptr` is null or carries a weak unit held by the caller for the
    /// duration of the call.
    pub unsafe fn use_count<T: Counted + 'static>(ptr: *mut T) -> usize
    {
        let it = Weak::<T>::reclaim(RawWeak::from_addr(ptr));
        let n = it.use_count();
        let _ = it.release();
        n
    }
}
