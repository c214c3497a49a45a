use std::{
    cmp,
    fmt,
    hash::{self, Hasher},
    marker::PhantomData,
    ops::Deref,
};

use crate::counts::Counted;
use crate::enforce::enforce;
use crate::null::{Nil, Null};
use crate::stats;

/// Shared-ownership handle to a [`Counted`] target.
///
/// A `Strong` is one word: the target's address. The counters live inside
/// the target, so there is no separate control block, cloning is a single
/// atomic increment, and a handle can be rebuilt from an address that
/// crossed a foreign boundary. When the last strong unit is spent the
/// target's [`teardown`](Counted::teardown) hook runs; the allocation
/// itself survives until the last [`Weak`] is gone too.
///
/// The policy parameter `N` picks the address that stands for "no target".
/// Under the default [`Nil`] that is null and dereferencing an absent
/// handle panics; a singleton policy makes the empty state dereferenceable
/// instead.
#[repr(transparent)]
pub struct Strong<T: Counted + 'static, N: Null<T> = Nil>
{
    ptr: *mut T,
    _null: PhantomData<N>,
}

unsafe impl<T: Counted + Send + Sync + 'static, N: Null<T>> Send for Strong<T, N> {}
unsafe impl<T: Counted + Send + Sync + 'static, N: Null<T>> Sync for Strong<T, N> {}

impl<T: Counted + 'static> Strong<T>
{
    /// Move `it` to the heap and take ownership of it.
    ///
    /// The value must be fresh: a constructor that hands out references to
    /// itself leaves nonzero counters behind, and that is fatal here.
    pub fn new(it: T) -> Self { Self::with_policy(it) }
}

impl<T: Counted + 'static, N: Null<T>> Strong<T, N>
{
    /// [`new`](Strong::new) with the null policy chosen by the caller;
    /// the same freshness contract applies.
    pub fn with_policy(it: T) -> Self
    {
        let ptr = Box::into_raw(Box::new(it));
        let counts = unsafe { &*ptr }.counts();
        enforce!(
            counts.strong() == 0 && counts.weak() == 0,
            "a freshly made target already has references; its constructor must not hand out handles to itself"
        );
        counts.prime();
        stats::made::<T>();
        Strong {
            ptr,
            _null: PhantomData,
        }
    }

    /// The empty handle: carries the policy's sentinel, owns nothing.
    pub fn absent() -> Self
    {
        Strong {
            ptr: N::sentinel(),
            _null: PhantomData,
        }
    }

    /// Whether this handle refers to a target at all.
    pub fn is_present(&self) -> bool { self.ptr != N::sentinel() }

    /// Borrow the target, or `None` from an absent handle.
    pub fn get(&self) -> Option<&T>
    {
        if self.is_present() {
            Some(unsafe { &*self.ptr })
        } else {
            None
        }
    }

    /// The raw address, sentinel included. No unit changes custody.
    pub fn as_ptr(&self) -> *mut T { self.ptr }

    /// Strong units on the target, 0 for an absent handle.
    pub fn use_count(&self) -> usize
    {
        if self.is_present() {
            unsafe { &*self.ptr }.counts().strong()
        } else {
            0
        }
    }

    /// Weak units on the target, 0 for an absent handle. While any strong
    /// unit lives this includes the phantom unit, so it reads one more
    /// than the number of weak handles.
    pub fn weak_use_count(&self) -> usize
    {
        if self.is_present() {
            unsafe { &*self.ptr }.counts().weak()
        } else {
            0
        }
    }

    /// Whether this is the only strong unit.
    pub fn is_unique(&self) -> bool { self.use_count() == 1 }

    /// Mint a weak observer of the target. Absent handles alias to absent.
    pub fn alias(&self) -> Weak<T, N>
    {
        if self.is_present() {
            unsafe { &*self.ptr }.counts().inc_weak();
        }
        Weak {
            ptr: self.ptr,
            _null: PhantomData,
        }
    }

    /// Spend the strong unit now and become absent.
    pub fn reset(&mut self)
    {
        self.drop_unit();
        self.ptr = N::sentinel();
    }

    /// Escape: forget the handle and move its strong unit into a token.
    /// The counters do not move. The unit sits in the token's custody
    /// until [`Strong::reclaim`] re-adopts it; dropping the token leaks
    /// the unit, and with it the target.
    pub fn release(self) -> RawStrong<T, N>
    {
        let ptr = self.ptr;
        std::mem::forget(self);
        RawStrong {
            ptr,
            _null: PhantomData,
        }
    }

    /// Re-adopt an escaped strong unit. The counters do not move; the
    /// token's unit simply has an owner again.
    pub fn reclaim(raw: RawStrong<T, N>) -> Self
    {
        Strong {
            ptr: raw.ptr,
            _null: PhantomData,
        }
    }

    /// Adopt a target something else is known to keep alive, minting a new
    /// strong unit for it. The sentinel address yields an absent handle;
    /// a dead target is fatal.
    ///
    /// # Safety
    ///
    /// `ptr` is the sentinel, which carries nothing, or points at a live
    /// managed target; in the latter case the unit keeping it alive must
    /// stay held for the duration of this call.
    pub unsafe fn reclaim_nonowning(ptr: *mut T) -> Self
    {
        if ptr != N::sentinel() {
            let counts = (*ptr).counts();
            enforce!(
                counts.strong() > 0,
                "cannot adopt a target that no strong unit is keeping alive"
            );
            counts.inc_strong();
        }
        Strong {
            ptr,
            _null: PhantomData,
        }
    }

    /// The strong half of the teardown protocol.
    fn drop_unit(&mut self)
    {
        if !self.is_present() {
            return;
        }
        let counts = unsafe { &*self.ptr }.counts();
        if counts.dec_strong() == 0 {
            unsafe { &*self.ptr }.teardown();
            stats::torn::<T>();
            // With the strong count at zero no new weak unit can appear,
            // so a lone remaining unit is the phantom one and nobody can
            // be racing us for the free.
            if counts.weak() == 1 || counts.dec_weak() == 0 {
                stats::freed::<T>();
                drop(unsafe { Box::from_raw(self.ptr) });
            }
        }
    }
}

impl<T: Counted + 'static, N: Null<T>> Clone for Strong<T, N>
{
    fn clone(&self) -> Self
    {
        if self.is_present() {
            unsafe { &*self.ptr }.counts().inc_strong();
        }
        Strong {
            ptr: self.ptr,
            _null: PhantomData,
        }
    }
}

impl<T: Counted + 'static, N: Null<T>> Drop for Strong<T, N>
{
    fn drop(&mut self) { self.drop_unit(); }
}

impl<T: Counted + 'static, N: Null<T>> Deref for Strong<T, N>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match unsafe { self.ptr.as_ref() } {
            Some(it) => it,
            None => panic!("dereferenced an absent handle"),
        }
    }
}

impl<T: Counted + 'static, N: Null<T>> Default for Strong<T, N>
{
    fn default() -> Self { Strong::absent() }
}

impl<T: Counted + 'static, N: Null<T>> PartialEq for Strong<T, N>
{
    /// Address identity, not value equality. Two absent handles under one
    /// policy share the sentinel and are equal.
    fn eq(&self, other: &Self) -> bool { self.ptr == other.ptr }
}

impl<T: Counted + 'static, N: Null<T>> Eq for Strong<T, N> {}

impl<T: Counted + 'static, N: Null<T>> PartialOrd for Strong<T, N>
{
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { Some(self.cmp(other)) }
}

impl<T: Counted + 'static, N: Null<T>> Ord for Strong<T, N>
{
    fn cmp(&self, other: &Self) -> cmp::Ordering { self.ptr.cmp(&other.ptr) }
}

impl<T: Counted + 'static, N: Null<T>> hash::Hash for Strong<T, N>
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.ptr.hash(state) }
}

impl<T: Counted + 'static, N: Null<T>> fmt::Debug for Strong<T, N>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Strong")
            .field("ptr", &self.ptr)
            .field("strong", &self.use_count())
            .field("weak", &self.weak_use_count())
            .finish()
    }
}

/// Observing handle: keeps the allocation alive, not the target's
/// resources.
///
/// A `Weak` never dereferences. It answers liveness questions and promotes
/// to a [`Strong`] through [`lock`](Weak::lock) while the target is alive.
/// Its unit pins the allocation so the address stays valid to ask about,
/// which is the whole service a weak handle provides.
#[repr(transparent)]
pub struct Weak<T: Counted + 'static, N: Null<T> = Nil>
{
    ptr: *mut T,
    _null: PhantomData<N>,
}

unsafe impl<T: Counted + Send + Sync + 'static, N: Null<T>> Send for Weak<T, N> {}
unsafe impl<T: Counted + Send + Sync + 'static, N: Null<T>> Sync for Weak<T, N> {}

impl<T: Counted + 'static, N: Null<T>> Weak<T, N>
{
    /// The empty handle: carries the policy's sentinel, observes nothing.
    pub fn absent() -> Self
    {
        Weak {
            ptr: N::sentinel(),
            _null: PhantomData,
        }
    }

    /// Whether this handle refers to a target at all, expired or not.
    pub fn is_present(&self) -> bool { self.ptr != N::sentinel() }

    /// Promote to shared ownership.
    ///
    /// Returns the absent handle once the target's strong count has
    /// reached zero. The promotion never revives a target whose teardown
    /// hook is due: it either raises a count that was still positive or
    /// observes the zero and gives up.
    pub fn lock(&self) -> Strong<T, N>
    {
        if self.is_expired() {
            return Strong::absent();
        }
        if unsafe { &*self.ptr }.counts().try_promote() {
            Strong {
                ptr: self.ptr,
                _null: PhantomData,
            }
        } else {
            Strong::absent()
        }
    }

    /// Whether the target's strong count has reached zero. Absent handles
    /// are expired.
    pub fn is_expired(&self) -> bool { self.use_count() == 0 }

    /// Strong units on the target, 0 when absent or expired.
    pub fn use_count(&self) -> usize
    {
        if self.is_present() {
            unsafe { &*self.ptr }.counts().strong()
        } else {
            0
        }
    }

    /// Weak units on the target, phantom unit included, 0 when absent.
    pub fn weak_use_count(&self) -> usize
    {
        if self.is_present() {
            unsafe { &*self.ptr }.counts().weak()
        } else {
            0
        }
    }

    /// The raw address, sentinel included. Useful for identity; never for
    /// access.
    pub fn as_ptr(&self) -> *mut T { self.ptr }

    /// Spend the weak unit now and become absent.
    pub fn reset(&mut self)
    {
        self.drop_unit();
        self.ptr = N::sentinel();
    }

    /// Escape: forget the handle and move its weak unit into a token. The
    /// counters do not move. Dropping the token leaks the unit, and with
    /// it the allocation.
    pub fn release(self) -> RawWeak<T, N>
    {
        let ptr = self.ptr;
        std::mem::forget(self);
        RawWeak {
            ptr,
            _null: PhantomData,
        }
    }

    /// Re-adopt an escaped weak unit. Fatal if the target's counters show
    /// no weak unit can be outstanding.
    pub fn reclaim(raw: RawWeak<T, N>) -> Self
    {
        if raw.ptr != N::sentinel() {
            let counts = unsafe { &*raw.ptr }.counts();
            enforce!(
                counts.weak() > 1 || (counts.strong() == 0 && counts.weak() > 0),
                "reclaimed a weak address whose counters show no escaped weak unit"
            );
        }
        Weak {
            ptr: raw.ptr,
            _null: PhantomData,
        }
    }

    fn drop_unit(&mut self)
    {
        if !self.is_present() {
            return;
        }
        if unsafe { &*self.ptr }.counts().dec_weak() == 0 {
            stats::freed::<T>();
            drop(unsafe { Box::from_raw(self.ptr) });
        }
    }
}

impl<T: Counted + 'static, N: Null<T>> Clone for Weak<T, N>
{
    fn clone(&self) -> Self
    {
        if self.is_present() {
            unsafe { &*self.ptr }.counts().inc_weak();
        }
        Weak {
            ptr: self.ptr,
            _null: PhantomData,
        }
    }
}

impl<T: Counted + 'static, N: Null<T>> Drop for Weak<T, N>
{
    fn drop(&mut self) { self.drop_unit(); }
}

impl<T: Counted + 'static, N: Null<T>> Default for Weak<T, N>
{
    fn default() -> Self { Weak::absent() }
}

impl<T: Counted + 'static, N: Null<T>> PartialEq for Weak<T, N>
{
    fn eq(&self, other: &Self) -> bool { self.ptr == other.ptr }
}

impl<T: Counted + 'static, N: Null<T>> Eq for Weak<T, N> {}

impl<T: Counted + 'static, N: Null<T>> PartialOrd for Weak<T, N>
{
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { Some(self.cmp(other)) }
}

impl<T: Counted + 'static, N: Null<T>> Ord for Weak<T, N>
{
    fn cmp(&self, other: &Self) -> cmp::Ordering { self.ptr.cmp(&other.ptr) }
}

impl<T: Counted + 'static, N: Null<T>> hash::Hash for Weak<T, N>
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.ptr.hash(state) }
}

impl<T: Counted + 'static, N: Null<T>> fmt::Debug for Weak<T, N>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Weak")
            .field("ptr", &self.ptr)
            .field("strong", &self.use_count())
            .field("weak", &self.weak_use_count())
            .finish()
    }
}

/// An escaped strong unit in transit through foreign custody.
///
/// Minted by [`Strong::release`], spent by [`Strong::reclaim`], exactly
/// once each. The token neither copies nor drops its unit: letting one
/// fall on the floor leaks the target, which is the honest outcome when
/// nothing reclaims it. For a true FFI edge,
/// [`into_addr`](RawStrong::into_addr) lowers to a bare pointer and
/// [`from_addr`](RawStrong::from_addr) raises it back.
#[must_use]
#[repr(transparent)]
pub struct RawStrong<T: Counted + 'static, N: Null<T> = Nil>
{
    ptr: *mut T,
    _null: PhantomData<N>,
}

unsafe impl<T: Counted + Send + Sync + 'static, N: Null<T>> Send for RawStrong<T, N> {}
unsafe impl<T: Counted + Send + Sync + 'static, N: Null<T>> Sync for RawStrong<T, N> {}

impl<T: Counted + 'static, N: Null<T>> RawStrong<T, N>
{
    /// The address carried, without giving up the unit.
    pub fn addr(&self) -> *mut T { self.ptr }

    /// Lower to a bare address. The unit is now tracked by nothing; only
    /// [`RawStrong::from_addr`] on this address balances it.
    pub fn into_addr(self) -> *mut T { self.ptr }

    /// Raise a token back from a bare address.
    ///
    /// # Safety
    ///
    /// `ptr` must carry exactly one escaped strong unit: it came from
    /// [`RawStrong::into_addr`], or from a foreign retain, and has not
    /// been reclaimed since. The sentinel address is fine and carries
    /// nothing.
    pub unsafe fn from_addr(ptr: *mut T) -> Self
    {
        RawStrong {
            ptr,
            _null: PhantomData,
        }
    }
}

impl<T: Counted + 'static, N: Null<T>> fmt::Debug for RawStrong<T, N>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("RawStrong").field("ptr", &self.ptr).finish()
    }
}

/// An escaped weak unit in transit through foreign custody.
///
/// The weak counterpart of [`RawStrong`]: minted by [`Weak::release`],
/// spent by [`Weak::reclaim`], exactly once each, and a dropped token
/// leaks its unit along with the allocation it pins.
#[must_use]
#[repr(transparent)]
pub struct RawWeak<T: Counted + 'static, N: Null<T> = Nil>
{
    ptr: *mut T,
    _null: PhantomData<N>,
}

unsafe impl<T: Counted + Send + Sync + 'static, N: Null<T>> Send for RawWeak<T, N> {}
unsafe impl<T: Counted + Send + Sync + 'static, N: Null<T>> Sync for RawWeak<T, N> {}

impl<T: Counted + 'static, N: Null<T>> RawWeak<T, N>
{
    /// The address carried, without giving up the unit.
    pub fn addr(&self) -> *mut T { self.ptr }

    /// Lower to a bare address. Only [`RawWeak::from_addr`] on this
    /// address balances it.
    pub fn into_addr(self) -> *mut T { self.ptr }

    /// Raise a token back from a bare address.
    ///
    /// # Safety
    ///
    /// `ptr` must carry exactly one escaped weak unit, and it has not been
    /// reclaimed since it escaped. The sentinel address is fine and
    /// carries nothing.
    pub unsafe fn from_addr(ptr: *mut T) -> Self
    {
        RawWeak {
            ptr,
            _null: PhantomData,
        }
    }
}

impl<T: Counted + 'static, N: Null<T>> fmt::Debug for RawWeak<T, N>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("RawWeak").field("ptr", &self.ptr).finish()
    }
}
