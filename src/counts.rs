use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::enforce::enforce;

/// Counts past this point mean the ledger itself is broken, or someone is
/// leaking escape tokens in a loop.
const MAX_COUNT: usize = isize::MAX as usize;

/// The embedded counter block.
///
/// Every managed target carries one of these. `strong` counts the units of
/// shared ownership: live [`Strong`](crate::Strong) handles plus escaped
/// [`RawStrong`](crate::RawStrong) tokens. `weak` counts the observer units
/// the same way, plus one more: while `strong` is nonzero the strong side
/// collectively holds a single _phantom_ weak unit, so that the last weak
/// decrement, wherever it happens, is always the one that frees the
/// allocation.
///
/// A fresh block is all zeroes and the value around it is unmanaged; it may
/// live on the stack, inside another struct, wherever. Only
/// [`Strong::new`](crate::Strong::new) turns the counters on.
pub struct Counts
{
    strong: AtomicUsize,
    weak: AtomicUsize,
}

impl Counts
{
    /// A fresh block: both counters zero.
    pub const fn new() -> Self
    {
        Counts {
            strong: AtomicUsize::new(0),
            weak: AtomicUsize::new(0),
        }
    }

    /// Strong units alive right now. Acquire, so a reader that sees the
    /// count also sees the writes that produced it.
    pub fn strong(&self) -> usize { self.strong.load(Ordering::Acquire) }

    /// Weak units alive right now, phantom unit included.
    pub fn weak(&self) -> usize { self.weak.load(Ordering::Acquire) }

    /// Both counters to 1 in one step: the first strong unit and the
    /// phantom weak unit. The factory calls this on a block nothing else
    /// can see yet, hence the relaxed stores.
    pub(crate) fn prime(&self)
    {
        self.strong.store(1, Ordering::Relaxed);
        self.weak.store(1, Ordering::Relaxed);
    }

    /// Mint one strong unit. The count must already be positive; raising
    /// it from zero anywhere but the factory would revive a target whose
    /// teardown hook has run.
    pub(crate) fn inc_strong(&self) -> usize
    {
        let n = self.strong.fetch_add(1, Ordering::AcqRel) + 1;
        enforce!(n != 1, "cannot retain a target whose strong count already reached zero");
        enforce!(n <= MAX_COUNT, "strong count overflow");
        n
    }

    /// Mint one weak unit. The count must already be positive: whenever a
    /// legitimate source of weak units exists, either the phantom unit or a
    /// live weak unit is keeping the count up.
    pub(crate) fn inc_weak(&self) -> usize
    {
        let n = self.weak.fetch_add(1, Ordering::Relaxed) + 1;
        enforce!(n != 1, "cannot add a weak reference to a target whose weak count already reached zero");
        enforce!(n <= MAX_COUNT, "weak count overflow");
        n
    }

    /// Spend one strong unit and return what is left. AcqRel: the release
    /// half publishes this thread's writes to the target, the acquire half
    /// shows the zero observer everyone else's.
    pub(crate) fn dec_strong(&self) -> usize { self.strong.fetch_sub(1, Ordering::AcqRel) - 1 }

    /// Spend one weak unit and return what is left.
    pub(crate) fn dec_weak(&self) -> usize { self.weak.fetch_sub(1, Ordering::AcqRel) - 1 }

    /// The weak-to-strong promotion step: raise the strong count by one
    /// unless zero is observed first. The loop never increments past a
    /// zero, so a promotion can only win while the target is still alive.
    pub(crate) fn try_promote(&self) -> bool
    {
        let mut n = self.strong.load(Ordering::SeqCst);
        loop {
            if n == 0 {
                return false;
            }
            match self
                .strong
                .compare_exchange_weak(n, n + 1, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return true,
                Err(seen) => n = seen,
            }
        }
    }
}

impl Default for Counts
{
    fn default() -> Self { Counts::new() }
}

impl Clone for Counts
{
    /// A copy of a managed value starts out unmanaged.
    fn clone(&self) -> Self { Counts::new() }
}

impl Drop for Counts
{
    fn drop(&mut self)
    {
        let strong = *self.strong.get_mut();
        let weak = *self.weak.get_mut();
        enforce!(
            strong == 0,
            "a target was destroyed while {} strong unit(s) remained",
            strong
        );
        enforce!(
            weak <= 1,
            "a target was destroyed while {} weak unit(s) remained",
            weak
        );
    }
}

impl fmt::Debug for Counts
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Counts")
            .field("strong", &self.strong())
            .field("weak", &self.weak())
            .finish()
    }
}

/// Capability trait for managed targets.
///
/// Embedding a [`Counts`] block and pointing [`counts`](Counted::counts) at
/// it is all a type needs to be handled by [`Strong`](crate::Strong) and
/// [`Weak`](crate::Weak). The value's own `Drop` still runs when the
/// allocation is freed; [`teardown`](Counted::teardown) runs earlier, the
/// moment shared ownership ends.
///
/// # Safety
///
/// `counts` must return the same block, owned by this value, on every call
/// for the value's whole life. Handle code balances increments and
/// decrements across calls; a wandering or borrowed block would let one
/// target spend another's units.
pub unsafe trait Counted
{
    /// The embedded counter block.
    fn counts(&self) -> &Counts;

    /// Runs exactly once, when the last strong unit is spent. Weak
    /// observers do not delay it; they only delay the free that follows.
    /// The default does nothing, leaving all cleanup to `Drop`.
    fn teardown(&self) {}
}
