//! Live-target diagnostics, for catching leaks and double-custody bugs.
//! Carried by the default `stats` feature; without it the hooks below
//! compile to nothing.

#[cfg(feature = "stats")]
pub use self::enabled::{snapshot, Stats, TargetLayout};

pub(crate) fn made<T: 'static>()
{
    #[cfg(feature = "stats")]
    enabled::made_of(enabled::TargetLayout::of::<T>());
}

pub(crate) fn torn<T: 'static>()
{
    #[cfg(feature = "stats")]
    enabled::torn_of();
}

pub(crate) fn freed<T: 'static>()
{
    #[cfg(feature = "stats")]
    enabled::freed_of(enabled::TargetLayout::of::<T>());
}

#[cfg(feature = "stats")]
mod enabled
{
    use std::{
        alloc::Layout,
        collections::HashMap,
        fmt,
        hash::{self, Hasher},
    };

    use lazy_static::lazy_static;
    use parking_lot::Mutex;

    lazy_static! {
        static ref TALLY: Mutex<Tally> = Mutex::new(Tally::default());
    }

    #[derive(Default)]
    struct Tally
    {
        live: HashMap<TargetLayout, usize>,
        made: usize,
        torn: usize,
        freed: usize,
    }

    /// Point-in-time picture of the process's managed targets.
    #[derive(Clone, Default)]
    pub struct Stats
    {
        /// Live allocations by payload layout.
        pub live_by_layout: HashMap<TargetLayout, usize>,

        /// Targets made over the process lifetime.
        pub made: usize,

        /// Teardown hooks run.
        pub torn: usize,

        /// Allocations freed.
        pub freed: usize,
    }

    impl Stats
    {
        /// Live allocations across all layouts.
        pub fn live(&self) -> usize { self.live_by_layout.values().sum() }

        /// Live allocations of `T`'s layout.
        pub fn live_of<T: 'static>(&self) -> usize
        {
            self.live_by_layout
                .get(&TargetLayout::of::<T>())
                .copied()
                .unwrap_or(0)
        }

        /// Heap bytes held by live allocations.
        pub fn live_bytes(&self) -> usize
        {
            let mut res = 0;
            for (layout, amount) in &self.live_by_layout {
                res += Layout::from(*layout).size() * amount;
            }
            res
        }
    }

    /// A target's payload layout, as the tally's map key. The embedded
    /// counters are part of the payload here, unlike a control-block
    /// scheme where they would be accounted separately.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct TargetLayout(Layout);

    impl TargetLayout
    {
        /// The layout of a managed `T`, counters and all.
        pub fn of<T: 'static>() -> Self { TargetLayout(Layout::new::<T>()) }

        /// Delegates to the underlying `Layout`.
        pub fn size(&self) -> usize { self.0.size() }

        /// Delegates to the underlying `Layout`.
        pub fn align(&self) -> usize { self.0.align() }
    }

    impl hash::Hash for TargetLayout
    {
        fn hash<H: Hasher>(&self, state: &mut H)
        {
            self.0.size().hash(state);
            self.0.align().hash(state);
        }
    }

    impl From<TargetLayout> for Layout
    {
        fn from(it: TargetLayout) -> Self { it.0 }
    }

    impl fmt::Debug for TargetLayout
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
        {
            f.debug_struct("TargetLayout")
                .field("size()", &self.size())
                .field("align()", &self.align())
                .finish()
        }
    }

    /// Copy the tally out. One lock, no references into the registry.
    pub fn snapshot() -> Stats
    {
        let tally = TALLY.lock();
        Stats {
            live_by_layout: tally.live.clone(),
            made: tally.made,
            torn: tally.torn,
            freed: tally.freed,
        }
    }

    pub(crate) fn made_of(layout: TargetLayout)
    {
        let mut tally = TALLY.lock();
        *tally.live.entry(layout).or_default() += 1;
        tally.made += 1;
    }

    pub(crate) fn torn_of() { TALLY.lock().torn += 1; }

    pub(crate) fn freed_of(layout: TargetLayout)
    {
        let mut tally = TALLY.lock();
        let emptied = match tally.live.get_mut(&layout) {
            Some(n) => {
                *n -= 1;
                *n == 0
            }
            None => false,
        };
        if emptied {
            tally.live.remove(&layout);
        }
        tally.freed += 1;
    }
}
