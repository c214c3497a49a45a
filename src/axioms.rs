/// The counting discipline as checked arithmetic.
///
/// Each handle operation is stated as a transition on the pair of unit
/// counts, with its precondition asserted. The pair mirrors the live
/// counters exactly: `weak` includes the phantom unit whenever `strong`
/// is positive, so the numbers here are the numbers
/// [`use_count`](crate::Strong::use_count) and
/// [`weak_use_count`](crate::Strong::weak_use_count) report.
///
/// Several axioms come in pairs whose post- and preconditions meet in the
/// middle; the tests replay whole scenarios against this model and compare
/// the machine's counters to it after every step.
#[must_use]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Axioms
{
    /// Strong units: live handles plus escaped tokens.
    pub strong: usize,

    /// Weak units: live handles, escaped tokens, and the phantom unit.
    pub weak: usize,
}

impl Axioms
{
    /// A fresh target is unmanaged.
    ///
    /// ```notest
    /// Self { strong: 0, weak: 0 }
    /// ```
    pub fn fresh() -> Self { Axioms { strong: 0, weak: 0 } }

    /// The factory primes both counters in one step: the first strong
    /// unit, and the phantom weak unit the strong side holds collectively.
    ///
    /// ```notest
    /// assert_eq!(self.strong + self.weak, 0);
    /// self.strong = 1;
    /// self.weak = 1;
    /// ```
    pub fn make(mut self) -> Self
    {
        assert_eq!(self.strong + self.weak, 0);
        self.strong = 1;
        self.weak = 1;
        self
    }

    /// Cloning a strong handle mints one strong unit.
    pub fn copy_strong(mut self) -> Self
    {
        assert!(self.strong > 0);
        self.strong += 1;
        self
    }

    /// Aliasing mints one weak unit beside the phantom.
    pub fn alias(mut self) -> Self
    {
        assert!(self.strong > 0);
        self.weak += 1;
        self
    }

    /// Cloning a weak handle mints one weak unit. The precondition is that
    /// a weak handle exists at all, which is one unit past the phantom
    /// while the target is alive.
    ///
    /// ```notest
    /// if self.strong > 0 { assert!(self.weak > 1) } else { assert!(self.weak > 0) }
    /// self.weak += 1;
    /// ```
    pub fn copy_weak(mut self) -> Self
    {
        if self.strong > 0 {
            assert!(self.weak > 1);
        } else {
            assert!(self.weak > 0);
        }
        self.weak += 1;
        self
    }

    /// Spending a strong unit. The last one runs the teardown hook and
    /// surrenders the phantom unit; the free happens when the phantom was
    /// the last weak unit too.
    ///
    /// ```notest
    /// assert!(self.strong > 0);
    /// self.strong -= 1;
    /// if self.strong == 0 { self.weak -= 1 }
    /// ```
    pub fn drop_strong(mut self) -> Self
    {
        assert!(self.strong > 0);
        self.strong -= 1;
        if self.strong == 0 {
            self.weak -= 1;
        }
        self
    }

    /// Spending a weak unit, never the phantom one.
    pub fn drop_weak(mut self) -> Self
    {
        if self.strong > 0 {
            assert!(self.weak > 1);
        } else {
            assert!(self.weak > 0);
        }
        self.weak -= 1;
        self
    }

    /// Promotion succeeds only against a positive strong count, and then
    /// it is one more strong unit.
    pub fn lock(mut self) -> Self
    {
        assert!(self.strong > 0);
        self.strong += 1;
        self
    }

    /// Failed promotion moves nothing.
    pub fn lock_expired(self) -> Self
    {
        assert_eq!(self.strong, 0);
        self
    }

    /// Escaping a unit moves custody, never the counters.
    pub fn release(self) -> Self { self }

    /// Re-adoption is the other half of [`Axioms::release`]; still no
    /// counter traffic.
    pub fn reclaim(self) -> Self { self }

    /// Non-owning adoption is a retain with a liveness precondition, so it
    /// transitions like a clone.
    pub fn reclaim_nonowning(self) -> Self { self.copy_strong() }

    /// The free: every unit spent, in the right order.
    ///
    /// ```notest
    /// assert_eq!(self.strong, 0);
    /// assert_eq!(self.weak, 0);
    /// ```
    pub fn free(self)
    {
        assert_eq!(self.strong, 0);
        assert_eq!(self.weak, 0);
    }

    /// The phantom unit in one run: observers only ever defer the free,
    /// because the strong side's collective weak unit outlives every
    /// strong handle.
    ///
    /// Proof: the following doctest passes.
    ///
    /// ```
    /// inref::axioms::Axioms::story()
    /// ```
    pub fn story()
    {
        Self::fresh()
            .make()
            .copy_strong()
            .alias()
            .drop_strong()
            .lock()
            .drop_strong()
            .drop_strong()
            .drop_weak()
            .free()
    }
}
