use std::ptr;

/// Address policy for the empty state.
///
/// A handle is nothing but an address, so "no target" must itself be an
/// address. The policy picks which one. [`Nil`] picks null; a policy can
/// instead point every empty handle at a static singleton, which keeps the
/// empty state dereferenceable while costing the same single comparison.
///
/// # Safety
///
/// `sentinel` must return the same address on every call, and that address
/// must be either null or a `T` that lives, unmutated through shared
/// references, for the rest of the program. Handle code dereferences
/// non-null sentinels and compares addresses against them without any
/// further checks.
pub unsafe trait Null<T>
{
    /// The address that stands for "no target".
    fn sentinel() -> *mut T;
}

/// The default policy: address zero.
#[derive(Clone, Copy, Debug)]
pub struct Nil;

unsafe impl<T> Null<T> for Nil
{
    fn sentinel() -> *mut T { ptr::null_mut() }
}
