//! Intrusive reference counting: the counts live inside the object.
//!
//! `Rc` and `Arc` keep their counters in a control block next to the
//! value, which works until the pointer has to cross a boundary that only
//! understands addresses. Putting the two counters _inside_ the target
//! buys three things: a handle is a single bare word, a handle can be
//! rebuilt from an address that went through foreign code and came back,
//! and the empty state can be any designated address rather than null
//! alone.
//!
//! A type opts in by embedding a [`Counts`] block and implementing
//! [`Counted`]:
//!
//! ```
//! use inref::{Counted, Counts, Strong};
//!
//! struct Blob
//! {
//!     counts: Counts,
//!     bytes: Vec<u8>,
//! }
//!
//! unsafe impl Counted for Blob
//! {
//!     fn counts(&self) -> &Counts { &self.counts }
//! }
//!
//! let blob = Strong::new(Blob { counts: Counts::new(), bytes: vec![1, 2, 3] });
//! let observer = blob.alias();
//!
//! assert_eq!(blob.use_count(), 1);
//! assert_eq!(observer.lock().use_count(), 2);
//! ```
//!
//! [`Strong`] handles share ownership; the last one to go runs the
//! target's [`teardown`](Counted::teardown) hook. [`Weak`] handles
//! observe: they keep the allocation, not the resources, and promote back
//! through [`lock`](Weak::lock) while the target lives. Between the two
//! sits one bookkeeping trick, a _phantom_ weak unit held collectively by
//! the strong side, so the last weak decrement is always the single point
//! that frees memory.
//!
//! [`Strong::release`] and [`Strong::reclaim`] (and their [`Weak`]
//! counterparts) move a counted unit across an FFI boundary without
//! touching the counters, and the [`raw`] module repeats the whole
//! vocabulary as free functions over bare addresses for the far side of
//! that boundary.
//!
//! Caveat: this is not a garbage collector. Cycles of strong handles leak,
//! unsized targets are not supported, and a value is managed per
//! allocation: fresh copies of a managed value start out unmanaged.

pub(crate) mod enforce;

pub mod axioms;
pub mod counts;
pub mod null;
pub mod pointers;
pub mod raw;
pub mod stats;


pub use counts::{Counted, Counts};
pub use null::{Nil, Null};
pub use pointers::{RawStrong, RawWeak, Strong, Weak};
