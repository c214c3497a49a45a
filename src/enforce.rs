use std::fmt;
use std::process;

/// Report a broken counting invariant and abort.
///
/// This class of failure never panics: unwinding out of a half-finished
/// counter operation would leave the program running with corrupted counts,
/// and a caller that caught the panic could go on to touch freed memory.
/// There is nothing to catch and nothing to recover.
#[cold]
#[inline(never)]
pub(crate) fn violation(msg: fmt::Arguments<'_>, file: &str, line: u32) -> !
{
    eprintln!("{}:{}: reference counting invariant broken: {}", file, line, msg);
    process::abort()
}

/// Check a counting invariant, aborting with a message when it fails.
macro_rules! enforce {
    ($cond:expr, $($msg:tt)+) => {
        if !$cond {
            $crate::enforce::violation(::std::format_args!($($msg)+), file!(), line!())
        }
    };
}

pub(crate) use enforce;
