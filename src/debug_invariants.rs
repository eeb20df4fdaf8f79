//! Structural self-checks for plans and other derived tables.
//!
//! Checks run in debug builds, and in release builds when the
//! `check-invariants` or `strict-invariants` feature is on. A failed check
//! panics with the type name and the first violation found; callers that
//! want the error instead use [`DebugInvariants::validate_invariants`].

use crate::decomp_error::DecompError;

pub trait DebugInvariants {
    /// First violated invariant, if any.
    fn validate_invariants(&self) -> Result<(), DecompError>;

    /// Panic on a violated invariant when checks are enabled; no-op otherwise.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(
            self.validate_invariants(),
            "{}",
            std::any::type_name::<Self>()
        );
    }
}

/// Run a check returning `Result<_, DecompError>` and panic with the
/// formatted context when it fails and checks are enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $($ctx:tt)+) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(err) = $check {
            panic!("[invariants] {}: {}", format_args!($($ctx)+), err);
        }
    };
}
