//! Construction-time validation.

use super::typeref::TypePath;
use crate::api::BuildError;

/// Checks a construction-time invariant, turning a violation into a [`BuildError`] that carries
/// the full type path of the offending node.
#[inline]
pub fn require(
    condition: bool,
    path: &TypePath,
    message: impl FnOnce() -> String,
) -> Result<(), BuildError> {
    if condition {
        Ok(())
    } else {
        Err(BuildError::Invalid { path: path.render(), message: message() })
    }
}

/// Aborts with a diagnostic. Reserved for states that a correct driver can never reach, like
/// mutating a single-value domain or using a `delayed` mutator before it was resolved.
#[macro_export]
macro_rules! engine_bug {
    ($($arg:tt)*) => {
        panic!("engine bug: {}", format!($($arg)*))
    };
}
