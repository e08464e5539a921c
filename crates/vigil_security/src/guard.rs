//! Panic isolation for detector and analyzer calls.
//!
//! One failing check must never take down the evaluation of the others or
//! the worker running it. Calls are wrapped in `catch_unwind` and a panic
//! comes back as its message.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs `f`, turning a panic into `Err(message)`.
///
/// Per-player state touched by a panicking call may be half-updated; the
/// next action for that player sees whatever was written.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_values_through() {
        assert_eq!(guarded(|| 7), Ok(7));
    }

    #[test]
    fn test_catches_str_and_string_panics() {
        assert_eq!(guarded(|| -> u8 { panic!("boom") }), Err("boom".to_string()));
        let n = 3;
        assert_eq!(
            guarded(|| -> u8 { panic!("failed at {n}") }),
            Err("failed at 3".to_string())
        );
    }
}
