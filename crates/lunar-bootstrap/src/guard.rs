//! Failure isolation
//!
//! Every provider and component step runs inside [`guard`], which turns both
//! `Err` values and panics into a single failure callback. One broken mod can
//! therefore never abort the scan for the others.

use crate::error::{BootstrapError, Result};
use lunar_patching::panic_message;
use std::panic::{self, AssertUnwindSafe};

/// Run `op`, converting a panic into [`BootstrapError::Internal`]
pub fn catch<T>(op: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(result) => result,
        Err(payload) => Err(BootstrapError::internal(panic_message(payload.as_ref()))),
    }
}

/// Run `op` against `ctx`; on any failure hand the error to `on_failure`
///
/// Both closures receive the context explicitly so neither has to capture it.
pub fn guard<C, T>(
    ctx: &mut C,
    op: impl FnOnce(&mut C) -> Result<T>,
    on_failure: impl FnOnce(&mut C, BootstrapError),
) -> Option<T> {
    match catch(|| op(&mut *ctx)) {
        Ok(value) => Some(value),
        Err(e) => {
            on_failure(ctx, e);
            None
        }
    }
}
