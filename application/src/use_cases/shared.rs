//! Shared utilities for use cases.

use crate::use_cases::run_session::RunError;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
///
/// Returns `Err(RunError::Cancelled)` if the token is cancelled.
pub(crate) fn check_cancelled(token: &CancellationToken) -> Result<(), RunError> {
    if token.is_cancelled() {
        return Err(RunError::Cancelled);
    }
    Ok(())
}
