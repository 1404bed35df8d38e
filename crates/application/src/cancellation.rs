use tokio_util::sync::CancellationToken;
use warden_core::{AppError, AppResult};

/// Fails with `Cancelled` once the caller has cancelled `operation`.
pub(crate) fn ensure_active(cancel: &CancellationToken, operation: &str) -> AppResult<()> {
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled(format!(
            "{operation} was cancelled before completion"
        )));
    }

    Ok(())
}
