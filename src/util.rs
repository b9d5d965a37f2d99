//! Shared utility functions.

use std::time::Duration;

use tokio::task::spawn_blocking;

use crate::{Error, Result};

/// Run blocking filesystem work on tokio's blocking pool.
pub async fn blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| Error::TaskJoin(e.to_string()))?
}

/// Format a duration the way task finish lines report it.
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1000 {
        format!("{} ms", ms)
    } else {
        format!("{:.2} s", elapsed.as_secs_f64())
    }
}
