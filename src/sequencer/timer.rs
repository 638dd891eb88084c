/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Deferred execution for `now` starts and `delay` steps.

use std::time::Duration;
use tokio::runtime::Handle;
use tracing::warn;

/// Runs `f` after `after` has elapsed, never on the caller's stack.
///
/// A zero duration defers to the next scheduler tick as a freshly spawned
/// task. The current tokio runtime is used when there is one; otherwise a
/// dedicated thread sleeps and runs `f`.
pub(crate) fn defer<F>(after: Duration, f: F)
where
    F: FnOnce() + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                if !after.is_zero() {
                    tokio::time::sleep(after).await;
                }
                f();
            });
        }
        Err(_) => {
            warn!("no tokio runtime available, deferring on a dedicated thread");
            std::thread::spawn(move || {
                if !after.is_zero() {
                    std::thread::sleep(after);
                }
                f();
            });
        }
    }
}
