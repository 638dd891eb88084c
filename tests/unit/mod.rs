/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Integration tests exercising the public API.

mod config_tests;
mod fork_tests;
mod tool_tests;
mod workflow_tests;

/// Installs a test-friendly tracing subscriber once per process.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
