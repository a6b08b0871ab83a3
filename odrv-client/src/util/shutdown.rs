//! Process-wide shutdown signal.
//!
//! The shell launcher passes this token through to the shell host untouched.
//! The host cancels it when the interactive session ends, and Ctrl+C outside
//! of the line editor cancels it too.

use once_cell::sync::Lazy;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Global cancellation token for the running `odrivetool` process.
pub static SHUTDOWN: Lazy<CancellationToken> = Lazy::new(CancellationToken::new);

/// Cancel [`SHUTDOWN`] on the first Ctrl+C the process receives.
///
/// While the line editor owns the terminal it reads Ctrl+C as a key press,
/// so this only fires for non-interactive commands or during startup.
pub fn spawn_ctrl_c_handler() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("ctrl+c received, requesting shutdown");
            SHUTDOWN.cancel();
        }
    });
}
