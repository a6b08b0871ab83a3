use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use super::{InteractiveVariables, ShellArgs};

/// Prints the banner shown when a session starts.
pub type BannerFn = fn();

/// Prints contextual help; the flag tells whether any device is connected.
pub type HelpFn = fn(&ShellArgs, bool);

/// Everything a shell host needs to run one interactive session.
pub struct ShellSession {
    pub args: ShellArgs,
    pub variables: InteractiveVariables,
    pub print_banner: BannerFn,
    pub print_help: HelpFn,
    pub logger: Span,
    /// Passed through from the caller. The launcher never looks at it.
    pub shutdown: CancellationToken,
    /// Prefix for device names, e.g. `odrv` for `odrv0`.
    pub branding_short: &'static str,
    /// Product name used in messages, e.g. `ODrive`.
    pub branding_long: &'static str,
}

/// Hosts the interactive session: device discovery and naming, the REPL,
/// and tab completion.
#[async_trait]
pub trait ShellHost: Send + Sync {
    async fn launch(&self, session: ShellSession) -> Result<()>;
}
