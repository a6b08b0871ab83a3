// === Core modules ===
pub mod config;
pub mod constants;
pub mod devices;
pub mod discovery;
pub mod helpers;
pub mod shell;
pub mod util;

// === CLI entrypoint ===
pub mod cli;

/// Entrypoint used by `main.rs` and tests to run the full CLI.
pub async fn run_cli() -> anyhow::Result<()> {
    cli::cli().await
}
