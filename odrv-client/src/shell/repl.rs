//! The built-in shell host: device discovery plus a line-editing REPL.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Editor, ExternalPrinter};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

use super::completion::ShellHelper;
use super::eval::{Evaluator, Outcome};
use super::host::{HelpFn, ShellHost, ShellSession};
use super::{InteractiveVariables, ShellArgs};
use crate::discovery::Discovery;
use crate::discovery::path_spec::parse_path;
use crate::discovery::ports::PortSource;
use crate::discovery::registry::{DeviceEvent, DeviceRegistry};
use crate::util::format::{Tone, format_status};

pub struct ReplHost {
    source: Arc<dyn PortSource>,
    poll_interval: Duration,
    history_path: Option<PathBuf>,
    ansi: bool,
}

impl ReplHost {
    pub fn new(source: Arc<dyn PortSource>, poll_interval: Duration) -> Self {
        Self {
            source,
            poll_interval,
            history_path: None,
            ansi: true,
        }
    }

    pub fn with_history(mut self, path: Option<PathBuf>) -> Self {
        self.history_path = path;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// State owned by the blocking REPL thread.
struct Repl {
    args: ShellArgs,
    variables: InteractiveVariables,
    print_help: HelpFn,
    registry: Arc<DeviceRegistry>,
    branding_long: &'static str,
    shutdown: CancellationToken,
    history_path: Option<PathBuf>,
    ansi: bool,
    events: mpsc::UnboundedReceiver<DeviceEvent>,
    runtime: Handle,
}

#[async_trait]
impl ShellHost for ReplHost {
    async fn launch(&self, session: ShellSession) -> Result<()> {
        self.run_session(session, Repl::run).await
    }
}

impl ReplHost {
    /// Discovery around `interact`, which owns the terminal on a blocking
    /// thread until the session ends.
    async fn run_session<F>(&self, session: ShellSession, interact: F) -> Result<()>
    where
        F: FnOnce(Repl) -> Result<()> + Send + 'static,
    {
        let ShellSession {
            args,
            variables,
            print_banner,
            print_help,
            logger,
            shutdown,
            branding_short,
            branding_long,
        } = session;

        let specs = parse_path(&args.path)
            .with_context(|| format!("Invalid device path '{}'", args.path))?;

        let registry = Arc::new(DeviceRegistry::new(branding_short));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let discovery_token = shutdown.child_token();
        let discovery = Discovery::new(self.source.clone(), specs, args.serial_number.clone());
        let watcher = tokio::spawn(
            discovery
                .watch(
                    registry.clone(),
                    self.poll_interval,
                    events_tx,
                    discovery_token.clone(),
                )
                .instrument(logger.clone()),
        );

        print_banner();

        let repl = Repl {
            args,
            variables,
            print_help,
            registry,
            branding_long,
            shutdown: shutdown.clone(),
            history_path: self.history_path.clone(),
            ansi: self.ansi,
            events: events_rx,
            runtime: Handle::current(),
        };
        let result = tokio::task::spawn_blocking(move || {
            let _span = logger.enter();
            interact(repl)
        })
        .await
        .context("Shell thread panicked");

        discovery_token.cancel();
        if let Err(e) = watcher.await {
            warn!("Device discovery task failed: {e}");
        }
        // leaving the shell ends the application
        shutdown.cancel();

        result?
    }
}

impl Repl {
    fn run(self) -> Result<()> {
        let Repl {
            args,
            variables,
            print_help,
            registry,
            branding_long,
            shutdown,
            history_path,
            ansi,
            mut events,
            runtime,
        } = self;

        let mut editor: Editor<ShellHelper, DefaultHistory> =
            Editor::new().context("Failed to start line editor")?;
        let names = variables.names().map(str::to_string).collect();
        editor.set_helper(Some(ShellHelper::new(names, registry.clone())));

        if let Some(path) = &history_path {
            if editor.load_history(path).is_err() {
                debug!("No shell history at {:?}", path);
            }
        }

        // device messages are printed above the prompt while it is active
        let printer_task = match editor.create_external_printer() {
            Ok(mut printer) => runtime.spawn(async move {
                while let Some(event) = events.recv().await {
                    let line = format_status(&event.message(branding_long), event.tone(), ansi);
                    if printer.print(line).is_err() {
                        break;
                    }
                }
            }),
            Err(e) => {
                debug!("External printer unavailable ({e}), printing directly");
                runtime.spawn(async move {
                    while let Some(event) = events.recv().await {
                        let line = format_status(&event.message(branding_long), event.tone(), ansi);
                        println!("{line}");
                    }
                })
            }
        };

        let mut locals = BTreeMap::new();
        let mut counter = 1usize;
        let result = loop {
            if shutdown.is_cancelled() {
                debug!("Shutdown requested, leaving shell");
                break Ok(());
            }

            let prompt = format!("In [{counter}]: ");
            match editor.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(e) = editor.add_history_entry(line.as_str()) {
                        debug!("Failed to record history entry: {e}");
                    }

                    let mut evaluator = Evaluator::new(&variables, &registry, &mut locals);
                    match evaluator.eval_line(&line) {
                        Ok(Outcome::Quit) => break Ok(()),
                        Ok(Outcome::Help) => print_help(&args, registry.has_devices()),
                        Ok(Outcome::Value(value)) => println!("Out[{counter}]: {value}"),
                        Ok(Outcome::Text(text)) => println!("{text}"),
                        Ok(Outcome::Nothing) => {}
                        Err(e) => println!("{}", format_status(&e.to_string(), Tone::Bad, ansi)),
                    }
                    counter += 1;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("KeyboardInterrupt");
                    continue;
                }
                Err(ReadlineError::Eof) => break Ok(()),
                Err(err) => break Err(err).context("Line editor failed"),
            }
        };

        printer_task.abort();

        if let Some(path) = &history_path {
            if let Some(dir) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    debug!("Failed to create history directory {:?}: {e}", dir);
                }
            }
            if let Err(e) = editor.save_history(path) {
                warn!("Failed to save shell history: {e}");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ports::StaticPorts;
    use crate::shell::{BRANDING_LONG, BRANDING_SHORT, build_interactive_variables, print_help};
    use odrv_shared::device::DeviceInfo;
    use tracing::Span;

    fn no_banner() {}

    fn session(args: ShellArgs, shutdown: CancellationToken) -> ShellSession {
        ShellSession {
            args,
            variables: build_interactive_variables(),
            print_banner: no_banner,
            print_help,
            logger: Span::none(),
            shutdown,
            branding_short: BRANDING_SHORT,
            branding_long: BRANDING_LONG,
        }
    }

    fn odrive() -> DeviceInfo {
        DeviceInfo {
            port: "/dev/ttyACM0".to_string(),
            serial_number: Some("2061377C3548".to_string()),
            vendor_id: Some(0x1209),
            product_id: Some(0x0d32),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_path_fails_before_starting() {
        let host = ReplHost::new(Arc::new(StaticPorts::default()), Duration::from_millis(10))
            .with_ansi(false);
        let shutdown = CancellationToken::new();

        let err = host
            .launch(session(ShellArgs::new("bluetooth"), shutdown.clone()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid device path 'bluetooth'"));
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_token_ends_session_before_prompting() {
        let host = ReplHost::new(
            Arc::new(StaticPorts::new(vec![odrive()])),
            Duration::from_millis(10),
        )
        .with_ansi(false);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        host.launch(session(ShellArgs::new("usb"), shutdown.clone()))
            .await
            .unwrap();
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_session_end_joins_discovery_and_cancels_app_token() {
        let source = Arc::new(StaticPorts::new(vec![odrive()]));
        let host = ReplHost::new(source.clone(), Duration::from_millis(10)).with_ansi(false);
        let shutdown = CancellationToken::new();

        let session_token = shutdown.clone();
        let task = tokio::spawn(async move {
            host.run_session(session(ShellArgs::new("usb"), session_token), |mut repl| {
                let first = repl.events.blocking_recv();
                assert!(matches!(first, Some(DeviceEvent::Connected(h)) if h.name == "odrv0"));
                assert!(repl.registry.has_devices());
                // stays in the "prompt" until the app asks to stop
                repl.runtime.block_on(repl.shutdown.cancelled());
                Ok(())
            })
            .await
            .map(|()| host)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());
        shutdown.cancel();

        let host = task.await.unwrap().unwrap();
        // only the test and the host still hold the source: the watcher is gone
        assert_eq!(Arc::strong_count(&source), 2);
        drop(host);
        assert!(shutdown.is_cancelled());
    }
}
